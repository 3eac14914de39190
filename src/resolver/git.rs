//! Git dependency installation.
//!
//! Each `(url, target)` pair is cloned at most once into a shared cache
//! directory whose name combines a sanitized form of the URL with a short
//! digest of the full key, so distinct targets of the same repository
//! never collide.

use std::path::PathBuf;

use anyhow::{Context, Result};
use git2::{Repository, ResetType};
use sha2::{Digest, Sha256};
use url::Url;

use crate::builder::opts::{CompilerOpts, IncludeDir};
use crate::core::dependency::GitDependency;
use crate::resolver::resolve_include_dir;

/// The deterministic install directory for this dependency.
pub fn install_dir(dep: &GitDependency) -> Result<PathBuf> {
    let cache_root = dirs::cache_dir()
        .context("failed to locate a cache directory")?
        .join("cabin");

    let mut key = dep.url.clone();
    if let Some(target) = &dep.target {
        key.push('#');
        key.push_str(target);
    }
    let digest = sha256_hex(&key);
    let dir_name = format!("{}-{}", sanitize_url_for_path(&dep.url), &digest[..8]);

    Ok(cache_root.join("git").join(dir_name))
}

/// Clone (once) and check out the dependency, returning its compiler
/// options: the install directory's `include/` when non-empty, else the
/// install directory itself.
pub fn install(dep: &GitDependency) -> Result<CompilerOpts> {
    let install_dir = install_dir(dep)?;

    if !install_dir.exists() {
        tracing::info!("cloning {}", dep.url);
        if let Some(parent) = install_dir.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }

        let repo = Repository::clone(&dep.url, &install_dir)
            .with_context(|| format!("failed to clone {}", dep.url))?;
        if let Some(target) = &dep.target {
            checkout(&repo, target)
                .with_context(|| format!("failed to check out `{}` of {}", target, dep.url))?;
        }
    }

    let mut opts = CompilerOpts::default();
    opts.c_flags
        .include_dirs
        .push(IncludeDir::new(resolve_include_dir(&install_dir), false));
    Ok(opts)
}

/// Resolve `target` as a rev, tag, or branch and hard-reset to it. A bare
/// branch name of a fresh clone may only exist under `origin/`.
fn checkout(repo: &Repository, target: &str) -> Result<()> {
    let object = repo
        .revparse_single(target)
        .or_else(|_| repo.revparse_single(&format!("origin/{}", target)))?;
    repo.reset(&object, ResetType::Hard, None)?;
    Ok(())
}

fn sha256_hex(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Sanitize a URL for use as a directory name.
fn sanitize_url_for_path(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return url
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
    };

    let mut name = String::new();
    if let Some(host) = parsed.host_str() {
        name.push_str(host);
    }
    let path = parsed.path().trim_matches('/');
    if !path.is_empty() {
        name.push('-');
        name.push_str(&path.replace('/', "-"));
    }
    if name.ends_with(".git") {
        name.truncate(name.len() - 4);
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(url: &str, target: Option<&str>) -> GitDependency {
        GitDependency {
            name: "dep".into(),
            url: url.into(),
            target: target.map(str::to_string),
        }
    }

    #[test]
    fn test_sanitize_url() {
        assert_eq!(
            sanitize_url_for_path("https://github.com/user/repo.git"),
            "github.com-user-repo"
        );
        assert_eq!(
            sanitize_url_for_path("https://gitlab.com/org/project"),
            "gitlab.com-org-project"
        );
        assert_eq!(
            sanitize_url_for_path("https://github.com/user/repo/"),
            "github.com-user-repo"
        );
    }

    #[test]
    fn test_install_dir_is_deterministic() {
        let a = install_dir(&dep("https://github.com/user/repo.git", Some("v1"))).unwrap();
        let b = install_dir(&dep("https://github.com/user/repo.git", Some("v1"))).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_install_dir_distinguishes_targets() {
        let untargeted = install_dir(&dep("https://github.com/user/repo.git", None)).unwrap();
        let v1 = install_dir(&dep("https://github.com/user/repo.git", Some("v1"))).unwrap();
        let v2 = install_dir(&dep("https://github.com/user/repo.git", Some("v2"))).unwrap();
        assert_ne!(untargeted, v1);
        assert_ne!(v1, v2);
    }

    #[test]
    fn test_install_dir_under_cache_root() {
        let path = install_dir(&dep("https://github.com/user/repo.git", None)).unwrap();
        let as_str = path.to_string_lossy();
        assert!(as_str.contains("cabin"));
        assert!(as_str.contains("git"));
        assert!(as_str.contains("github.com-user-repo"));
    }
}

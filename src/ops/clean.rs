//! `clean`: remove build artifacts.

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::core::manifest::Manifest;
use crate::util::shell;

/// Remove `cabin-out`, or only `cabin-out/<profile>` when given.
pub fn clean(profile: Option<&str>) -> Result<()> {
    let cwd = std::env::current_dir().context("failed to get current directory")?;
    clean_at(&cwd, profile)
}

/// `clean`, rooted at the project found from `start_dir`.
pub fn clean_at(start_dir: &Path, profile: Option<&str>) -> Result<()> {
    let manifest_path = Manifest::find(start_dir)?;
    let mut out_dir = manifest_path
        .parent()
        .context("manifest has no parent directory")?
        .join("cabin-out");

    if let Some(profile) = profile {
        if !matches!(profile, "dev" | "release") {
            bail!("Invalid argument for --profile: {}", profile);
        }
        out_dir.push(profile);
    }

    if out_dir.exists() {
        let display = out_dir.canonicalize().unwrap_or_else(|_| out_dir.clone());
        shell::status("Removing", display.display());
        std::fs::remove_dir_all(&out_dir)
            .with_context(|| format!("failed to remove {}", out_dir.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_project(tmp: &TempDir) -> std::path::PathBuf {
        let root = tmp.path().to_path_buf();
        std::fs::write(
            root.join("cabin.toml"),
            "[package]\nname = \"app\"\nedition = \"20\"\nversion = \"0.1.0\"\n",
        )
        .unwrap();
        root
    }

    #[test]
    fn test_clean_removes_profile_dir() {
        let tmp = TempDir::new().unwrap();
        let root = setup_project(&tmp);
        std::fs::create_dir_all(root.join("cabin-out").join("dev")).unwrap();
        std::fs::create_dir_all(root.join("cabin-out").join("release")).unwrap();

        clean_at(&root, Some("dev")).unwrap();

        assert!(!root.join("cabin-out").join("dev").exists());
        assert!(root.join("cabin-out").join("release").exists());
    }

    #[test]
    fn test_clean_removes_whole_out_dir() {
        let tmp = TempDir::new().unwrap();
        let root = setup_project(&tmp);
        std::fs::create_dir_all(root.join("cabin-out").join("dev")).unwrap();

        clean_at(&root, None).unwrap();
        assert!(!root.join("cabin-out").exists());
    }

    #[test]
    fn test_clean_rejects_unknown_profile() {
        let tmp = TempDir::new().unwrap();
        let root = setup_project(&tmp);

        let err = clean_at(&root, Some("test")).unwrap_err();
        assert!(err.to_string().contains("Invalid argument"));
    }

    #[test]
    fn test_clean_is_noop_without_artifacts() {
        let tmp = TempDir::new().unwrap();
        let root = setup_project(&tmp);
        clean_at(&root, None).unwrap();
    }
}

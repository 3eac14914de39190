//! Dependency declarations.
//!
//! `cabin.toml` knows three dependency kinds: git repositories, local path
//! packages, and system libraries resolved through pkg-config. Conflict
//! detection across the manifest closure compares dependencies by
//! [`DepKey`], the canonical identity of a declaration.

use std::path::{Path, PathBuf};

use anyhow::{bail, ensure, Result};
use semver::VersionReq;

use crate::util::fs::weakly_canonical;

/// A dependency as declared in a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dependency {
    Git(GitDependency),
    Path(PathDependency),
    System(SystemDependency),
}

/// A git dependency: cloned once per `(url, target)` into a shared cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitDependency {
    pub name: String,
    pub url: String,
    /// A rev, tag, or branch to check out.
    pub target: Option<String>,
}

/// A path dependency: another fully-formed cabin package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathDependency {
    pub name: String,
    pub path: String,
}

/// A system dependency resolved via pkg-config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemDependency {
    pub name: String,
    pub version_req: VersionReq,
}

impl Dependency {
    pub fn name(&self) -> &str {
        match self {
            Dependency::Git(dep) => &dep.name,
            Dependency::Path(dep) => &dep.name,
            Dependency::System(dep) => &dep.name,
        }
    }

    /// Canonical identity used for cross-manifest conflict detection.
    ///
    /// `base_dir` is the directory of the declaring manifest; path
    /// dependencies canonicalize against it so the same package declared
    /// from different manifests compares equal.
    pub fn key(&self, base_dir: &Path) -> DepKey {
        match self {
            Dependency::Git(dep) => {
                let mut detail = dep.url.clone();
                if let Some(target) = &dep.target {
                    detail.push('#');
                    detail.push_str(target);
                }
                DepKey::Git(detail)
            }
            Dependency::System(dep) => DepKey::System(dep.version_req.to_string()),
            Dependency::Path(dep) => {
                DepKey::Path(weakly_canonical(&base_dir.join(&dep.path)))
            }
        }
    }
}

/// Canonical dependency identity: `(kind, detail)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DepKey {
    Git(String),
    System(String),
    Path(PathBuf),
}

/// Validate a dependency name.
///
/// Dependency names follow a stricter alphabet than package names:
/// alphanumerics plus `-_/.+`, no consecutive non-alphanumerics (except
/// repeated `+`), at most one `/`, `+` only in a single consecutive pair,
/// `.` only wrapped by digits. This admits real pkg-config names like
/// `gtkmm-4.0` and `ncurses++`.
pub fn validate_dep_name(name: &str) -> Result<()> {
    const ALLOWED: [char; 5] = ['-', '_', '/', '.', '+'];

    ensure!(!name.is_empty(), "dependency name must not be empty");
    let bytes: Vec<char> = name.chars().collect();
    ensure!(
        bytes[0].is_ascii_alphanumeric(),
        "dependency name must start with an alphanumeric character"
    );
    ensure!(
        bytes[bytes.len() - 1].is_ascii_alphanumeric() || bytes[bytes.len() - 1] == '+',
        "dependency name must end with an alphanumeric character or `+`"
    );

    for &c in &bytes {
        if !c.is_ascii_alphanumeric() && !ALLOWED.contains(&c) {
            bail!("dependency name must be alphanumeric, `-`, `_`, `/`, `.`, or `+`");
        }
    }

    for i in 1..bytes.len() {
        if bytes[i] == '+' {
            // A consecutive pair of `+` is legal; counted below.
            continue;
        }
        if !bytes[i].is_ascii_alphanumeric() && bytes[i] == bytes[i - 1] {
            bail!("dependency name must not contain consecutive non-alphanumeric characters");
        }
    }

    for i in 1..bytes.len().saturating_sub(1) {
        if bytes[i] != '.' {
            continue;
        }
        if !bytes[i - 1].is_ascii_digit() || !bytes[i + 1].is_ascii_digit() {
            bail!("dependency name must contain `.` wrapped by digits");
        }
    }

    let slashes = bytes.iter().filter(|&&c| c == '/').count();
    ensure!(
        slashes <= 1,
        "dependency name must not contain more than one `/`"
    );

    let pluses = bytes.iter().filter(|&&c| c == '+').count();
    ensure!(
        pluses == 0 || pluses == 2,
        "dependency name must contain zero or two `+`"
    );
    if pluses == 2 {
        let first = name.find('+').unwrap();
        let last = name.rfind('+').unwrap();
        if first + 1 != last {
            bail!("`+` in the dependency name must be consecutive");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err(name: &str) -> String {
        validate_dep_name(name).unwrap_err().to_string()
    }

    #[test]
    fn test_dep_name_empty_and_edges() {
        assert_eq!(err(""), "dependency name must not be empty");
        assert_eq!(
            err("-"),
            "dependency name must start with an alphanumeric character"
        );
        assert_eq!(
            err("1-"),
            "dependency name must end with an alphanumeric character or `+`"
        );
    }

    #[test]
    fn test_dep_name_alphabet() {
        for c in ['!', '@', '#', '%', '^', '&', '*', '(', ' ', '\\'] {
            assert_eq!(
                err(&format!("1{}1", c)),
                "dependency name must be alphanumeric, `-`, `_`, `/`, `.`, or `+`"
            );
        }
    }

    #[test]
    fn test_dep_name_consecutive() {
        assert_eq!(
            err("1--1"),
            "dependency name must not contain consecutive non-alphanumeric characters"
        );
        assert!(validate_dep_name("1-1-1").is_ok());
    }

    #[test]
    fn test_dep_name_dots() {
        assert!(validate_dep_name("1.1").is_ok());
        assert!(validate_dep_name("1.1.1").is_ok());
        assert_eq!(err("a.a"), "dependency name must contain `.` wrapped by digits");
    }

    #[test]
    fn test_dep_name_slashes() {
        assert!(validate_dep_name("a/b").is_ok());
        assert_eq!(
            err("a/b/c"),
            "dependency name must not contain more than one `/`"
        );
    }

    #[test]
    fn test_dep_name_pluses() {
        assert_eq!(err("a+"), "dependency name must contain zero or two `+`");
        assert_eq!(err("a+++"), "dependency name must contain zero or two `+`");
        assert_eq!(err("a+b+c"), "`+` in the dependency name must be consecutive");
    }

    #[test]
    fn test_dep_name_real_packages() {
        assert!(validate_dep_name("gtkmm-4.0").is_ok());
        assert!(validate_dep_name("ncurses++").is_ok());
    }

    #[test]
    fn test_dep_key_git() {
        let dep = Dependency::Git(GitDependency {
            name: "fmt".into(),
            url: "https://github.com/fmtlib/fmt.git".into(),
            target: Some("11.0.0".into()),
        });
        assert_eq!(
            dep.key(Path::new("/proj")),
            DepKey::Git("https://github.com/fmtlib/fmt.git#11.0.0".into())
        );

        let untargeted = Dependency::Git(GitDependency {
            name: "fmt".into(),
            url: "https://github.com/fmtlib/fmt.git".into(),
            target: None,
        });
        assert_ne!(dep.key(Path::new("/proj")), untargeted.key(Path::new("/proj")));
    }

    #[test]
    fn test_dep_key_path_canonicalizes() {
        let dep = Dependency::Path(PathDependency {
            name: "inner".into(),
            path: "../inner".into(),
        });
        let from_a = dep.key(Path::new("/ws/a"));
        let also_inner = Dependency::Path(PathDependency {
            name: "inner".into(),
            path: "../a/../inner".into(),
        });
        let from_b = also_inner.key(Path::new("/ws/b"));
        assert_eq!(from_a, from_b);
        assert_eq!(from_a, DepKey::Path(PathBuf::from("/ws/inner")));
    }

    #[test]
    fn test_dep_key_stable_across_calls() {
        let dep = Dependency::System(SystemDependency {
            name: "zlib".into(),
            version_req: ">=1.2".parse().unwrap(),
        });
        assert_eq!(dep.key(Path::new("/x")), dep.key(Path::new("/y")));
    }
}

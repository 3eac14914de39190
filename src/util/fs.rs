//! Filesystem utilities.

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};

/// Canonicalize a path without requiring it to exist: resolves as far as
/// the filesystem allows, then normalizes the rest lexically.
pub fn weakly_canonical(path: &Path) -> PathBuf {
    if let Ok(canon) = path.canonicalize() {
        return canon;
    }

    // Canonicalize the longest existing prefix, append the remainder
    // lexically normalized.
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut result = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::ParentDir => {
                result.pop();
            }
            Component::CurDir => {}
            other => result.push(other.as_os_str()),
        }
    }
    result
}

/// Relative path from `base` to `path`, `None` if it cannot be computed.
pub fn relative_from(path: &Path, base: &Path) -> Option<PathBuf> {
    pathdiff::diff_paths(path, base)
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Write a file all-or-none: the content lands in a sibling temp file first
/// and is renamed into place, so a failed write never leaves a torn file.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents)
        .with_context(|| format!("failed to write file: {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to rename {} to {}", tmp.display(), path.display()))?;
    Ok(())
}

/// Read a file to string with a path-bearing error.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_weakly_canonical_existing() {
        let tmp = TempDir::new().unwrap();
        let canon = weakly_canonical(tmp.path());
        assert!(canon.is_absolute());
    }

    #[test]
    fn test_weakly_canonical_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("a").join("..").join("b");
        let canon = weakly_canonical(&target);
        assert!(canon.is_absolute());
        assert!(canon.ends_with("b"));
        assert!(!canon.to_string_lossy().contains(".."));
    }

    #[test]
    fn test_relative_from() {
        let rel = relative_from(Path::new("/a/b/c"), Path::new("/a")).unwrap();
        assert_eq!(rel, PathBuf::from("b/c"));

        let rel = relative_from(Path::new("/a"), Path::new("/a/b")).unwrap();
        assert_eq!(rel, PathBuf::from(".."));
    }

    #[test]
    fn test_write_atomic() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("sub").join("file.txt");
        write_atomic(&path, "content").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "content");
        assert!(!path.with_extension("tmp").exists());
    }
}

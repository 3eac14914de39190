//! Source tree conventions.
//!
//! Projects are organized by convention: `src/` for the binary and its
//! translation units, `lib/` for library sources, `include/` for public
//! headers, `tests/` for integration tests.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Recognized C++ source extensions.
pub const SOURCE_FILE_EXTS: [&str; 5] = ["c", "c++", "cc", "cpp", "cxx"];

/// Recognized C++ header extensions.
pub const HEADER_FILE_EXTS: [&str; 5] = ["h", "h++", "hh", "hpp", "hxx"];

/// Whether the path has a recognized source extension.
pub fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SOURCE_FILE_EXTS.contains(&ext))
}

/// Whether the path has a recognized header extension.
pub fn is_header_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| HEADER_FILE_EXTS.contains(&ext))
}

/// Recursively list source files under `dir`, lexicographically sorted.
pub fn list_source_files(dir: &Path) -> Vec<PathBuf> {
    let mut sources: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_source_file(path))
        .collect();
    sources.sort();
    sources
}

/// A canonical source root and the subdirectory its objects land in under
/// the build output (`lib/` for library sources, none for `src/`).
#[derive(Debug, Clone)]
pub struct SourceRoot {
    pub directory: PathBuf,
    pub object_subdir: Option<&'static str>,
}

impl SourceRoot {
    pub fn new(directory: PathBuf) -> Self {
        SourceRoot {
            directory,
            object_subdir: None,
        }
    }

    pub fn with_object_subdir(directory: PathBuf, subdir: &'static str) -> Self {
        SourceRoot {
            directory,
            object_subdir: Some(subdir),
        }
    }
}

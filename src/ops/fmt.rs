//! `fmt`: run clang-format over the project's sources and headers.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{bail, ensure, Result};
use walkdir::WalkDir;

use crate::builder::layout::{is_header_file, is_source_file};
use crate::core::manifest::{Manifest, MANIFEST_FILE};
use crate::util::process::{command_exists, ProcessBuilder};
use crate::util::shell;

/// Options for one `fmt` invocation.
#[derive(Debug, Default)]
pub struct FmtOptions {
    /// Dry-run and fail on formatting differences.
    pub check: bool,

    /// Paths (project-relative) excluded from formatting.
    pub excludes: Vec<PathBuf>,

    /// Ignore `.gitignore` and format everything.
    pub no_ignore_vcs: bool,
}

struct TargetFile {
    path: PathBuf,
    mod_time: Option<SystemTime>,
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Collect format targets beneath `project_dir`: sources and headers,
/// skipping nested cabin projects, git-ignored paths, and excluded paths.
fn collect_format_targets(
    project_dir: &Path,
    excludes: &[PathBuf],
    use_vcs_ignore: bool,
) -> Vec<TargetFile> {
    let repo = if use_vcs_ignore {
        match git2::Repository::open(project_dir) {
            Ok(repo) => Some(repo),
            Err(_) => {
                tracing::debug!("no git repository found");
                None
            }
        }
    } else {
        None
    };

    let is_ignored = |rel: &Path| -> bool {
        if excludes.iter().any(|ex| ex == rel) {
            return true;
        }
        if let Some(repo) = &repo {
            if repo.is_path_ignored(rel).unwrap_or(false) {
                return true;
            }
        }
        false
    };

    let mut files = Vec::new();
    let walker = WalkDir::new(project_dir).into_iter();
    let it = walker.filter_entry(|entry| {
        let rel = match entry.path().strip_prefix(project_dir) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
            _ => return true,
        };
        if entry.file_type().is_dir() {
            if entry.path().join(MANIFEST_FILE).exists() {
                tracing::debug!("ignore nested project: {}", rel.display());
                return false;
            }
            if is_ignored(&rel) {
                tracing::debug!("ignore: {}", rel.display());
                return false;
            }
        }
        true
    });

    for entry in it {
        let Ok(entry) = entry else {
            continue;
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(project_dir) else {
            continue;
        };
        if is_ignored(rel) {
            continue;
        }
        if is_source_file(entry.path()) || is_header_file(entry.path()) {
            files.push(TargetFile {
                path: rel.to_path_buf(),
                mod_time: modified(entry.path()),
            });
        }
    }
    files
}

fn count_modified_files(project_dir: &Path, files: &[TargetFile]) -> usize {
    files
        .iter()
        .filter(|file| {
            let after = modified(&project_dir.join(&file.path));
            after.is_some() && after != file.mod_time
        })
        .count()
}

/// Run clang-format (or `$CABIN_FMT`) over the collected targets.
pub fn fmt(options: &FmtOptions) -> Result<()> {
    let fmt_cmd = std::env::var("CABIN_FMT").unwrap_or_else(|_| "clang-format".to_string());
    ensure!(
        command_exists(&fmt_cmd),
        "fmt command requires clang-format; try installing it by:\n  apt/brew install clang-format"
    );

    let manifest = Manifest::load_from_cwd()?;
    let project_dir = manifest.dir().to_path_buf();

    let files = collect_format_targets(&project_dir, &options.excludes, !options.no_ignore_vcs);
    if files.is_empty() {
        shell::warn("no files to format");
        return Ok(());
    }

    let mut args = vec![
        "--style=file".to_string(),
        "--fallback-style=LLVM".to_string(),
        "-Werror".to_string(),
    ];
    if shell::is_verbose() {
        args.push("--verbose".to_string());
    }
    if options.check {
        args.push("--dry-run".to_string());
    } else {
        args.push("-i".to_string());
    }
    args.extend(files.iter().map(|f| f.path.display().to_string()));

    let status = ProcessBuilder::new(&fmt_cmd)
        .args(&args)
        .cwd(&project_dir)
        .status()?;
    if !status.success() {
        bail!("clang-format exited with {:?}", status.code());
    }

    let num_files = files.len();
    let plural = if num_files == 1 { "" } else { "s" };
    if options.check {
        shell::status(
            "Checked",
            format!("{} file{} with no format required", num_files, plural),
        );
    } else {
        let num_modified = count_modified_files(&project_dir, &files);
        shell::status(
            "Formatted",
            format!("{} out of {} file{}", num_modified, num_files, plural),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_collect_targets_skips_nested_projects() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("src")).unwrap();
        std::fs::write(tmp.path().join("src").join("main.cc"), "").unwrap();
        std::fs::write(tmp.path().join("header.hpp"), "").unwrap();

        let nested = tmp.path().join("vendor");
        std::fs::create_dir_all(nested.join("src")).unwrap();
        std::fs::write(nested.join(MANIFEST_FILE), "").unwrap();
        std::fs::write(nested.join("src").join("lib.cc"), "").unwrap();

        let files = collect_format_targets(tmp.path(), &[], false);
        let mut paths: Vec<String> = files
            .iter()
            .map(|f| f.path.display().to_string())
            .collect();
        paths.sort();
        assert_eq!(paths, vec!["header.hpp", "src/main.cc"]);
    }

    #[test]
    fn test_collect_targets_honors_excludes() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("src")).unwrap();
        std::fs::write(tmp.path().join("src").join("main.cc"), "").unwrap();
        std::fs::write(tmp.path().join("src").join("skip.cc"), "").unwrap();

        let files =
            collect_format_targets(tmp.path(), &[PathBuf::from("src/skip.cc")], false);
        let paths: Vec<String> = files
            .iter()
            .map(|f| f.path.display().to_string())
            .collect();
        assert_eq!(paths, vec!["src/main.cc"]);
    }

    #[test]
    fn test_count_modified_files() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.cc");
        std::fs::write(&path, "x").unwrap();

        let files = vec![TargetFile {
            path: PathBuf::from("a.cc"),
            mod_time: modified(&path),
        }];
        assert_eq!(count_modified_files(tmp.path(), &files), 0);

        let stale = vec![TargetFile {
            path: PathBuf::from("a.cc"),
            mod_time: Some(SystemTime::UNIX_EPOCH),
        }];
        assert_eq!(count_modified_files(tmp.path(), &stale), 1);
    }
}

//! `search`: query the system package space.
//!
//! There is no package registry; search walks what pkg-config knows about
//! and matches the query against module names and descriptions.

use anyhow::{ensure, Result};

use crate::util::process::{command_exists, ProcessBuilder};
use crate::util::shell;

/// Entries of `pkg-config --list-all` matching `query` (case-insensitive),
/// in listing order.
fn matching_packages(listing: &str, query: &str) -> Vec<String> {
    let query = query.to_lowercase();
    listing
        .lines()
        .filter(|line| line.to_lowercase().contains(&query))
        .map(|line| line.trim_end().to_string())
        .collect()
}

/// Search installed system packages for `query`.
pub fn search(query: &str) -> Result<()> {
    ensure!(
        command_exists("pkg-config"),
        "search requires pkg-config; try installing it by:\n  apt/brew install pkg-config"
    );

    let output = ProcessBuilder::new("pkg-config")
        .arg("--list-all")
        .output_checked()?;
    let listing = String::from_utf8_lossy(&output.stdout);

    let matches = matching_packages(&listing, query);
    if matches.is_empty() {
        shell::warn(format!("no packages found matching `{}`", query));
        return Ok(());
    }
    for line in matches {
        println!("{}", line);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
zlib                zlib - zlib compression library
fmt                 fmt - A modern formatting library
libcurl             libcurl - Library to transfer files
";

    #[test]
    fn test_matching_packages_by_name() {
        let matches = matching_packages(LISTING, "fmt");
        assert_eq!(matches.len(), 1);
        assert!(matches[0].starts_with("fmt"));
    }

    #[test]
    fn test_matching_packages_by_description() {
        let matches = matching_packages(LISTING, "compression");
        assert_eq!(matches.len(), 1);
        assert!(matches[0].starts_with("zlib"));
    }

    #[test]
    fn test_matching_packages_case_insensitive() {
        let matches = matching_packages(LISTING, "LIBRARY");
        assert_eq!(matches.len(), 3);
    }

    #[test]
    fn test_matching_packages_none() {
        assert!(matching_packages(LISTING, "nonexistent").is_empty());
    }
}

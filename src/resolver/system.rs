//! System dependency installation via pkg-config.

use anyhow::{Context, Result};
use semver::{Comparator, Op, VersionReq};

use crate::builder::opts::{CFlags, CompilerOpts, LdFlags};
use crate::core::dependency::SystemDependency;
use crate::util::process::ProcessBuilder;

/// Probe pkg-config for the dependency's compile and link flags.
pub fn install(dep: &SystemDependency) -> Result<CompilerOpts> {
    let query = to_pkg_config_query(&dep.name, &dep.version_req);

    let cflags_output = pkg_config(&["--cflags", &query])
        .with_context(|| format!("failed to resolve system dependency `{}`", dep.name))?;
    let libs_output = pkg_config(&["--libs", &query])
        .with_context(|| format!("failed to resolve system dependency `{}`", dep.name))?;

    Ok(CompilerOpts {
        c_flags: CFlags::parse_flags(&cflags_output),
        ld_flags: LdFlags::parse_flags(&libs_output),
    })
}

fn pkg_config(args: &[&str]) -> Result<String> {
    let output = ProcessBuilder::new("pkg-config").args(args).output_checked()?;
    Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
}

/// Render a semver requirement as a pkg-config module query. Tilde, caret,
/// and wildcard comparators expand into a `>=`/`<` pair; the rest map
/// directly. An unconstrained requirement is just the module name.
pub fn to_pkg_config_query(name: &str, req: &VersionReq) -> String {
    let mut terms = Vec::new();
    for comparator in &req.comparators {
        for (op, version) in expand_comparator(comparator) {
            terms.push(format!("{} {} {}", name, op, version));
        }
    }
    if terms.is_empty() {
        return name.to_string();
    }
    terms.join(" ")
}

fn render_version(c: &Comparator, bump_major: bool, bump_minor: bool) -> String {
    let major = if bump_major { c.major + 1 } else { c.major };
    let minor = match (bump_major, bump_minor) {
        (true, _) => 0,
        (false, true) => c.minor.unwrap_or(0) + 1,
        (false, false) => c.minor.unwrap_or(0),
    };
    let patch = if bump_major || bump_minor {
        0
    } else {
        c.patch.unwrap_or(0)
    };
    format!("{}.{}.{}", major, minor, patch)
}

fn expand_comparator(c: &Comparator) -> Vec<(&'static str, String)> {
    let lower = render_version(c, false, false);
    match c.op {
        Op::Exact => vec![("=", lower)],
        Op::Greater => vec![(">", lower)],
        Op::GreaterEq => vec![(">=", lower)],
        Op::Less => vec![("<", lower)],
        Op::LessEq => vec![("<=", lower)],
        Op::Tilde => {
            // ~M.m.p admits patch-level changes.
            let upper = if c.minor.is_some() {
                render_version(c, false, true)
            } else {
                render_version(c, true, false)
            };
            vec![(">=", lower), ("<", upper)]
        }
        Op::Caret => {
            // ^M.m.p admits changes below the leftmost non-zero part.
            let upper = if c.major > 0 || c.minor.is_none() {
                render_version(c, true, false)
            } else if c.minor != Some(0) || c.patch.is_none() {
                render_version(c, false, true)
            } else {
                format!("0.0.{}", c.patch.unwrap_or(0) + 1)
            };
            vec![(">=", lower), ("<", upper)]
        }
        Op::Wildcard => {
            let upper = if c.minor.is_some() {
                render_version(c, false, true)
            } else {
                render_version(c, true, false)
            };
            vec![(">=", lower), ("<", upper)]
        }
        _ => vec![(">=", lower)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(name: &str, req: &str) -> String {
        to_pkg_config_query(name, &req.parse().unwrap())
    }

    #[test]
    fn test_query_unconstrained() {
        assert_eq!(query("zlib", "*"), "zlib");
    }

    #[test]
    fn test_query_simple_comparators() {
        assert_eq!(query("zlib", ">=1.2"), "zlib >= 1.2.0");
        assert_eq!(query("zlib", ">1.2.11"), "zlib > 1.2.11");
        assert_eq!(query("zlib", "<2"), "zlib < 2.0.0");
        assert_eq!(query("zlib", "=1.2.11"), "zlib = 1.2.11");
    }

    #[test]
    fn test_query_range() {
        assert_eq!(query("fmt", ">=9, <12"), "fmt >= 9.0.0 fmt < 12.0.0");
    }

    #[test]
    fn test_query_caret() {
        assert_eq!(query("fmt", "^11.1.3"), "fmt >= 11.1.3 fmt < 12.0.0");
        assert_eq!(query("fmt", "^0.3.1"), "fmt >= 0.3.1 fmt < 0.4.0");
    }

    #[test]
    fn test_query_tilde() {
        assert_eq!(query("fmt", "~1.2.3"), "fmt >= 1.2.3 fmt < 1.3.0");
        assert_eq!(query("fmt", "~1"), "fmt >= 1.0.0 fmt < 2.0.0");
    }

    #[test]
    fn test_query_wildcard() {
        assert_eq!(query("fmt", "1.*"), "fmt >= 1.0.0 fmt < 2.0.0");
    }
}

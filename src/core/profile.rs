//! Build profiles.
//!
//! Three profile keys exist (`dev`, `release`, `test`); all inherit missing
//! fields from the shared `[profile]` base. `test` inherits from `dev`,
//! with `inherit-mode` controlling whether its flags append to or overwrite
//! the dev flags.

use std::collections::HashMap;
use std::fmt;

use anyhow::{bail, ensure, Result};
use serde::Deserialize;

/// A named build profile key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BuildProfile {
    #[default]
    Dev,
    Release,
    Test,
}

impl fmt::Display for BuildProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildProfile::Dev => f.write_str("dev"),
            BuildProfile::Release => f.write_str("release"),
            BuildProfile::Test => f.write_str("test"),
        }
    }
}

/// Resolved toolchain options for one profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub cxxflags: Vec<String>,
    pub ldflags: Vec<String>,
    pub lto: bool,
    pub debug: bool,
    pub opt_level: u8,
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.opt_level == 0 {
            f.write_str("unoptimized")?;
        } else {
            f.write_str("optimized")?;
        }
        if self.debug {
            f.write_str(" + debuginfo")?;
        }
        Ok(())
    }
}

/// Raw `[profile]` keys as they appear in TOML, before inheritance.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawProfileKeys {
    #[serde(default)]
    pub cxxflags: Option<Vec<String>>,

    #[serde(default)]
    pub ldflags: Option<Vec<String>>,

    #[serde(default)]
    pub lto: Option<bool>,

    #[serde(default)]
    pub debug: Option<bool>,

    #[serde(default, rename = "opt-level")]
    pub opt_level: Option<u8>,

    #[serde(default, rename = "inherit-mode")]
    pub inherit_mode: Option<String>,
}

/// The `[profile]` section: shared base keys plus per-profile overrides.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawProfiles {
    #[serde(flatten)]
    pub base: RawProfileKeys,

    #[serde(default)]
    pub dev: Option<RawProfileKeys>,

    #[serde(default)]
    pub release: Option<RawProfileKeys>,

    #[serde(default)]
    pub test: Option<RawProfileKeys>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InheritMode {
    Append,
    Overwrite,
}

fn parse_inherit_mode(mode: &str) -> Result<InheritMode> {
    match mode {
        "append" => Ok(InheritMode::Append),
        "overwrite" => Ok(InheritMode::Overwrite),
        _ => bail!("invalid inherit-mode: `{}`", mode),
    }
}

fn validate_opt_level(opt_level: u8) -> Result<u8> {
    ensure!(opt_level <= 3, "opt-level must be between 0 and 3");
    Ok(opt_level)
}

/// Each flag must start with `-` and stay within a conservative alphabet;
/// one space is admitted for flags like `-framework Metal`.
pub(crate) fn validate_flag(kind: &str, flag: &str) -> Result<()> {
    ensure!(
        flag.starts_with('-'),
        "{} must start with `-`",
        kind
    );

    const ALLOWED: [char; 7] = ['-', '_', '=', '+', ':', '.', ','];
    let mut seen_space = false;
    for c in flag.chars() {
        if c == ' ' {
            ensure!(!seen_space, "{} must only contain [' '] once", kind);
            seen_space = true;
            continue;
        }
        ensure!(
            c.is_ascii_alphanumeric() || ALLOWED.contains(&c),
            "{} must only contain {:?} or alphanumeric characters",
            kind,
            ALLOWED
        );
    }
    Ok(())
}

fn validate_flags(kind: &str, flags: Vec<String>) -> Result<Vec<String>> {
    for flag in &flags {
        validate_flag(kind, flag)?;
    }
    Ok(flags)
}

fn inherit_flags(mode: InheritMode, base: &[String], new: &[String]) -> Vec<String> {
    if new.is_empty() {
        return base.to_vec();
    }
    match mode {
        InheritMode::Append => {
            let mut merged = base.to_vec();
            merged.extend_from_slice(new);
            merged
        }
        InheritMode::Overwrite => new.to_vec(),
    }
}

fn resolve_leaf(
    leaf: Option<&RawProfileKeys>,
    base: &RawProfileKeys,
    default_debug: bool,
    default_opt_level: u8,
) -> Result<Profile> {
    let empty = RawProfileKeys::default();
    let leaf = leaf.unwrap_or(&empty);

    let cxxflags = validate_flags(
        "cxxflags",
        leaf.cxxflags
            .clone()
            .or_else(|| base.cxxflags.clone())
            .unwrap_or_default(),
    )?;
    let ldflags = validate_flags(
        "ldflags",
        leaf.ldflags
            .clone()
            .or_else(|| base.ldflags.clone())
            .unwrap_or_default(),
    )?;
    let lto = leaf.lto.or(base.lto).unwrap_or(false);
    let debug = leaf.debug.or(base.debug).unwrap_or(default_debug);
    let opt_level = validate_opt_level(
        leaf.opt_level.or(base.opt_level).unwrap_or(default_opt_level),
    )?;

    Ok(Profile {
        cxxflags,
        ldflags,
        lto,
        debug,
        opt_level,
    })
}

/// Test inherits from the resolved dev profile rather than the base.
fn resolve_test(leaf: Option<&RawProfileKeys>, dev: &Profile) -> Result<Profile> {
    let empty = RawProfileKeys::default();
    let leaf = leaf.unwrap_or(&empty);

    let mode = parse_inherit_mode(leaf.inherit_mode.as_deref().unwrap_or("append"))?;

    let cxxflags = inherit_flags(
        mode,
        &dev.cxxflags,
        &validate_flags("cxxflags", leaf.cxxflags.clone().unwrap_or_default())?,
    );
    let ldflags = inherit_flags(
        mode,
        &dev.ldflags,
        &validate_flags("ldflags", leaf.ldflags.clone().unwrap_or_default())?,
    );
    let lto = leaf.lto.unwrap_or(dev.lto);
    let debug = leaf.debug.unwrap_or(dev.debug);
    let opt_level = validate_opt_level(leaf.opt_level.unwrap_or(dev.opt_level))?;

    Ok(Profile {
        cxxflags,
        ldflags,
        lto,
        debug,
        opt_level,
    })
}

pub(crate) fn resolve_profiles(raw: &RawProfiles) -> Result<HashMap<BuildProfile, Profile>> {
    let dev = resolve_leaf(raw.dev.as_ref(), &raw.base, true, 0)?;
    let release = resolve_leaf(raw.release.as_ref(), &raw.base, false, 3)?;
    let test = resolve_test(raw.test.as_ref(), &dev)?;

    let mut profiles = HashMap::new();
    profiles.insert(BuildProfile::Dev, dev);
    profiles.insert(BuildProfile::Release, release);
    profiles.insert(BuildProfile::Test, test);
    Ok(profiles)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<HashMap<BuildProfile, Profile>> {
        #[derive(Deserialize, Default)]
        struct Doc {
            #[serde(default)]
            profile: RawProfiles,
        }
        let doc: Doc = toml::from_str(content).unwrap();
        resolve_profiles(&doc.profile)
    }

    fn dev_default() -> Profile {
        Profile {
            cxxflags: vec![],
            ldflags: vec![],
            lto: false,
            debug: true,
            opt_level: 0,
        }
    }

    fn release_default() -> Profile {
        Profile {
            cxxflags: vec![],
            ldflags: vec![],
            lto: false,
            debug: false,
            opt_level: 3,
        }
    }

    #[test]
    fn test_profiles_empty() {
        let profiles = parse("").unwrap();
        assert_eq!(profiles.len(), 3);
        assert_eq!(profiles[&BuildProfile::Dev], dev_default());
        assert_eq!(profiles[&BuildProfile::Release], release_default());
        assert_eq!(profiles[&BuildProfile::Test], dev_default());
    }

    #[test]
    fn test_profiles_base_fills_all() {
        let profiles = parse(
            r#"
[profile]
cxxflags = ["-fno-rtti"]
ldflags = ["-lm"]
lto = true
debug = true
opt-level = 2
"#,
        )
        .unwrap();

        let expected = Profile {
            cxxflags: vec!["-fno-rtti".into()],
            ldflags: vec!["-lm".into()],
            lto: true,
            debug: true,
            opt_level: 2,
        };
        assert_eq!(profiles[&BuildProfile::Dev], expected);
        assert_eq!(profiles[&BuildProfile::Release], expected);
        assert_eq!(profiles[&BuildProfile::Test], expected);
    }

    #[test]
    fn test_profiles_leaf_overrides_base() {
        let profiles = parse(
            r#"
[profile]
opt-level = 2

[profile.dev]
opt-level = 1

[profile.test]
opt-level = 3
"#,
        )
        .unwrap();

        assert_eq!(profiles[&BuildProfile::Dev].opt_level, 1);
        assert_eq!(profiles[&BuildProfile::Release].opt_level, 2);
        assert_eq!(profiles[&BuildProfile::Test].opt_level, 3);
        assert!(profiles[&BuildProfile::Test].debug);
    }

    #[test]
    fn test_profiles_empty_leaf_list_overrides_base() {
        let profiles = parse(
            r#"
[profile]
cxxflags = ["-fno-rtti"]

[profile.dev]
cxxflags = []

[profile.release]
cxxflags = []
"#,
        )
        .unwrap();

        assert_eq!(profiles[&BuildProfile::Dev], dev_default());
        assert_eq!(profiles[&BuildProfile::Release], release_default());
        assert_eq!(profiles[&BuildProfile::Test], dev_default());
    }

    #[test]
    fn test_profile_test_appends_to_dev() {
        let profiles = parse(
            r#"
[profile.dev]
cxxflags = ["-A"]

[profile.test]
cxxflags = ["-B"]
"#,
        )
        .unwrap();

        assert_eq!(profiles[&BuildProfile::Dev].cxxflags, vec!["-A"]);
        assert_eq!(profiles[&BuildProfile::Test].cxxflags, vec!["-A", "-B"]);
        assert_eq!(profiles[&BuildProfile::Release], release_default());
    }

    #[test]
    fn test_profile_test_overwrite_mode() {
        let profiles = parse(
            r#"
[profile.dev]
cxxflags = ["-A"]

[profile.test]
inherit-mode = "overwrite"
cxxflags = ["-B"]
"#,
        )
        .unwrap();

        assert_eq!(profiles[&BuildProfile::Dev].cxxflags, vec!["-A"]);
        assert_eq!(profiles[&BuildProfile::Test].cxxflags, vec!["-B"]);
    }

    #[test]
    fn test_profile_invalid_inherit_mode() {
        let err = parse(
            r#"
[profile.test]
inherit-mode = "UNKNOWN"
"#,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "invalid inherit-mode: `UNKNOWN`");
    }

    #[test]
    fn test_opt_level_range() {
        assert!(parse("[profile]\nopt-level = 3\n").is_ok());
        let err = parse("[profile]\nopt-level = 4\n").unwrap_err();
        assert_eq!(err.to_string(), "opt-level must be between 0 and 3");
    }

    #[test]
    fn test_validate_flag() {
        assert!(validate_flag("cxxflags", "-fsanitize=address,undefined").is_ok());
        assert!(validate_flag("ldflags", "-framework Metal").is_ok());
        assert_eq!(
            validate_flag("ldflags", "-framework  Metal")
                .unwrap_err()
                .to_string(),
            "ldflags must only contain [' '] once"
        );
        assert!(validate_flag("ldflags", "-framework Metal && bash").is_err());
        assert_eq!(
            validate_flag("cxxflags", "Wall").unwrap_err().to_string(),
            "cxxflags must start with `-`"
        );
    }

    #[test]
    fn test_profile_display() {
        assert_eq!(dev_default().to_string(), "unoptimized + debuginfo");
        assert_eq!(release_default().to_string(), "optimized");
    }
}

//! `cabin.toml` manifest parsing and schema.
//!
//! The manifest is deserialized into raw structs and then validated field
//! by field, so every rejection carries a precise message. Dependency
//! tables are walked in declaration order, which later drives installation
//! order.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, ensure, Context, Result};
use semver::Version;
use serde::Deserialize;

use crate::core::dependency::{
    validate_dep_name, Dependency, GitDependency, PathDependency, SystemDependency,
};
use crate::core::edition::Edition;
use crate::core::profile::{resolve_profiles, BuildProfile, Profile, RawProfiles};

/// The manifest file name.
pub const MANIFEST_FILE: &str = "cabin.toml";

/// The parsed and validated manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Absolute path of the manifest file.
    pub path: PathBuf,

    /// Package identity from `[package]`.
    pub package: Package,

    /// `[dependencies]`, in declaration order.
    pub dependencies: Vec<Dependency>,

    /// `[dev-dependencies]`, in declaration order.
    pub dev_dependencies: Vec<Dependency>,

    /// Resolved build profiles (`dev`, `release`, `test`).
    pub profiles: HashMap<BuildProfile, Profile>,

    /// `[lint]` settings.
    pub lint: Lint,
}

/// Package identity.
#[derive(Debug, Clone)]
pub struct Package {
    pub name: String,
    pub edition: Edition,
    pub version: Version,
    pub authors: Vec<String>,
}

/// Lint configuration.
#[derive(Debug, Clone, Default)]
pub struct Lint {
    pub cpplint: Cpplint,
}

/// cpplint filter list from `[lint.cpplint]`.
#[derive(Debug, Clone, Default)]
pub struct Cpplint {
    pub filters: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    package: RawPackage,

    #[serde(default)]
    dependencies: Option<toml::Table>,

    #[serde(default, rename = "dev-dependencies")]
    dev_dependencies: Option<toml::Table>,

    #[serde(default)]
    profile: RawProfiles,

    #[serde(default)]
    lint: Option<RawLint>,
}

#[derive(Debug, Deserialize)]
struct RawPackage {
    name: String,
    version: String,
    edition: String,

    #[serde(default)]
    authors: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLint {
    #[serde(default)]
    cpplint: Option<RawCpplint>,
}

#[derive(Debug, Default, Deserialize)]
struct RawCpplint {
    #[serde(default)]
    filters: Vec<String>,
}

impl Manifest {
    /// Load and validate the manifest at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;
        Self::parse(&content, path)
    }

    /// Find the manifest by walking upward from the current directory and
    /// load it.
    pub fn load_from_cwd() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        let path = Self::find(&cwd)?;
        Self::load(&path)
    }

    /// Walk upward from `start_dir` until a `cabin.toml` is found or the
    /// filesystem root is reached.
    pub fn find(start_dir: &Path) -> Result<PathBuf> {
        let mut candidate = start_dir.to_path_buf();
        loop {
            let manifest_path = candidate.join(MANIFEST_FILE);
            tracing::trace!("finding manifest: {}", manifest_path.display());
            if manifest_path.exists() {
                return Ok(manifest_path);
            }
            if !candidate.pop() {
                break;
            }
        }
        bail!(
            "{} not found in `{}` and its parents",
            MANIFEST_FILE,
            start_dir.display()
        );
    }

    /// Parse and validate manifest content.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        // The TOML parser is the only boundary that reports by exception;
        // its message carries line/column positions, so keep it verbatim.
        let raw: RawManifest = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("{}", e.to_string().trim_end()))
            .with_context(|| format!("failed to parse {}", path.display()))?;

        validate_package_name(&raw.package.name)?;
        let edition = Edition::try_from_str(&raw.package.edition)?;
        let version = Version::parse(&raw.package.version)
            .with_context(|| format!("invalid semver: {}", raw.package.version))?;

        let dependencies = parse_dependencies(raw.dependencies.as_ref())?;
        let dev_dependencies = parse_dependencies(raw.dev_dependencies.as_ref())?;
        let profiles = resolve_profiles(&raw.profile)?;

        let lint = Lint {
            cpplint: Cpplint {
                filters: raw
                    .lint
                    .and_then(|l| l.cpplint)
                    .map(|c| c.filters)
                    .unwrap_or_default(),
            },
        };

        Ok(Manifest {
            path: path.to_path_buf(),
            package: Package {
                name: raw.package.name,
                edition,
                version,
                authors: raw.package.authors,
            },
            dependencies,
            dev_dependencies,
            profiles,
            lint,
        })
    }

    /// The directory containing the manifest.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }

    /// Look up a resolved profile.
    pub fn profile(&self, key: BuildProfile) -> &Profile {
        &self.profiles[&key]
    }
}

fn parse_dependencies(table: Option<&toml::Table>) -> Result<Vec<Dependency>> {
    let Some(table) = table else {
        return Ok(Vec::new());
    };

    let mut deps = Vec::new();
    for (name, value) in table {
        let Some(info) = value.as_table() else {
            bail!(
                "Only git dependency, path dependency, and system dependency are supported \
                 for now: {}",
                name
            );
        };

        validate_dep_name(name)?;

        if info.contains_key("git") {
            deps.push(Dependency::Git(parse_git_dep(name, info)?));
        } else if info.get("system").and_then(|v| v.as_bool()) == Some(true) {
            deps.push(Dependency::System(parse_system_dep(name, info)?));
        } else if info.contains_key("path") {
            deps.push(Dependency::Path(parse_path_dep(name, info)?));
        } else {
            bail!(
                "Only git dependency, path dependency, and system dependency are supported \
                 for now: {}",
                name
            );
        }
    }
    Ok(deps)
}

fn parse_git_dep(name: &str, info: &toml::Table) -> Result<GitDependency> {
    let url = info
        .get("git")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .with_context(|| format!("dependency `{}`: `git` must be a string", name))?;

    let mut target = None;
    for key in ["rev", "tag", "branch"] {
        if let Some(value) = info.get(key).and_then(|v| v.as_str()) {
            target = Some(value.to_string());
            break;
        }
    }

    Ok(GitDependency {
        name: name.to_string(),
        url,
        target,
    })
}

fn parse_path_dep(name: &str, info: &toml::Table) -> Result<PathDependency> {
    let path = info
        .get("path")
        .and_then(|v| v.as_str())
        .context("path dependency must be a string")?;
    Ok(PathDependency {
        name: name.to_string(),
        path: path.to_string(),
    })
}

fn parse_system_dep(name: &str, info: &toml::Table) -> Result<SystemDependency> {
    let version = info
        .get("version")
        .and_then(|v| v.as_str())
        .context("system dependency version must be a string")?;
    let version_req = version
        .parse()
        .with_context(|| format!("invalid version requirement: {}", version))?;
    Ok(SystemDependency {
        name: name.to_string(),
        version_req,
    })
}

/// Validate a package name: non-empty, at least two characters, lowercase
/// alphanumerics plus `-`/`_`, starting with a letter, ending alphanumeric,
/// and not a C++ keyword.
pub fn validate_package_name(name: &str) -> Result<()> {
    ensure!(!name.is_empty(), "package name must not be empty");
    ensure!(name.len() > 1, "package name must be more than one character");

    for c in name.chars() {
        if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' && c != '_' {
            bail!(
                "package name must only contain lowercase letters, numbers, dashes, and \
                 underscores"
            );
        }
    }

    let first = name.chars().next().unwrap();
    ensure!(
        first.is_ascii_alphabetic(),
        "package name must start with a letter"
    );
    let last = name.chars().last().unwrap();
    ensure!(
        last.is_ascii_alphanumeric(),
        "package name must end with a letter or digit"
    );

    ensure!(
        !CPP_KEYWORDS.contains(&name),
        "package name must not be a C++ keyword"
    );

    Ok(())
}

const CPP_KEYWORDS: &[&str] = &[
    "alignas",
    "alignof",
    "and",
    "and_eq",
    "asm",
    "atomic_cancel",
    "atomic_commit",
    "atomic_noexcept",
    "auto",
    "bitand",
    "bitor",
    "bool",
    "break",
    "case",
    "catch",
    "char",
    "char16_t",
    "char32_t",
    "char8_t",
    "class",
    "co_await",
    "co_return",
    "co_yield",
    "compl",
    "concept",
    "const",
    "const_cast",
    "consteval",
    "constexpr",
    "constinit",
    "continue",
    "decltype",
    "default",
    "delete",
    "do",
    "double",
    "dynamic_cast",
    "else",
    "enum",
    "explicit",
    "export",
    "extern",
    "false",
    "float",
    "for",
    "friend",
    "goto",
    "if",
    "inline",
    "int",
    "long",
    "mutable",
    "namespace",
    "new",
    "noexcept",
    "not",
    "not_eq",
    "nullptr",
    "operator",
    "or",
    "or_eq",
    "private",
    "protected",
    "public",
    "reflexpr",
    "register",
    "reinterpret_cast",
    "requires",
    "return",
    "short",
    "signed",
    "sizeof",
    "static",
    "static_assert",
    "static_cast",
    "struct",
    "switch",
    "synchronized",
    "template",
    "this",
    "thread_local",
    "throw",
    "true",
    "try",
    "typedef",
    "typeid",
    "typename",
    "union",
    "unsigned",
    "using",
    "virtual",
    "void",
    "volatile",
    "wchar_t",
    "while",
    "xor",
    "xor_eq",
];

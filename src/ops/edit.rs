//! `add` / `remove`: rewriting `[dependencies]` in `cabin.toml`.

use std::path::Path;

use anyhow::{bail, ensure, Context, Result};

use crate::core::dependency::validate_dep_name;
use crate::core::manifest::Manifest;
use crate::util::shell;

/// How `add` should record the new dependencies.
#[derive(Debug, Clone, Default)]
pub struct AddSpec {
    /// Local path dependency.
    pub path: Option<String>,

    /// Git repository URL.
    pub git: Option<String>,

    /// rev/tag/branch for a git dependency, with the key to write.
    pub git_target: Option<(String, String)>,

    /// Version requirement for a system dependency (the default kind).
    pub version: Option<String>,
}

fn load_manifest_table(manifest_path: &Path) -> Result<toml::Table> {
    let content = std::fs::read_to_string(manifest_path)
        .with_context(|| format!("failed to read manifest: {}", manifest_path.display()))?;
    content
        .parse::<toml::Table>()
        .map_err(|e| anyhow::anyhow!("{}", e.to_string().trim_end()))
        .with_context(|| format!("failed to parse {}", manifest_path.display()))
}

fn store_manifest_table(manifest_path: &Path, table: &toml::Table) -> Result<()> {
    let rendered =
        toml::to_string(table).context("failed to serialize manifest")?;
    std::fs::write(manifest_path, rendered)
        .with_context(|| format!("failed to write {}", manifest_path.display()))
}

fn dependency_value(spec: &AddSpec) -> toml::Value {
    let mut info = toml::Table::new();
    if let Some(path) = &spec.path {
        info.insert("path".into(), toml::Value::String(path.clone()));
    } else if let Some(git) = &spec.git {
        info.insert("git".into(), toml::Value::String(git.clone()));
        if let Some((key, value)) = &spec.git_target {
            info.insert(key.clone(), toml::Value::String(value.clone()));
        }
    } else {
        let version = spec.version.clone().unwrap_or_else(|| "*".to_string());
        info.insert("version".into(), toml::Value::String(version));
        info.insert("system".into(), toml::Value::Boolean(true));
    }
    toml::Value::Table(info)
}

/// Add the named dependencies to `[dependencies]`.
pub fn add_dependencies(deps: &[String], spec: &AddSpec) -> Result<()> {
    ensure!(
        !deps.is_empty(),
        "`cabin add` requires at least one argument"
    );
    for name in deps {
        validate_dep_name(name)?;
    }

    let cwd = std::env::current_dir().context("failed to get current directory")?;
    let manifest_path = Manifest::find(&cwd)?;
    let mut data = load_manifest_table(&manifest_path)?;

    let table = data
        .entry("dependencies".to_string())
        .or_insert_with(|| toml::Value::Table(toml::Table::new()));
    let Some(table) = table.as_table_mut() else {
        bail!("`[dependencies]` in {} is not a table", manifest_path.display());
    };

    let mut added = Vec::new();
    for name in deps {
        if table.contains_key(name) {
            shell::warn(format!(
                "dependency `{}` already exists in {}",
                name,
                manifest_path.display()
            ));
            continue;
        }
        table.insert(name.clone(), dependency_value(spec));
        added.push(name.as_str());
    }

    if !added.is_empty() {
        store_manifest_table(&manifest_path, &data)?;
        shell::status(
            "Added",
            format!("{} to {}", added.join(", "), manifest_path.display()),
        );
    }
    Ok(())
}

/// Remove the named dependencies from `[dependencies]`.
pub fn remove_dependencies(deps: &[String]) -> Result<()> {
    ensure!(
        !deps.is_empty(),
        "`cabin remove` requires at least one argument"
    );

    let cwd = std::env::current_dir().context("failed to get current directory")?;
    let manifest_path = Manifest::find(&cwd)?;
    let mut data = load_manifest_table(&manifest_path)?;

    let has_deps = data
        .get("dependencies")
        .and_then(|v| v.as_table())
        .map(|t| !t.is_empty())
        .unwrap_or(false);
    ensure!(has_deps, "No dependencies to remove");

    let table = data
        .get_mut("dependencies")
        .and_then(|v| v.as_table_mut())
        .context("`[dependencies]` is not a table")?;

    let mut removed = Vec::new();
    for name in deps {
        if table.remove(name).is_some() {
            removed.push(name.as_str());
        } else {
            shell::warn(format!(
                "Dependency `{}` not found in {}",
                name,
                manifest_path.display()
            ));
        }
    }

    if !removed.is_empty() {
        store_manifest_table(&manifest_path, &data)?;
        shell::status(
            "Removed",
            format!("{} from {}", removed.join(", "), manifest_path.display()),
        );
    }
    Ok(())
}

/// Check there is at most one way to interpret the add request.
pub fn validate_add_spec(spec: &AddSpec) -> Result<()> {
    if spec.path.is_some() && spec.git.is_some() {
        bail!("`--path` and `--git` are mutually exclusive");
    }
    if spec.git_target.is_some() && spec.git.is_none() {
        bail!("`--rev`, `--tag`, and `--branch` require `--git`");
    }
    if spec.version.is_some() && (spec.path.is_some() || spec.git.is_some()) {
        bail!("`--version` only applies to system dependencies");
    }
    Ok(())
}

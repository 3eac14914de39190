//! Compilation-database aggregation.
//!
//! After planning, the executor's own compdb tool is run against every
//! sibling build directory under `cabin-out/` that carries a
//! `build.ninja`. Entries are unique-keyed by `(directory, file)` and
//! written as one pretty-printed array, so repeat invocations and multiple
//! profiles converge on the same `cabin-out/compile_commands.json`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, ensure, Context, Result};

use crate::util::fs::{ensure_dir, write_atomic};
use crate::util::process::ProcessBuilder;

/// Aggregate compile commands for the build dir at `out_dir` and all of
/// its sibling profiles.
pub fn generate(out_dir: &Path) -> Result<()> {
    let out_root = out_dir.parent().unwrap_or(out_dir);

    let mut build_dirs = vec![out_dir.to_path_buf()];
    if out_root.is_dir() {
        for entry in std::fs::read_dir(out_root)
            .with_context(|| format!("failed to read {}", out_root.display()))?
        {
            let path = entry?.path();
            if path.is_dir() && path.join("build.ninja").exists() {
                build_dirs.push(path);
            }
        }
    }
    build_dirs.sort();
    build_dirs.dedup();

    let mut entries: BTreeMap<(String, String), serde_json::Value> = BTreeMap::new();

    for build_dir in &build_dirs {
        if !build_dir.join("build.ninja").exists() {
            continue;
        }
        for entry in compdb_entries(build_dir)? {
            let directory = entry
                .get("directory")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let file = entry
                .get("file")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            if !directory.is_empty() && !file.is_empty() {
                entries.insert((directory, file), entry);
            }
        }
    }

    let combined: Vec<serde_json::Value> = entries.into_values().collect();
    let json = serde_json::to_string_pretty(&combined)
        .context("failed to serialize compile_commands.json")?;

    ensure_dir(out_root)?;
    write_atomic(
        &out_root.join("compile_commands.json"),
        &format!("{}\n", json),
    )
}

fn compdb_entries(build_dir: &Path) -> Result<Vec<serde_json::Value>> {
    let output = ProcessBuilder::new("ninja")
        .arg("-C")
        .arg(build_dir)
        .arg("-t")
        .arg("compdb")
        .arg("cxx_compile")
        .output()?;
    ensure!(
        output.status.success(),
        "ninja -t compdb exited with {:?}",
        output.status.code()
    );

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout)
        .map_err(|e| anyhow::anyhow!("failed to parse ninja -t compdb output: {}", e))?;
    match parsed {
        serde_json::Value::Array(entries) => Ok(entries),
        _ => bail!("invalid compdb output"),
    }
}

//! Dependency resolution and installation.
//!
//! The resolver walks the dependency closure depth-first from the root
//! manifest, installing each node and yielding its compiler options.
//! Installation happens in manifest declaration order; transitive
//! dependencies are installed before their parents contribute options.
//! A name bound to two different [`DepKey`]s anywhere in the closure is a
//! fatal conflict.

pub mod git;
pub mod system;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{bail, ensure, Result};

use crate::builder::driver::{Builder, ScheduleOptions};
use crate::builder::graph::BuildGraph;
use crate::builder::opts::{CompilerOpts, IncludeDir, Lib, LibDir};
use crate::core::dependency::{DepKey, Dependency, PathDependency};
use crate::core::manifest::{Manifest, MANIFEST_FILE};
use crate::core::profile::BuildProfile;
use crate::util::fs::weakly_canonical;
use crate::util::shell;

/// The resolved root of a build: the parsed manifest, ready to be turned
/// into a build graph.
pub struct DepGraph {
    root_path: PathBuf,
    manifest: Option<Manifest>,
}

impl DepGraph {
    pub fn new(root_path: PathBuf) -> Self {
        DepGraph {
            root_path,
            manifest: None,
        }
    }

    /// Parse the root manifest.
    pub fn resolve(&mut self) -> Result<()> {
        let manifest_path = self.root_path.join(MANIFEST_FILE);
        self.manifest = Some(Manifest::load(&manifest_path)?);
        Ok(())
    }

    /// Turn the resolved manifest into a build graph for `profile`.
    pub fn compute_build_graph(&self, profile_key: BuildProfile) -> Result<BuildGraph> {
        let manifest = self
            .manifest
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("dependency graph not resolved"))?;
        BuildGraph::create(manifest.clone(), profile_key)
    }
}

/// Seen dependencies and visited path roots for one resolution pass.
#[derive(Default)]
struct ResolveState {
    seen: HashMap<String, DepKey>,
    visited: HashSet<PathBuf>,
}

/// Install the dependency closure of `manifest` and return each node's
/// compiler options in installation order.
pub fn install_deps(
    manifest: &Manifest,
    profile_key: BuildProfile,
    include_dev_deps: bool,
    suppress_dep_diag: bool,
) -> Result<Vec<CompilerOpts>> {
    let mut state = ResolveState::default();
    let mut installed = Vec::new();
    install_dependencies(
        manifest,
        profile_key,
        include_dev_deps,
        suppress_dep_diag,
        true,
        &mut state,
        &mut installed,
    )?;
    Ok(installed)
}

fn install_dependencies(
    manifest: &Manifest,
    profile_key: BuildProfile,
    include_dev_deps: bool,
    suppress_dep_diag: bool,
    is_root: bool,
    state: &mut ResolveState,
    installed: &mut Vec<CompilerOpts>,
) -> Result<()> {
    for dep in &manifest.dependencies {
        install_one(
            manifest,
            dep,
            profile_key,
            include_dev_deps,
            suppress_dep_diag,
            state,
            installed,
        )?;
    }

    // Dev-dependencies are only installed for the root manifest, never
    // transitively.
    if include_dev_deps && is_root {
        for dep in &manifest.dev_dependencies {
            install_one(
                manifest,
                dep,
                profile_key,
                include_dev_deps,
                suppress_dep_diag,
                state,
                installed,
            )?;
        }
    }

    Ok(())
}

fn install_one(
    manifest: &Manifest,
    dep: &Dependency,
    profile_key: BuildProfile,
    include_dev_deps: bool,
    suppress_dep_diag: bool,
    state: &mut ResolveState,
    installed: &mut Vec<CompilerOpts>,
) -> Result<()> {
    remember_dep(manifest, dep, &mut state.seen)?;

    match dep {
        Dependency::Git(git_dep) => {
            let mut dep_opts = git::install(git_dep)?;

            // A git dependency that is itself a cabin package contributes
            // its own dependency closure.
            let dep_manifest_path = git::install_dir(git_dep)?.join(MANIFEST_FILE);
            if dep_manifest_path.exists() {
                let dep_manifest = Manifest::load(&dep_manifest_path)?;
                let mut nested = Vec::new();
                install_dependencies(
                    &dep_manifest,
                    profile_key,
                    include_dev_deps,
                    suppress_dep_diag,
                    false,
                    state,
                    &mut nested,
                )?;
                for opts in &nested {
                    dep_opts.merge(opts);
                }
            }

            installed.push(dep_opts);
            Ok(())
        }
        Dependency::System(sys_dep) => {
            installed.push(system::install(sys_dep)?);
            Ok(())
        }
        Dependency::Path(path_dep) => install_path_dependency(
            manifest,
            path_dep,
            profile_key,
            include_dev_deps,
            suppress_dep_diag,
            state,
            installed,
        ),
    }
}

fn remember_dep(
    manifest: &Manifest,
    dep: &Dependency,
    seen: &mut HashMap<String, DepKey>,
) -> Result<()> {
    let key = dep.key(manifest.dir());
    let name = dep.name();
    match seen.get(name) {
        None => {
            seen.insert(name.to_string(), key);
            Ok(())
        }
        Some(existing) if *existing == key => Ok(()),
        Some(_) => bail!("dependency `{}` conflicts across manifests", name),
    }
}

fn install_path_dependency(
    manifest: &Manifest,
    path_dep: &PathDependency,
    profile_key: BuildProfile,
    include_dev_deps: bool,
    suppress_dep_diag: bool,
    state: &mut ResolveState,
    installed: &mut Vec<CompilerOpts>,
) -> Result<()> {
    let base_path = manifest.dir();
    let dep_root = weakly_canonical(&base_path.join(&path_dep.path));

    ensure!(
        dep_root.is_dir(),
        "{} can't be accessible as directory",
        dep_root.display()
    );
    if !state.visited.insert(dep_root.clone()) {
        return Ok(());
    }

    let dep_manifest_path = dep_root.join(MANIFEST_FILE);
    ensure!(
        dep_manifest_path.exists(),
        "missing `{}` in path dependency {}",
        MANIFEST_FILE,
        dep_root.display()
    );
    let dep_manifest = Manifest::load(&dep_manifest_path)?;

    if !suppress_dep_diag {
        shell::status(
            "Building",
            format!("{} ({})", dep_manifest.package.name, dep_root.display()),
        );
    }

    // Recursively build the sub-project with the same profile and all
    // per-project logs suppressed. Its dev-dependencies stay out: the
    // dev flag applies to the root manifest only.
    let mut dep_builder = Builder::new(dep_root.clone(), profile_key);
    dep_builder.schedule(ScheduleOptions {
        include_dev_deps: false,
        enable_coverage: false,
        suppress_analysis_log: true,
        suppress_finish_log: true,
        suppress_dep_diag: true,
    })?;
    dep_builder.build()?;

    let dep_graph = dep_builder.graph();
    let dep_out_dir = dep_graph.out_base_path().to_path_buf();
    let lib_path = dep_out_dir.join(dep_graph.library_name());
    let dep_has_library = dep_graph.has_library_target();

    let mut path_opts = CompilerOpts::default();
    path_opts
        .c_flags
        .include_dirs
        .push(IncludeDir::new(resolve_include_dir(&dep_root), false));

    let mut nested = Vec::new();
    install_dependencies(
        &dep_manifest,
        profile_key,
        include_dev_deps,
        suppress_dep_diag,
        false,
        state,
        &mut nested,
    )?;
    for opts in &nested {
        path_opts.merge(opts);
    }

    let lib_built = lib_path.exists();
    if dep_has_library {
        ensure!(
            lib_built,
            "expected `{}` to be built for dependency {}",
            lib_path.display(),
            dep_manifest.package.name
        );
    }

    if lib_built {
        if let Some(lib_dir) = lib_path.parent() {
            path_opts.ld_flags.lib_dirs.insert(0, LibDir::new(lib_dir));
        }
        let mut lib_name = lib_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(stripped) = lib_name.strip_prefix("lib") {
            lib_name = stripped.to_string();
        }
        path_opts.ld_flags.libs.insert(0, Lib::new(lib_name));
    }

    installed.push(path_opts);
    Ok(())
}

/// Dependencies expose their `include/` subdirectory when it exists and is
/// non-empty; otherwise the install root itself.
pub(crate) fn resolve_include_dir(install_dir: &Path) -> PathBuf {
    let include_dir = install_dir.join("include");
    let non_empty = include_dir.is_dir()
        && std::fs::read_dir(&include_dir)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false);
    if non_empty {
        include_dir
    } else {
        install_dir.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dependency::{GitDependency, SystemDependency};
    use tempfile::TempDir;

    fn manifest_at(dir: &Path) -> Manifest {
        let content = "[package]\nname = \"app\"\nedition = \"20\"\nversion = \"0.1.0\"\n";
        Manifest::parse(content, &dir.join(MANIFEST_FILE)).unwrap()
    }

    fn git_dep(name: &str, url: &str) -> Dependency {
        Dependency::Git(GitDependency {
            name: name.into(),
            url: url.into(),
            target: None,
        })
    }

    #[test]
    fn test_remember_dep_same_key_twice_is_ok() {
        let tmp = TempDir::new().unwrap();
        let manifest = manifest_at(tmp.path());
        let mut seen = HashMap::new();

        let dep = git_dep("fmt", "https://github.com/fmtlib/fmt.git");
        remember_dep(&manifest, &dep, &mut seen).unwrap();
        remember_dep(&manifest, &dep, &mut seen).unwrap();
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn test_remember_dep_conflict() {
        let tmp = TempDir::new().unwrap();
        let manifest = manifest_at(tmp.path());
        let mut seen = HashMap::new();

        remember_dep(
            &manifest,
            &git_dep("fmt", "https://github.com/fmtlib/fmt.git"),
            &mut seen,
        )
        .unwrap();
        let err = remember_dep(
            &manifest,
            &git_dep("fmt", "https://example.com/fork/fmt.git"),
            &mut seen,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "dependency `fmt` conflicts across manifests"
        );
    }

    #[test]
    fn test_remember_dep_conflict_across_kinds() {
        let tmp = TempDir::new().unwrap();
        let manifest = manifest_at(tmp.path());
        let mut seen = HashMap::new();

        remember_dep(
            &manifest,
            &git_dep("zlib", "https://github.com/madler/zlib.git"),
            &mut seen,
        )
        .unwrap();
        let err = remember_dep(
            &manifest,
            &Dependency::System(SystemDependency {
                name: "zlib".into(),
                version_req: ">=1.2".parse().unwrap(),
            }),
            &mut seen,
        )
        .unwrap_err();
        assert!(err.to_string().contains("conflicts across manifests"));
    }

    #[test]
    fn test_resolve_include_dir_prefers_nonempty_include() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(resolve_include_dir(tmp.path()), tmp.path());

        let include = tmp.path().join("include");
        std::fs::create_dir(&include).unwrap();
        // Empty include/ falls back to the root.
        assert_eq!(resolve_include_dir(tmp.path()), tmp.path());

        std::fs::write(include.join("api.hpp"), "").unwrap();
        assert_eq!(resolve_include_dir(tmp.path()), include);
    }

    #[test]
    fn test_install_path_dependency_requires_directory() {
        let tmp = TempDir::new().unwrap();
        let manifest = manifest_at(tmp.path());
        let mut state = ResolveState::default();
        let mut installed = Vec::new();

        let err = install_path_dependency(
            &manifest,
            &PathDependency {
                name: "missing".into(),
                path: "missing-dep-root".into(),
            },
            BuildProfile::Dev,
            false,
            true,
            &mut state,
            &mut installed,
        )
        .unwrap_err();
        assert!(err.to_string().contains("can't be accessible as directory"));
    }

    #[test]
    fn test_dep_graph_requires_resolve() {
        let graph = DepGraph::new(PathBuf::from("/nonexistent"));
        let err = graph.compute_build_graph(BuildProfile::Dev).unwrap_err();
        assert_eq!(err.to_string(), "dependency graph not resolved");
    }
}

//! The build driver.
//!
//! [`Builder`] wraps the lifecycle of one project build: resolve the
//! manifest, compute the build graph, plan, then drive the executor for
//! `build`, `test`, and `run`. Scheduling is idempotent; each later stage
//! requires the one before it.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, ensure, Context, Result};

use crate::builder::graph::BuildGraph;
use crate::core::profile::BuildProfile;
use crate::resolver::DepGraph;
use crate::util::fs::relative_from;
use crate::util::process::ProcessBuilder;
use crate::util::shell;

/// Knobs for one scheduling pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduleOptions {
    /// Install `[dev-dependencies]` of the root manifest.
    pub include_dev_deps: bool,

    /// Add `--coverage` to compile and link flags.
    pub enable_coverage: bool,

    /// Skip the `Analyzing` line (sub-project builds).
    pub suppress_analysis_log: bool,

    /// Skip the `Finished` line (sub-project builds).
    pub suppress_finish_log: bool,

    /// Skip per-dependency `Building` lines (transitive installs).
    pub suppress_dep_diag: bool,
}

/// Drives one project through resolve, plan, and execution.
pub struct Builder {
    base_path: PathBuf,
    profile_key: BuildProfile,
    options: ScheduleOptions,
    graph: Option<BuildGraph>,
    out_dir: PathBuf,
}

impl Builder {
    pub fn new(base_path: PathBuf, profile_key: BuildProfile) -> Self {
        Builder {
            base_path,
            profile_key,
            options: ScheduleOptions::default(),
            graph: None,
            out_dir: PathBuf::new(),
        }
    }

    /// Resolve the manifest and dependencies, build the plan in memory,
    /// write plan files if stale, and refresh the compilation database.
    pub fn schedule(&mut self, options: ScheduleOptions) -> Result<()> {
        self.options = options;

        let mut dep_graph = DepGraph::new(self.base_path.clone());
        dep_graph.resolve()?;
        let mut graph = dep_graph.compute_build_graph(self.profile_key)?;

        if options.enable_coverage {
            graph.enable_coverage();
        }
        graph.install_deps(options.include_dev_deps, options.suppress_dep_diag)?;
        graph.plan(!options.suppress_analysis_log)?;

        self.out_dir = graph.out_base_path().to_path_buf();
        self.graph = Some(graph);
        Ok(())
    }

    fn planned_graph(&self) -> Result<&BuildGraph> {
        self.graph
            .as_ref()
            .context("builder.schedule() must be called first")
    }

    /// The planned build graph. Panics when called before `schedule`.
    pub fn graph(&self) -> &BuildGraph {
        self.graph
            .as_ref()
            .expect("builder.schedule() must be called first")
    }

    /// The per-profile output directory.
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// The directory holding the aggregated compilation database.
    pub fn compdb_root(&self) -> PathBuf {
        self.out_dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.out_dir.clone())
    }

    /// Build the library (if any) and then the binary (if any).
    pub fn build(&mut self) -> Result<()> {
        let graph = self.planned_graph()?;
        let start = Instant::now();

        let package_name = graph.manifest().package.name.clone();
        let mut success = true;

        if graph.has_library_target() {
            let status = graph.build_targets(
                &[graph.library_name().to_string()],
                &format!("{}(lib)", package_name),
            )?;
            success = status.success();
        }

        if success && graph.has_binary_target() {
            let status = graph.build_targets(&[package_name.clone()], &package_name)?;
            success = status.success();
        }

        ensure!(success, "build failed");

        if !self.options.suppress_finish_log {
            let profile = graph.manifest().profile(self.profile_key);
            shell::status(
                "Finished",
                format!(
                    "`{}` profile [{}] target(s) in {:.2}s",
                    self.profile_key,
                    profile,
                    start.elapsed().as_secs_f64()
                ),
            );
        }
        Ok(())
    }

    /// Build the library and every test binary, then run each test binary
    /// in lexicographic target order. An optional substring filter selects
    /// which binaries run; the summary reports the filtered-out count.
    pub fn test(&mut self, filter: Option<&str>) -> Result<()> {
        let graph = self.planned_graph()?;
        let package_name = graph.manifest().package.name.clone();
        let build_start = Instant::now();

        if graph.test_targets().is_empty() {
            shell::warn("No test targets found");
            return Ok(());
        }

        if graph.has_library_target() {
            let status = graph.build_targets(
                &[graph.library_name().to_string()],
                &format!("{}(lib)", package_name),
            )?;
            ensure!(status.success(), "build failed");
        }

        let target_names: Vec<String> = graph
            .test_targets()
            .iter()
            .map(|t| t.ninja_target.clone())
            .collect();
        let status =
            graph.build_targets(&target_names, &format!("{}(test)", package_name))?;
        ensure!(status.success(), "build failed");

        if !self.options.suppress_finish_log {
            let profile = graph.manifest().profile(self.profile_key);
            shell::status(
                "Finished",
                format!(
                    "`{}` profile [{}] target(s) in {:.2}s",
                    self.profile_key,
                    profile,
                    build_start.elapsed().as_secs_f64()
                ),
            );
        }

        let run_start = Instant::now();
        let mut passed: usize = 0;
        let mut failed: usize = 0;
        let mut filtered_out: usize = 0;

        for target in graph.test_targets() {
            if let Some(filter) = filter {
                if !target.ninja_target.contains(filter) {
                    filtered_out += 1;
                    continue;
                }
            }

            let absolute_binary = self.out_dir.join(&target.ninja_target);
            let display_path = relative_from(&absolute_binary, graph.manifest().dir())
                .unwrap_or_else(|| absolute_binary.clone());
            shell::status(
                "Running",
                format!(
                    "{} test {} ({})",
                    target.kind.label(),
                    target.source_path,
                    display_path.display()
                ),
            );

            let status = ProcessBuilder::new(&absolute_binary).status()?;
            if status.success() {
                passed += 1;
            } else {
                failed += 1;
            }
        }

        let summary = format!(
            "{} passed; {} failed; {} filtered out; finished in {:.2}s",
            passed,
            failed,
            filtered_out,
            run_start.elapsed().as_secs_f64()
        );
        if failed > 0 {
            bail!("{}", summary);
        }
        shell::status("Ok", summary);
        Ok(())
    }

    /// Build, then spawn the produced binary with the given arguments and
    /// return the child's exit code.
    pub fn run(&mut self, args: &[String]) -> Result<i32> {
        self.build()?;

        let graph = self.planned_graph()?;
        let package_name = graph.manifest().package.name.clone();
        let display_dir = relative_from(&self.out_dir, graph.manifest().dir())
            .unwrap_or_else(|| self.out_dir.clone());
        shell::status(
            "Running",
            format!("`{}/{}`", display_dir.display(), package_name),
        );

        let status = ProcessBuilder::new(self.out_dir.join(&package_name))
            .args(args)
            .status()?;
        Ok(status.code().unwrap_or(1))
    }
}

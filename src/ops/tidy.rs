//! `tidy`: run clang-tidy over the aggregated compilation database.

use std::time::Instant;

use anyhow::{bail, ensure, Context, Result};

use crate::builder::driver::{Builder, ScheduleOptions};
use crate::core::manifest::Manifest;
use crate::core::profile::BuildProfile;
use crate::util::process::{command_exists, ProcessBuilder};
use crate::util::{parallel, shell};

/// Options for one `tidy` invocation.
#[derive(Debug, Default)]
pub struct TidyOptions {
    /// Automatically apply lint suggestions.
    pub fix: bool,
}

/// Plan the dev and test profiles so the compilation database covers both
/// normal and test builds, then run `run-clang-tidy` against it.
pub fn tidy(options: &TidyOptions) -> Result<()> {
    if options.fix && parallel::is_parallel() {
        shell::warn("`--fix` implies `--jobs 1` to avoid race conditions");
        parallel::set_jobs(1);
    }

    let manifest = Manifest::load_from_cwd()?;
    let project_root = manifest.dir().to_path_buf();

    let mut compdb_root = None;
    let profiles = [BuildProfile::Dev, BuildProfile::Test];
    for (index, profile) in profiles.into_iter().enumerate() {
        let mut builder = Builder::new(project_root.clone(), profile);
        builder.schedule(ScheduleOptions {
            include_dev_deps: profile == BuildProfile::Test,
            suppress_analysis_log: index > 0,
            suppress_finish_log: true,
            ..Default::default()
        })?;
        compdb_root = Some(builder.compdb_root());
    }
    let compdb_root = compdb_root.context("no build directory was planned")?;

    let run_clang_tidy =
        std::env::var("CABIN_TIDY").unwrap_or_else(|_| "run-clang-tidy".to_string());
    ensure!(command_exists(&run_clang_tidy), "run-clang-tidy is required");

    // macOS ships run-clang-tidy behind xcrun.
    let mut cmd = if command_exists("xcrun") {
        ProcessBuilder::new("xcrun").arg(&run_clang_tidy)
    } else {
        ProcessBuilder::new(&run_clang_tidy)
    };
    cmd = cmd.arg("-p").arg(&compdb_root);
    cmd = cmd.arg(format!("-j{}", parallel::jobs()));
    if options.fix {
        cmd = cmd.arg("-fix");
    }
    cmd = cmd.cwd(&project_root);

    let start = Instant::now();
    let status = cmd.status()?;
    if !status.success() {
        bail!("run-clang-tidy exited with {:?}", status.code());
    }
    shell::status(
        "Finished",
        format!("run-clang-tidy in {:.2}s", start.elapsed().as_secs_f64()),
    );
    Ok(())
}

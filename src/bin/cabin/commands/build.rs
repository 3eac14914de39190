//! `cabin build`

use anyhow::{Context, Result};

use cabin::builder::driver::{Builder, ScheduleOptions};
use cabin::core::manifest::Manifest;
use cabin::core::profile::BuildProfile;
use cabin::util::fs::relative_from;
use cabin::util::{parallel, shell};

use crate::cli::BuildArgs;

pub fn execute(args: BuildArgs) -> Result<i32> {
    if let Some(jobs) = args.jobs {
        parallel::set_jobs(jobs);
    }
    let profile = if args.release {
        BuildProfile::Release
    } else {
        BuildProfile::Dev
    };

    let cwd = std::env::current_dir().context("failed to get current directory")?;
    let manifest_path = Manifest::find(&cwd)?;
    let project_root = manifest_path
        .parent()
        .context("manifest has no parent directory")?
        .to_path_buf();

    let mut builder = Builder::new(project_root.clone(), profile);
    builder.schedule(ScheduleOptions::default())?;

    if args.compdb {
        let compdb_root = builder.compdb_root();
        let display = relative_from(&compdb_root, &project_root).unwrap_or(compdb_root);
        shell::status(
            "Generated",
            format!("{}/compile_commands.json", display.display()),
        );
        return Ok(0);
    }

    builder.build()?;
    Ok(0)
}

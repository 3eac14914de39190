//! `cabin run`

use anyhow::{Context, Result};

use cabin::builder::driver::{Builder, ScheduleOptions};
use cabin::core::manifest::Manifest;
use cabin::core::profile::BuildProfile;
use cabin::util::parallel;

use crate::cli::RunArgs;

pub fn execute(args: RunArgs) -> Result<i32> {
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

    let mut builder = Builder::new(project_root, profile);
    builder.schedule(ScheduleOptions::default())?;
    builder.run(&args.args)
}

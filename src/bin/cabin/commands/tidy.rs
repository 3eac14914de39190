//! `cabin tidy`

use anyhow::Result;

use cabin::ops::tidy::{self, TidyOptions};
use cabin::util::parallel;

use crate::cli::TidyArgs;

pub fn execute(args: TidyArgs) -> Result<i32> {
    if let Some(jobs) = args.jobs {
        parallel::set_jobs(jobs);
    }
    tidy::tidy(&TidyOptions { fix: args.fix })?;
    Ok(0)
}

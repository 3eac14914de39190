//! `cabin fmt`

use anyhow::Result;

use cabin::ops::fmt::{self, FmtOptions};

use crate::cli::FmtArgs;

pub fn execute(args: FmtArgs) -> Result<i32> {
    fmt::fmt(&FmtOptions {
        check: args.check,
        excludes: args.exclude,
        no_ignore_vcs: args.no_ignore_vcs,
    })?;
    Ok(0)
}

//! `cabin clean`

use anyhow::Result;

use cabin::ops::clean;

use crate::cli::CleanArgs;

pub fn execute(args: CleanArgs) -> Result<i32> {
    clean::clean(args.profile.as_deref())?;
    Ok(0)
}

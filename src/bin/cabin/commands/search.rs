//! `cabin search`

use anyhow::Result;

use cabin::ops::search;

use crate::cli::SearchArgs;

pub fn execute(args: SearchArgs) -> Result<i32> {
    search::search(&args.query)?;
    Ok(0)
}

//! `cabin remove`

use anyhow::Result;

use cabin::ops::edit;

use crate::cli::RemoveArgs;

pub fn execute(args: RemoveArgs) -> Result<i32> {
    edit::remove_dependencies(&args.deps)?;
    Ok(0)
}

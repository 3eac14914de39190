//! `cabin new`

use anyhow::Result;

use cabin::ops::scaffold;

use crate::cli::NewArgs;

pub fn execute(args: NewArgs) -> Result<i32> {
    let is_bin = !args.lib;
    scaffold::new_project(is_bin, &args.name)?;
    Ok(0)
}

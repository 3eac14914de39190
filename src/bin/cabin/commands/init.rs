//! `cabin init`

use anyhow::Result;

use cabin::ops::scaffold;

use crate::cli::InitArgs;

pub fn execute(args: InitArgs) -> Result<i32> {
    let is_bin = !args.lib;
    scaffold::init_project(is_bin)?;
    Ok(0)
}

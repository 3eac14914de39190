//! `cabin add`

use anyhow::Result;

use cabin::ops::edit::{self, AddSpec};

use crate::cli::AddArgs;

pub fn execute(args: AddArgs) -> Result<i32> {
    let git_target = args
        .rev
        .map(|rev| ("rev".to_string(), rev))
        .or_else(|| args.tag.map(|tag| ("tag".to_string(), tag)))
        .or_else(|| args.branch.map(|branch| ("branch".to_string(), branch)));

    let spec = AddSpec {
        path: args.path,
        git: args.git,
        git_target,
        version: args.version,
    };
    edit::validate_add_spec(&spec)?;
    edit::add_dependencies(&args.deps, &spec)?;
    Ok(0)
}

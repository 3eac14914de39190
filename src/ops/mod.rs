//! Project-level operations behind the CLI subcommands.

pub mod clean;
pub mod edit;
pub mod fmt;
pub mod scaffold;
pub mod search;
pub mod tidy;

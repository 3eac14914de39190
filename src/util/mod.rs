//! Shared utilities: shell output, subprocess handling, filesystem helpers,
//! and the process-wide parallelism setting.

pub mod fs;
pub mod parallel;
pub mod process;
pub mod shell;

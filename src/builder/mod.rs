//! The planner: from a manifest and a profile to an executed ninja plan.

pub mod compdb;
pub mod driver;
pub mod graph;
pub mod layout;
pub mod opts;
pub mod plan;
pub mod project;
pub mod toolchain;

pub use driver::{Builder, ScheduleOptions};
pub use graph::{BuildGraph, TestKind, TestTarget};
pub use opts::CompilerOpts;
pub use toolchain::Compiler;

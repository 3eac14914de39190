//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

/// cabin - A package manager and build system for C++
#[derive(Parser)]
#[command(name = "cabin")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Use verbose output (-vv very verbose)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Do not print cabin log messages
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, global = true, value_name = "WHEN")]
    pub color: Option<String>,

    /// List all subcommands
    #[arg(long, hide = true)]
    pub list: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile a local package and all of its dependencies
    #[command(visible_alias = "b")]
    Build(BuildArgs),

    /// Build and execute src/main.cc
    #[command(visible_alias = "r")]
    Run(RunArgs),

    /// Run the tests of a local package
    #[command(visible_alias = "t")]
    Test(TestArgs),

    /// Remove the built directory
    Clean(CleanArgs),

    /// Create a new cabin project
    New(NewArgs),

    /// Create a new cabin package in an existing directory
    Init(InitArgs),

    /// Add dependencies to cabin.toml
    Add(AddArgs),

    /// Remove dependencies from cabin.toml
    Remove(RemoveArgs),

    /// Format codes using clang-format
    Fmt(FmtArgs),

    /// Execute run-clang-tidy
    Tidy(TidyArgs),

    /// Search for system packages
    Search(SearchArgs),

    /// Show version information
    Version,
}

#[derive(Args)]
pub struct BuildArgs {
    /// Build artifacts in release mode, with optimizations
    #[arg(short, long)]
    pub release: bool,

    /// Generate compilation database instead of building
    #[arg(long)]
    pub compdb: bool,

    /// Set the number of jobs to run in parallel
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,
}

#[derive(Args)]
pub struct RunArgs {
    /// Build artifacts in release mode, with optimizations
    #[arg(short, long)]
    pub release: bool,

    /// Set the number of jobs to run in parallel
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Arguments passed to the program
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Args)]
pub struct TestArgs {
    /// Only run tests whose executor target contains this string
    pub name: Option<String>,

    /// Set the number of jobs to run in parallel
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Enable code coverage analysis
    #[arg(long)]
    pub coverage: bool,
}

#[derive(Args)]
pub struct CleanArgs {
    /// Clean artifacts of the specified profile (dev or release)
    #[arg(short, long, value_name = "PROFILE")]
    pub profile: Option<String>,
}

#[derive(Args)]
pub struct NewArgs {
    /// Package name
    pub name: String,

    /// Use a binary (application) template (default)
    #[arg(short, long)]
    pub bin: bool,

    /// Use a library template
    #[arg(short, long, conflicts_with = "bin")]
    pub lib: bool,
}

#[derive(Args)]
pub struct InitArgs {
    /// Use a binary (application) template (default)
    #[arg(short, long)]
    pub bin: bool,

    /// Use a library template
    #[arg(short, long, conflicts_with = "bin")]
    pub lib: bool,
}

#[derive(Args)]
pub struct AddArgs {
    /// Dependencies to add
    #[arg(required = true)]
    pub deps: Vec<String>,

    /// Add as a path dependency
    #[arg(long, value_name = "PATH")]
    pub path: Option<String>,

    /// Add as a git dependency
    #[arg(long, value_name = "URL")]
    pub git: Option<String>,

    /// Git revision to use
    #[arg(long, value_name = "REV")]
    pub rev: Option<String>,

    /// Git tag to use
    #[arg(long, value_name = "TAG", conflicts_with = "rev")]
    pub tag: Option<String>,

    /// Git branch to use
    #[arg(long, value_name = "BRANCH", conflicts_with_all = ["rev", "tag"])]
    pub branch: Option<String>,

    /// Version requirement for a system dependency
    #[arg(long, value_name = "REQ")]
    pub version: Option<String>,
}

#[derive(Args)]
pub struct RemoveArgs {
    /// Dependencies to remove
    #[arg(required = true)]
    pub deps: Vec<String>,
}

#[derive(Args)]
pub struct FmtArgs {
    /// Run clang-format in check mode
    #[arg(long)]
    pub check: bool,

    /// Exclude files from formatting
    #[arg(long, value_name = "FILE")]
    pub exclude: Vec<PathBuf>,

    /// Do not exclude git-ignored files from formatting
    #[arg(long)]
    pub no_ignore_vcs: bool,
}

#[derive(Args)]
pub struct TidyArgs {
    /// Automatically apply lint suggestions
    #[arg(long)]
    pub fix: bool,

    /// Set the number of jobs to run in parallel
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Query string
    pub query: String,
}

//! cabin CLI entry point.

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use cabin::util::shell::{self, Verbosity};

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else {
        match cli.verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::VeryVerbose,
        }
    };
    let color_flag = cli.color.as_deref().map(|value| {
        value.parse::<shell::ColorChoice>().unwrap_or_else(|err| {
            eprintln!("Error: {}", err);
            std::process::exit(1);
        })
    });
    shell::init(verbosity, shell::resolve_color(color_flag));

    let filter = match verbosity {
        Verbosity::VeryVerbose => EnvFilter::new("cabin=trace"),
        Verbosity::Verbose => EnvFilter::new("cabin=debug"),
        _ => EnvFilter::from_default_env(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            shell::error(format!("{:#}", err));
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    if cli.list {
        print_subcommand_list();
        return Ok(0);
    }

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(0);
    };

    match command {
        Commands::Build(args) => commands::build::execute(args),
        Commands::Run(args) => commands::run::execute(args),
        Commands::Test(args) => commands::test::execute(args),
        Commands::Clean(args) => commands::clean::execute(args),
        Commands::New(args) => commands::new::execute(args),
        Commands::Init(args) => commands::init::execute(args),
        Commands::Add(args) => commands::add::execute(args),
        Commands::Remove(args) => commands::remove::execute(args),
        Commands::Fmt(args) => commands::fmt::execute(args),
        Commands::Tidy(args) => commands::tidy::execute(args),
        Commands::Search(args) => commands::search::execute(args),
        Commands::Version => {
            println!("cabin {}", env!("CARGO_PKG_VERSION"));
            Ok(0)
        }
    }
}

fn print_subcommand_list() {
    for subcommand in Cli::command().get_subcommands() {
        println!("{}", subcommand.get_name());
    }
}

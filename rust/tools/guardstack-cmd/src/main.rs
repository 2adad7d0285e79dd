use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "guardstack-cmd")]
#[command(about = "Drives a self-verifying guarded stack and reports integrity errors")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Push a range of integers, then pop them all back
    Run(commands::run::RunArgs),

    /// Push the given values and print the diagnostic dump
    Dump(commands::dump::DumpArgs),
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let result = {
        let mut stdout = std::io::stdout().lock();
        match cli.command {
            Commands::Run(args) => commands::run::run(&args, &mut stdout),
            Commands::Dump(args) => commands::dump::run(&args, &mut stdout),
        }
    };
    commands::report(result)
}

/// Routes the library's `log` records to stderr, filtered by `RUST_LOG`
/// (default `warn`).
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

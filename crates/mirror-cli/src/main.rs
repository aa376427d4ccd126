//! dirmirror CLI
//!
//! Mirrors a directory into a backup tree, records every change with its
//! character diff in a SQLite change log, and runs configured commands
//! after each change.

mod cli;
mod commands;
mod error;
mod logging;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use error::Result;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("{}: failed to initialize logging: {}", "warning".yellow().bold(), e);
    }
    tracing::debug!(config = %cli.config.display(), database = %cli.database.display(), "starting");

    let backup = cli.backup.as_deref();
    match cli.command {
        None => commands::run_watch(&cli.config, &cli.database, backup, cli.max_in_flight).await,
        Some(Commands::InitOnly { verify }) => commands::run_init_only(&cli.config, backup, verify),
        Some(Commands::Log { limit, json }) => commands::run_log(&cli.database, limit, json).await,
    }
}

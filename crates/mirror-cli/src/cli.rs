//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// dirmirror - Keep a live backup mirror of a directory and log every change
#[derive(Parser, Debug)]
#[command(name = "dirmirror")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration document listing the watched path (YAML, JSON or TOML)
    #[arg(short, long, env = "DIRMIRROR_CONFIG", default_value = "config.yml", global = true)]
    pub config: PathBuf,

    /// SQLite database holding the change log
    #[arg(short, long, env = "DIRMIRROR_DATABASE", default_value = "dirmirror.db", global = true)]
    pub database: PathBuf,

    /// Backup root, overriding the configured one
    #[arg(short, long, global = true)]
    pub backup: Option<PathBuf>,

    /// Maximum number of concurrent mirror updates while watching
    #[arg(long, default_value_t = mirror_core::dispatch::DEFAULT_MAX_IN_FLIGHT, global = true)]
    pub max_in_flight: usize,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run; watches the configured path when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Build the backup mirror and exit without watching
    InitOnly {
        /// Compare source and mirror byte for byte afterwards
        #[arg(long)]
        verify: bool,
    },

    /// Show the most recent change-log entries
    Log {
        /// Number of entries to show
        #[arg(default_value_t = 20)]
        limit: usize,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}

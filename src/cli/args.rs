//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Use this config file
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Only log warnings and errors

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// mapsync - Keep per-branch search index mappings in sync with a git repository
#[derive(Parser, Debug)]
#[command(name = "mapsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: ./mapsync.toml, then the user config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true, conflicts_with = "quiet")]
    pub debug: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one reconciliation pass over every selected branch
    #[command(
        name = "update",
        long_about = "Run one reconciliation pass over every selected branch.\n\n\
            For each branch, the mapping committed at the branch tip is compared with \
            the mapping of the branch's active search index. When they differ, the next \
            index generation is created with the committed mapping.\n\n\
            Exits non-zero if any branch failed.",
        after_help = "\
EXAMPLES:
    # Reconcile every branch
    mapsync update

    # Skip the lookup cache and print a machine-readable report
    mapsync update --force-refresh --json"
    )]
    Update {
        /// Bypass the mapping lookup cache
        #[arg(long)]
        force_refresh: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Reconcile every time the trigger file changes
    #[command(
        name = "watch",
        long_about = "Reconcile every time the trigger file changes.\n\n\
            Watches the trigger file and runs a force-refresh update for every burst \
            of changes to it, plus one at startup. Native file system events are used \
            unless a poll interval is given. Runs until interrupted."
    )]
    Watch {
        /// Trigger file to watch (overrides [watch].trigger)
        #[arg(long, value_name = "PATH")]
        trigger: Option<PathBuf>,

        /// Poll every MS milliseconds instead of using native events
        /// (overrides [watch].poll_interval_ms)
        #[arg(long, value_name = "MS")]
        poll_ms: Option<u64>,
    },

    /// List the branches an update would reconcile
    Branches,
}

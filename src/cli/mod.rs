//! cli
//!
//! Command-line interface layer for mapsync.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install the tracing subscriber
//! - Load configuration and build the reconciler from it
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to the
//! [`crate::engine`] for reconciliation. The library never reads the
//! environment or config files itself; everything it needs is built here.

pub mod args;
pub mod commands;

pub use args::Cli;

use std::path::PathBuf;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Options shared by every command.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Explicit config file, if given
    pub config: Option<PathBuf>,
    /// Debug logging requested
    pub debug: bool,
    /// Minimal output requested
    pub quiet: bool,
}

impl Context {
    /// Default log filter for these flags when `RUST_LOG` is unset.
    pub fn default_log_filter(&self) -> &'static str {
        if self.debug {
            "mapsync=debug,info"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let ctx = Context {
        config: cli.config.clone(),
        debug: cli.debug,
        quiet: cli.quiet,
    };
    init_logging(&ctx);

    commands::dispatch(cli.command, &ctx)
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the flags. Logs go to stderr so stdout stays
/// reserved for reports.
fn init_logging(ctx: &Context) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(ctx.default_log_filter()));

    // A subscriber may already be installed when embedded; keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(ctx.debug)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_filter_follows_flags() {
        let mut ctx = Context::default();
        assert_eq!(ctx.default_log_filter(), "info");

        ctx.quiet = true;
        assert_eq!(ctx.default_log_filter(), "warn");

        ctx.debug = true;
        assert_eq!(ctx.default_log_filter(), "mapsync=debug,info");
    }
}

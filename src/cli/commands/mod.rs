//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Loads the configuration
//! 2. Builds the reconciler from it
//! 3. Runs it and displays the result
//!
//! # Async Commands
//!
//! The reconciler is async. Each handler is a synchronous wrapper that
//! builds a tokio runtime and blocks on the async implementation.

mod branches;
mod update;
mod watch;

pub use branches::branches;
pub use update::update;
pub use watch::{watch, TriggerWatcher};

use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::cli::args::Command;
use crate::cli::Context;
use crate::core::config::Config;
use crate::engine::{BranchSelector, Indexer, IndexerOptions};
use crate::search::{CachedSearchEngine, ElasticsearchClient, SearchEngine};

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Update {
            force_refresh,
            json,
        } => update::update(ctx, force_refresh, json),
        Command::Watch { trigger, poll_ms } => watch::watch(ctx, trigger, poll_ms),
        Command::Branches => branches::branches(ctx),
    }
}

/// Load the configuration named by `--config`, or the first one found.
fn load_config(ctx: &Context) -> Result<Config> {
    Config::load(ctx.config.as_deref()).context("failed to load configuration")
}

/// Build the reconciler described by `config`.
///
/// The lookup cache is only put in front of Elasticsearch when
/// `search.cache_ttl_secs` is set.
pub fn build_indexer(config: &Config) -> Result<Indexer> {
    let client = ElasticsearchClient::with_timeout(config.search_url(), config.call_timeout())
        .context("failed to build search engine client")?;
    let engine: Arc<dyn SearchEngine> = match config.cache_ttl() {
        Some(ttl) => Arc::new(CachedSearchEngine::new(client, ttl)),
        None => Arc::new(client),
    };

    let selector =
        BranchSelector::from_config(config.branches()).context("invalid branch pattern")?;
    let options = IndexerOptions {
        mapping_path: config.mapping_path().to_string(),
        call_timeout: Some(config.call_timeout()),
    };

    Ok(Indexer::new(config.repo_path(), engine, options).with_selector(selector))
}

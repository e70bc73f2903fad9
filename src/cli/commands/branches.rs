//! branches command - list the branches an update would reconcile
//!
//! Applies the `[branches]` include/exclude patterns and prints one branch
//! per line, sorted.

use anyhow::{Context as _, Result};

use super::{build_indexer, load_config};
use crate::cli::Context;

/// Run the branches command.
pub fn branches(ctx: &Context) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(branches_async(ctx))
}

async fn branches_async(ctx: &Context) -> Result<()> {
    let config = load_config(ctx)?;
    let indexer = build_indexer(&config)?;

    let branches = indexer
        .list_branches()
        .await
        .context("failed to list branches")?;
    for branch in branches {
        println!("{}", branch);
    }
    Ok(())
}

//! update command - one reconciliation pass
//!
//! # Output
//!
//! One line per branch on stdout (`master: created master_1`), or the whole
//! report as JSON with `--json`. Exits non-zero when any branch failed; the
//! report is still printed first.
//!
//! # Example
//!
//! ```bash
//! mapsync update
//! mapsync update --force-refresh --json
//! ```

use anyhow::{bail, Context as _, Result};
use tracing::info;

use super::{build_indexer, load_config};
use crate::cli::Context;
use crate::engine::{UpdateOptions, UpdateReport};

/// Run the update command.
///
/// This is a synchronous wrapper that uses tokio to run the async implementation.
pub fn update(ctx: &Context, force_refresh: bool, json: bool) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(update_async(ctx, force_refresh))?;

    print_report(&report, json)?;

    let failed = report.failed().count();
    if failed > 0 {
        bail!(
            "{} of {} branches failed to reconcile",
            failed,
            report.outcomes.len()
        );
    }
    Ok(())
}

async fn update_async(ctx: &Context, force_refresh: bool) -> Result<UpdateReport> {
    let config = load_config(ctx)?;
    let indexer = build_indexer(&config)?;

    let report = indexer
        .update(UpdateOptions { force_refresh })
        .await
        .context("update failed")?;
    info!(
        branches = report.outcomes.len(),
        created = report.created().count(),
        failed = report.failed().count(),
        "update complete"
    );
    Ok(report)
}

fn print_report(report: &UpdateReport, json: bool) -> Result<()> {
    if json {
        let rendered = serde_json::to_string_pretty(report).context("failed to render report")?;
        println!("{}", rendered);
    } else {
        print!("{}", report);
    }
    Ok(())
}

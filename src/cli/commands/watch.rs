//! watch command - reconcile whenever the trigger file changes
//!
//! The build pipeline signals "the repository changed" by writing a trigger
//! file. This command watches the trigger's directory with `notify` and runs
//! a force-refresh update for every burst of events that touches the
//! trigger. A pass also runs at startup.
//!
//! Native file system events are used unless a poll interval is configured,
//! in which case notify's poll watcher rescans the directory on every tick.
//!
//! A failing pass is logged and the loop keeps going; only Ctrl-C stops it.
//!
//! # Example
//!
//! ```bash
//! mapsync watch --trigger /tmp/mapsync/trigger
//! mapsync watch --trigger /mnt/shared/trigger --poll-ms 250
//! ```

use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context as _, Result};
use notify::{
    Config as NotifyConfig, Event, EventKind, PollWatcher, RecommendedWatcher, RecursiveMode,
    Watcher,
};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::{build_indexer, load_config};
use crate::cli::Context;
use crate::engine::{Indexer, UpdateOptions};

/// Events closer together than this collapse into one change.
pub const DEBOUNCE: Duration = Duration::from_millis(100);

/// Turns notify events about a trigger file into change notifications.
///
/// The trigger's directory is watched rather than the file, so the trigger
/// may be created, replaced, or removed freely.
pub struct TriggerWatcher {
    path: PathBuf,
    events: mpsc::UnboundedReceiver<notify::Result<Event>>,
    // Dropping the watcher stops the event stream.
    _watcher: Box<dyn Watcher + Send>,
}

impl std::fmt::Debug for TriggerWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerWatcher")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl TriggerWatcher {
    /// Start watching `path`.
    ///
    /// With `poll_interval` set, notify's [`PollWatcher`] is used instead of
    /// the platform's native events. The trigger's directory is created if
    /// missing.
    ///
    /// # Errors
    ///
    /// Fails when the directory cannot be created or watched.
    pub fn new(path: impl AsRef<Path>, poll_interval: Option<Duration>) -> Result<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .ok_or_else(|| anyhow!("trigger path '{}' has no file name", path.display()))?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)
            .with_context(|| format!("cannot create trigger directory '{}'", dir.display()))?;
        // Events carry the watched directory's path, so compare against its
        // canonical form.
        let dir = dir
            .canonicalize()
            .with_context(|| format!("cannot resolve trigger directory '{}'", dir.display()))?;

        let (tx, events) = mpsc::unbounded_channel();
        let handler = move |result: notify::Result<Event>| {
            if tx.send(result).is_err() {
                error!("trigger event receiver dropped");
            }
        };
        let mut watcher: Box<dyn Watcher + Send> = match poll_interval {
            Some(interval) => Box::new(PollWatcher::new(
                handler,
                NotifyConfig::default()
                    .with_poll_interval(interval)
                    .with_compare_contents(true),
            )?),
            None => Box::new(RecommendedWatcher::new(handler, NotifyConfig::default())?),
        };
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("cannot watch '{}'", dir.display()))?;

        Ok(Self {
            path: dir.join(file_name),
            events,
            _watcher: watcher,
        })
    }

    /// The watched trigger path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for the next change of the trigger file.
    ///
    /// Every event that arrives within [`DEBOUNCE`] of the first one is part
    /// of the same change. Returns `false` once the event stream has ended.
    pub async fn changed(&mut self) -> bool {
        loop {
            match self.events.recv().await {
                None => return false,
                Some(Ok(event)) if self.concerns_trigger(&event) => break,
                Some(Ok(event)) => debug!(kind = ?event.kind, paths = ?event.paths, "ignoring event"),
                Some(Err(e)) => warn!(trigger = %self.path.display(), error = %e, "trigger watch error"),
            }
        }

        let burst_end = Instant::now() + DEBOUNCE;
        while let Ok(Some(_)) = tokio::time::timeout_at(burst_end, self.events.recv()).await {}
        true
    }

    fn concerns_trigger(&self, event: &Event) -> bool {
        if matches!(event.kind, EventKind::Access(_)) {
            return false;
        }
        event.need_rescan() || event.paths.iter().any(|p| p == &self.path)
    }
}

/// Run the watch command.
///
/// This is a synchronous wrapper that uses tokio to run the async implementation.
pub fn watch(ctx: &Context, trigger: Option<PathBuf>, poll_ms: Option<u64>) -> Result<()> {
    let config = load_config(ctx)?;
    let trigger = trigger.or_else(|| config.trigger()).ok_or_else(|| {
        anyhow!("no trigger file configured; pass --trigger or set [watch].trigger")
    })?;
    let poll_interval = poll_ms.map(Duration::from_millis).or_else(|| config.poll_interval());
    if poll_interval.is_some_and(|interval| interval.is_zero()) {
        return Err(anyhow!("poll interval must be greater than zero"));
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let indexer = build_indexer(&config)?;
        let watcher = TriggerWatcher::new(&trigger, poll_interval)?;
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        };
        watch_async(&indexer, watcher, shutdown).await.map(|_| ())
    })
}

/// Run a pass now and one more per trigger change until `shutdown` resolves.
///
/// Returns the number of passes run.
async fn watch_async<S>(indexer: &Indexer, mut watcher: TriggerWatcher, shutdown: S) -> Result<usize>
where
    S: Future<Output = ()>,
{
    info!(trigger = %watcher.path().display(), "watching trigger file");
    tokio::pin!(shutdown);

    run_pass(indexer).await;
    let mut passes = 1;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!(passes, "interrupted, stopping");
                return Ok(passes);
            }
            changed = watcher.changed() => {
                if !changed {
                    return Err(anyhow!("trigger watcher stopped"));
                }
                debug!("trigger changed, running update");
                run_pass(indexer).await;
                passes += 1;
            }
        }
    }
}

async fn run_pass(indexer: &Indexer) {
    match indexer
        .update(UpdateOptions {
            force_refresh: true,
        })
        .await
    {
        Ok(report) => info!(
            branches = report.outcomes.len(),
            created = report.created().count(),
            failed = report.failed().count(),
            "update complete"
        ),
        Err(e) => warn!(error = %e, "update failed"),
    }
}

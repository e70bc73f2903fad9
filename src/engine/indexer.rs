//! engine::indexer
//!
//! The reconciler: brings every selected branch's index mapping in line with
//! the mapping committed on that branch.
//!
//! # Lifecycle
//!
//! ```text
//! open repo (once) -> list branches -> per branch, concurrently:
//!     lookup actual ┐
//!                   ├─ compare ─> unchanged | create next generation
//!     read desired  ┘
//! ```
//!
//! # Invariants
//!
//! - The repository is opened at most once per `Indexer`, lazily, behind a
//!   single-initialization guard. A failed open is retried on the next call.
//! - Every branch runs in its own task and every task is joined. One branch's
//!   failure, including a panic, never cancels or hides another's outcome.
//! - Creation only happens after both reads complete and compare unequal.
//! - Every search engine call is bounded by the configured timeout.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info, info_span, warn, Instrument};

use super::branches::BranchSelector;
use super::desired::get_desired_mapping;
use super::outcome::{BranchError, BranchOutcome, UpdateReport};
use crate::core::config::{DEFAULT_MAPPING_PATH, DEFAULT_TIMEOUT_SECS};
use crate::core::naming;
use crate::core::schema::ActualMapping;
use crate::core::types::{BranchName, IndexName, TypeError};
use crate::git::{GitError, RepoHandle};
use crate::search::{LookupOptions, SearchEngine, SearchEngineError};

/// Errors that abort a whole `update()` call.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// The repository could not be opened.
    #[error("cannot open repository at {path}: {source}")]
    RepoOpen {
        /// Configured repository path
        path: PathBuf,
        /// The underlying failure
        source: GitError,
    },

    /// Branches could not be enumerated.
    #[error("cannot list branches: {0}")]
    ListBranches(#[source] GitError),
}

/// Construction options for an [`Indexer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexerOptions {
    /// Path of the mapping file inside each branch tip tree.
    pub mapping_path: String,
    /// Upper bound for each search engine call; `None` waits forever.
    pub call_timeout: Option<Duration>,
}

impl Default for IndexerOptions {
    fn default() -> Self {
        Self {
            mapping_path: DEFAULT_MAPPING_PATH.to_string(),
            call_timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        }
    }
}

/// Options for one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Bypass any lookup cache in front of the search engine.
    pub force_refresh: bool,
}

/// The reconciler.
///
/// Owns the lazily opened repository handle and the shared search engine.
/// Cheap to call repeatedly; each [`update`](Indexer::update) is a full pass.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use mapsync::engine::{Indexer, IndexerOptions, UpdateOptions};
/// use mapsync::search::ElasticsearchClient;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = Arc::new(ElasticsearchClient::new("http://localhost:9200"));
/// let indexer = Indexer::new("/srv/content.git", engine, IndexerOptions::default());
///
/// let report = indexer.update(UpdateOptions::default()).await?;
/// print!("{}", report);
/// # Ok(())
/// # }
/// ```
pub struct Indexer {
    repo_path: PathBuf,
    repo: OnceCell<RepoHandle>,
    engine: Arc<dyn SearchEngine>,
    selector: BranchSelector,
    options: IndexerOptions,
}

impl std::fmt::Debug for Indexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Indexer")
            .field("repo_path", &self.repo_path)
            .field("engine", &self.engine.name())
            .field("selector", &self.selector)
            .field("options", &self.options)
            .finish()
    }
}

impl Indexer {
    /// Create a reconciler for the repository at `repo_path`.
    ///
    /// Nothing is opened until the first call that needs the repository.
    pub fn new(
        repo_path: impl Into<PathBuf>,
        engine: Arc<dyn SearchEngine>,
        options: IndexerOptions,
    ) -> Self {
        Self {
            repo_path: repo_path.into(),
            repo: OnceCell::new(),
            engine,
            selector: BranchSelector::all(),
            options,
        }
    }

    /// Only reconcile branches accepted by `selector`.
    pub fn with_selector(mut self, selector: BranchSelector) -> Self {
        self.selector = selector;
        self
    }

    /// The configured options.
    pub fn options(&self) -> &IndexerOptions {
        &self.options
    }

    /// The branches a pass would reconcile, sorted.
    pub async fn list_branches(&self) -> Result<Vec<BranchName>, IndexerError> {
        let repo = self.repo().await?;
        self.selector
            .list(&repo)
            .await
            .map_err(IndexerError::ListBranches)
    }

    /// Run one reconciliation pass over every selected branch.
    ///
    /// # Errors
    ///
    /// Fails only when the repository cannot be opened or its branches cannot
    /// be listed. Per-branch failures are reported in the returned
    /// [`UpdateReport`].
    pub async fn update(&self, options: UpdateOptions) -> Result<UpdateReport, IndexerError> {
        let repo = self.repo().await?;
        let all = repo
            .list_branches()
            .await
            .map_err(IndexerError::ListBranches)?;
        let branches = self.selector.select(&all);
        debug!(count = branches.len(), "reconciling branches");

        let lookup = LookupOptions {
            force_refresh: options.force_refresh,
        };

        let tasks: Vec<_> = branches
            .into_iter()
            .map(|branch| {
                let bare_name_owner =
                    naming::claimed_by(branch.as_str(), all.iter().map(BranchName::as_str))
                        .map(str::to_string);
                let task = BranchTask {
                    repo: repo.clone(),
                    bare_name_owner,
                    engine: Arc::clone(&self.engine),
                    mapping_path: self.options.mapping_path.clone(),
                    call_timeout: self.options.call_timeout,
                    lookup,
                };
                let span = info_span!("branch", branch = %branch);
                let handle = tokio::spawn(task.run(branch.clone()).instrument(span));
                (branch, handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(tasks.len());
        for (branch, handle) in tasks {
            let result = match handle.await {
                Ok(result) => result,
                Err(join_err) => Err(BranchError::Task(join_err.to_string())),
            };
            let outcome = match result {
                Ok(None) => BranchOutcome::Unchanged { branch },
                Ok(Some(index)) => BranchOutcome::Created { branch, index },
                Err(error) => {
                    warn!(branch = %branch, kind = %error.kind(), error = %error, "branch reconciliation failed");
                    BranchOutcome::Failed { branch, error }
                }
            };
            outcomes.push(outcome);
        }

        Ok(UpdateReport::new(outcomes))
    }

    async fn repo(&self) -> Result<RepoHandle, IndexerError> {
        self.repo
            .get_or_try_init(|| async {
                debug!(path = %self.repo_path.display(), "opening repository");
                RepoHandle::open(self.repo_path.clone()).await
            })
            .await
            .cloned()
            .map_err(|source| IndexerError::RepoOpen {
                path: self.repo_path.clone(),
                source,
            })
    }
}

/// Everything one branch task owns.
struct BranchTask {
    repo: RepoHandle,
    /// Sibling branch whose generations include this branch's bare name.
    bare_name_owner: Option<String>,
    engine: Arc<dyn SearchEngine>,
    mapping_path: String,
    call_timeout: Option<Duration>,
    lookup: LookupOptions,
}

impl BranchTask {
    /// Reconcile one branch: `Ok(None)` when current, `Ok(Some(index))` when
    /// a new index was created.
    async fn run(self, branch: BranchName) -> Result<Option<IndexName>, BranchError> {
        let lookup = IndexName::for_branch(&branch).map_err(invalid_index_name)?;

        let (actual, desired) = tokio::join!(
            bounded(
                self.call_timeout,
                "get_current_mapping",
                self.engine.get_current_mapping(&lookup, self.lookup),
            ),
            get_desired_mapping(&self.repo, &branch, &self.mapping_path),
        );
        let desired = desired?;
        let mut actual = actual?;

        if let Some(owner) = &self.bare_name_owner {
            let own_generation = actual
                .index()
                .and_then(|index| naming::generation_of(lookup.as_str(), index))
                .is_some_and(|generation| generation > 0);
            if actual.index().is_some() && !own_generation {
                debug!(
                    branch = %branch,
                    index = actual.index().unwrap_or_default(),
                    owner = %owner,
                    "active index belongs to another branch"
                );
                actual = ActualMapping::Absent;
            }
        }

        if actual.matches(&desired) {
            info!(branch = %branch, index = actual.index().unwrap_or_default(), "mapping already current");
            return Ok(None);
        }

        let active = actual
            .index()
            .and_then(|index| naming::generation_of(lookup.as_str(), index));
        let index = naming::generation_index(&lookup, naming::next_generation(active))
            .map_err(invalid_index_name)?;
        info!(
            branch = %branch,
            active = actual.index().unwrap_or("none"),
            index = %index,
            "mapping needs update"
        );

        bounded(
            self.call_timeout,
            "create_index",
            self.engine.create_index(&index, &desired),
        )
        .await?;

        Ok(Some(index))
    }
}

async fn bounded<T, F>(
    limit: Option<Duration>,
    operation: &'static str,
    call: F,
) -> Result<T, SearchEngineError>
where
    F: Future<Output = Result<T, SearchEngineError>>,
{
    match limit {
        None => call.await,
        Some(after) => tokio::time::timeout(after, call)
            .await
            .map_err(|_| SearchEngineError::Timeout { operation, after })?,
    }
}

fn invalid_index_name(err: TypeError) -> SearchEngineError {
    match err {
        TypeError::InvalidIndexName(reason) => SearchEngineError::InvalidIndexName(reason),
        other => SearchEngineError::InvalidIndexName(other.to_string()),
    }
}

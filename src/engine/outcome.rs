//! engine::outcome
//!
//! Per-branch results of a reconciliation pass.
//!
//! # Error Taxonomy
//!
//! | Kind               | Cause                                              |
//! |--------------------|----------------------------------------------------|
//! | `RepoRead`         | A listed branch's ref, commit or tree won't resolve |
//! | `MalformedMapping` | The mapping file is not a JSON object              |
//! | `SearchEngine`     | Network, API status, name collision, timeout       |
//! | `Task`             | The branch task itself panicked                    |
//!
//! Every kind is scoped to one branch. Failing to open the repository or to
//! list branches is an [`IndexerError`](super::IndexerError) instead.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::core::schema::MappingError;
use crate::core::types::{BranchName, IndexName};
use crate::git::GitError;
use crate::search::SearchEngineError;

/// Why a single branch could not be reconciled.
#[derive(Debug, Error)]
pub enum BranchError {
    /// The branch could not be read from the repository.
    #[error("repository read failed: {0}")]
    RepoRead(#[from] GitError),

    /// The mapping file exists but is not a valid mapping.
    #[error("malformed {path}: {source}")]
    MalformedMapping {
        /// Path of the mapping file in the tip tree
        path: String,
        /// The parse failure
        source: MappingError,
    },

    /// The search engine call failed.
    #[error("search engine: {0}")]
    SearchEngine(#[from] SearchEngineError),

    /// The branch task panicked or was cancelled.
    #[error("branch task failed: {0}")]
    Task(String),
}

impl BranchError {
    /// The taxonomy bucket of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BranchError::RepoRead(_) => ErrorKind::RepoRead,
            BranchError::MalformedMapping { .. } => ErrorKind::MalformedMapping,
            BranchError::SearchEngine(_) => ErrorKind::SearchEngine,
            BranchError::Task(_) => ErrorKind::Task,
        }
    }
}

/// Coarse classification of a [`BranchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    RepoRead,
    MalformedMapping,
    SearchEngine,
    Task,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::RepoRead => "repo-read",
            ErrorKind::MalformedMapping => "malformed-mapping",
            ErrorKind::SearchEngine => "search-engine",
            ErrorKind::Task => "task",
        };
        f.write_str(name)
    }
}

/// What happened to one branch.
#[derive(Debug)]
pub enum BranchOutcome {
    /// The active index already has the desired mapping.
    Unchanged { branch: BranchName },
    /// A new index was created with the desired mapping.
    Created { branch: BranchName, index: IndexName },
    /// Reconciliation failed for this branch only.
    Failed {
        branch: BranchName,
        error: BranchError,
    },
}

impl BranchOutcome {
    /// The branch this outcome belongs to.
    pub fn branch(&self) -> &BranchName {
        match self {
            BranchOutcome::Unchanged { branch }
            | BranchOutcome::Created { branch, .. }
            | BranchOutcome::Failed { branch, .. } => branch,
        }
    }

    /// Whether this branch failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, BranchOutcome::Failed { .. })
    }

    /// The error kind, if this branch failed.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            BranchOutcome::Failed { error, .. } => Some(error.kind()),
            _ => None,
        }
    }
}

impl std::fmt::Display for BranchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BranchOutcome::Unchanged { branch } => write!(f, "{}: unchanged", branch),
            BranchOutcome::Created { branch, index } => {
                write!(f, "{}: created {}", branch, index)
            }
            BranchOutcome::Failed { branch, error } => {
                write!(f, "{}: failed ({}): {}", branch, error.kind(), error)
            }
        }
    }
}

impl Serialize for BranchOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("BranchOutcome", 4)?;
        s.serialize_field("branch", self.branch())?;
        match self {
            BranchOutcome::Unchanged { .. } => {
                s.serialize_field("status", "unchanged")?;
                s.skip_field("index")?;
                s.skip_field("error")?;
            }
            BranchOutcome::Created { index, .. } => {
                s.serialize_field("status", "created")?;
                s.serialize_field("index", index)?;
                s.skip_field("error")?;
            }
            BranchOutcome::Failed { error, .. } => {
                s.serialize_field("status", "failed")?;
                s.skip_field("index")?;
                s.serialize_field(
                    "error",
                    &ErrorReport {
                        kind: error.kind(),
                        message: error.to_string(),
                    },
                )?;
            }
        }
        s.end()
    }
}

#[derive(Serialize)]
struct ErrorReport {
    kind: ErrorKind,
    message: String,
}

/// All branch outcomes of one `update()` call.
#[derive(Debug, Default, Serialize)]
pub struct UpdateReport {
    /// One entry per reconciled branch, sorted by branch name
    pub outcomes: Vec<BranchOutcome>,
}

impl UpdateReport {
    /// Build a report, sorting outcomes by branch name.
    pub fn new(mut outcomes: Vec<BranchOutcome>) -> Self {
        outcomes.sort_by(|a, b| a.branch().cmp(b.branch()));
        Self { outcomes }
    }

    /// Outcome for a specific branch.
    pub fn get(&self, branch: &str) -> Option<&BranchOutcome> {
        self.outcomes.iter().find(|o| o.branch().as_str() == branch)
    }

    /// Branches whose mapping was already current.
    pub fn unchanged(&self) -> impl Iterator<Item = &BranchName> {
        self.outcomes.iter().filter_map(|o| match o {
            BranchOutcome::Unchanged { branch } => Some(branch),
            _ => None,
        })
    }

    /// Branches that got a new index, with the index name.
    pub fn created(&self) -> impl Iterator<Item = (&BranchName, &IndexName)> {
        self.outcomes.iter().filter_map(|o| match o {
            BranchOutcome::Created { branch, index } => Some((branch, index)),
            _ => None,
        })
    }

    /// Branches that failed, with the error.
    pub fn failed(&self) -> impl Iterator<Item = (&BranchName, &BranchError)> {
        self.outcomes.iter().filter_map(|o| match o {
            BranchOutcome::Failed { branch, error } => Some((branch, error)),
            _ => None,
        })
    }

    /// Whether any branch failed.
    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(BranchOutcome::is_failed)
    }
}

impl std::fmt::Display for UpdateReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.outcomes.is_empty() {
            return writeln!(f, "no branches");
        }
        for outcome in &self.outcomes {
            writeln!(f, "{}", outcome)?;
        }
        Ok(())
    }
}

//! engine
//!
//! Mapping reconciliation across branches.
//!
//! # Architecture
//!
//! The engine ties the repository accessor ([`crate::git`]) to the search
//! engine client ([`crate::search`]):
//!
//! 1. **Select**: [`BranchSelector`] decides which branches take part
//! 2. **Read**: [`desired`] parses each branch's committed mapping
//! 3. **Reconcile**: [`Indexer`] compares it with the engine's active index
//!    and creates the next generation on drift
//! 4. **Report**: every branch ends as one [`BranchOutcome`] in an
//!    [`UpdateReport`]
//!
//! # Invariants
//!
//! - Branch-scoped errors never escape a branch task
//! - Only opening the repository or listing branches fails `update()`
//! - An absent index never equals an empty mapping
//!
//! # Example
//!
//! ```ignore
//! use mapsync::engine::{BranchSelector, Indexer, IndexerOptions, UpdateOptions};
//!
//! let indexer = Indexer::new(repo_path, engine, IndexerOptions::default())
//!     .with_selector(BranchSelector::new(&[], &["wip/*".into()])?);
//!
//! let report = indexer.update(UpdateOptions { force_refresh: true }).await?;
//! if report.has_failures() {
//!     eprint!("{}", report);
//! }
//! ```

pub mod branches;
pub mod desired;
pub mod indexer;
pub mod outcome;

pub use branches::BranchSelector;
pub use indexer::{Indexer, IndexerError, IndexerOptions, UpdateOptions};
pub use outcome::{BranchError, BranchOutcome, ErrorKind, UpdateReport};

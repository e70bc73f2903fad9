//! mapsync - Per-branch search index mapping reconciliation
//!
//! A git repository carries a mapping file on every branch. Each branch is an
//! environment with its own search index. mapsync compares the mapping
//! committed at each branch tip with the mapping of that branch's index, and
//! creates a new index generation when they drift apart.
//!
//! # Architecture
//!
//! The codebase follows a layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Branch selection, desired-schema reading, reconciliation
//! - [`core`] - Domain types, schema equality, index naming, configuration
//! - [`git`] - Single interface for all repository reads
//! - [`search`] - Abstraction over the search engine admin API (Elasticsearch)
//!
//! # Correctness Invariants
//!
//! mapsync maintains the following invariants:
//!
//! 1. Indices are only ever created, never deleted or modified in place
//! 2. An absent index never compares equal to an empty mapping
//! 3. One branch's failure never hides or prevents another branch's outcome
//! 4. The repository is opened at most once per reconciler and only read

pub mod cli;
pub mod core;
pub mod engine;
pub mod git;
pub mod search;

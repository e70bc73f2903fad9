//! search::traits
//!
//! SearchEngine trait definition for the search engine's admin API.
//!
//! # Design
//!
//! The `SearchEngine` trait is async because every operation is a network
//! call. All methods return `Result` so a failing engine only fails the
//! branch being reconciled.
//!
//! "No index" is a value ([`ActualMapping::Absent`]), never an error.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::schema::{ActualMapping, Schema};
use crate::core::types::IndexName;

/// Errors from search engine operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SearchEngineError {
    /// An index with that exact name already exists.
    #[error("index already exists: {index}")]
    IndexExists {
        /// The index that could not be created
        index: String,
    },

    /// The name cannot be used as an index name.
    #[error("invalid index name: {0}")]
    InvalidIndexName(String),

    /// API returned an error status.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error reason from the engine
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The engine answered with something we cannot interpret.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The call did not complete in time.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// The operation that timed out
        operation: &'static str,
        /// The timeout that elapsed
        after: Duration,
    },
}

/// Options for a mapping lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookupOptions {
    /// Bypass any read cache between mapsync and the engine.
    pub force_refresh: bool,
}

/// The SearchEngine trait for the index administration API.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: one engine is shared by every
/// concurrent branch task.
///
/// # Lookup
///
/// `get_current_mapping` addresses the bare lookup name (an index or an
/// alias) together with its generation indices (`<lookup>_<n>`), and reports
/// the mapping of the active one (see [`crate::core::naming`]).
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Get the engine name (e.g., "elasticsearch", "mock").
    fn name(&self) -> &'static str;

    /// Fetch the mapping currently enforced for `lookup`.
    ///
    /// # Returns
    ///
    /// - `Ok(ActualMapping::Absent)` if no index exists for the name
    /// - `Ok(ActualMapping::Present { .. })` with the active index otherwise
    async fn get_current_mapping(
        &self,
        lookup: &IndexName,
        options: LookupOptions,
    ) -> Result<ActualMapping, SearchEngineError>;

    /// Create a new index with `mapping` as its schema.
    ///
    /// Fails with [`SearchEngineError::IndexExists`] if the name is taken;
    /// existence is not pre-checked.
    async fn create_index(
        &self,
        index: &IndexName,
        mapping: &Schema,
    ) -> Result<(), SearchEngineError>;
}

//! search
//!
//! Abstraction over the search engine's index administration API.
//!
//! # Architecture
//!
//! The `SearchEngine` trait defines the two calls reconciliation needs:
//! fetch the current mapping for a branch, and create an index. The
//! reconciler only ever sees `Arc<dyn SearchEngine>`.
//!
//! # Modules
//!
//! - `traits`: Core `SearchEngine` trait, options and error types
//! - [`elasticsearch`]: Elasticsearch REST implementation
//! - [`cache`]: Lookup cache decorator honoring `force_refresh`
//! - [`mock`]: In-memory implementation for deterministic testing
//!
//! # Example
//!
//! ```ignore
//! use mapsync::search::{CachedSearchEngine, ElasticsearchClient, SearchEngine};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let es = ElasticsearchClient::with_timeout("http://localhost:9200", Duration::from_secs(30))?;
//! let engine: Arc<dyn SearchEngine> =
//!     Arc::new(CachedSearchEngine::new(es, Duration::from_secs(60)));
//! ```

pub mod cache;
pub mod elasticsearch;
pub mod mock;
mod traits;

pub use cache::CachedSearchEngine;
pub use elasticsearch::ElasticsearchClient;
pub use traits::*;

//! search::mock
//!
//! Mock search engine for deterministic testing.
//!
//! # Design
//!
//! Indices live in memory. Lookups resolve generations exactly the way the
//! Elasticsearch client does, creation enforces name uniqueness, and every
//! call is recorded. Failures and delays can be injected per name.
//!
//! # Example
//!
//! ```
//! use mapsync::core::schema::Schema;
//! use mapsync::core::types::IndexName;
//! use mapsync::search::mock::MockSearchEngine;
//! use mapsync::search::{LookupOptions, SearchEngine};
//!
//! # tokio_test::block_on(async {
//! let engine = MockSearchEngine::new();
//! let master = IndexName::new("master").unwrap();
//!
//! let current = engine.get_current_mapping(&master, LookupOptions::default()).await.unwrap();
//! assert_eq!(current.index(), None);
//!
//! engine
//!     .create_index(&IndexName::new("master_1").unwrap(), &Schema::empty())
//!     .await
//!     .unwrap();
//!
//! let current = engine.get_current_mapping(&master, LookupOptions::default()).await.unwrap();
//! assert_eq!(current.index(), Some("master_1"));
//! # });
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::traits::{LookupOptions, SearchEngine, SearchEngineError};
use crate::core::naming;
use crate::core::schema::{ActualMapping, Schema};
use crate::core::types::IndexName;

/// Mock search engine for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockSearchEngine {
    inner: Arc<Mutex<MockSearchEngineInner>>,
}

#[derive(Debug, Default)]
struct MockSearchEngineInner {
    /// Existing indices by concrete name.
    indices: HashMap<String, Schema>,
    /// Lookup failures by lookup name.
    lookup_failures: HashMap<String, SearchEngineError>,
    /// Creation failures by index name.
    create_failures: HashMap<String, SearchEngineError>,
    /// Artificial lookup latency by lookup name.
    lookup_delays: HashMap<String, Duration>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq)]
pub enum MockOperation {
    GetCurrentMapping { lookup: String, force_refresh: bool },
    CreateIndex { index: String, mapping: Schema },
}

impl MockSearchEngine {
    /// Create an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockSearchEngineInner> {
        // A panic while holding the lock only happens inside a failing test.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add an existing index with the given mapping.
    ///
    /// # Panics
    ///
    /// Panics if `mapping` is not a JSON object.
    pub fn with_index(self, name: &str, mapping: Value) -> Self {
        let schema = Schema::from_value(mapping).expect("mock mapping must be a JSON object");
        self.state().indices.insert(name.to_string(), schema);
        self
    }

    /// Fail lookups of `lookup` with `error`.
    pub fn fail_lookup(self, lookup: &str, error: SearchEngineError) -> Self {
        self.state()
            .lookup_failures
            .insert(lookup.to_string(), error);
        self
    }

    /// Fail creation of `index` with `error`.
    pub fn fail_create(self, index: &str, error: SearchEngineError) -> Self {
        self.state().create_failures.insert(index.to_string(), error);
        self
    }

    /// Delay lookups of `lookup` by `delay`.
    pub fn delay_lookup(self, lookup: &str, delay: Duration) -> Self {
        self.state().lookup_delays.insert(lookup.to_string(), delay);
        self
    }

    /// All recorded operations, in call order.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.state().operations.clone()
    }

    /// Recorded `create_index` calls as `(index, mapping)` pairs.
    pub fn created(&self) -> Vec<(String, Schema)> {
        self.state()
            .operations
            .iter()
            .filter_map(|op| match op {
                MockOperation::CreateIndex { index, mapping } => {
                    Some((index.clone(), mapping.clone()))
                }
                _ => None,
            })
            .collect()
    }

    /// Mapping of an existing index.
    pub fn index(&self, name: &str) -> Option<Schema> {
        self.state().indices.get(name).cloned()
    }

    /// Names of all existing indices, sorted.
    pub fn index_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state().indices.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl SearchEngine for MockSearchEngine {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn get_current_mapping(
        &self,
        lookup: &IndexName,
        options: LookupOptions,
    ) -> Result<ActualMapping, SearchEngineError> {
        let delay = {
            let mut state = self.state();
            state.operations.push(MockOperation::GetCurrentMapping {
                lookup: lookup.to_string(),
                force_refresh: options.force_refresh,
            });
            state.lookup_delays.get(lookup.as_str()).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state();
        if let Some(err) = state.lookup_failures.get(lookup.as_str()) {
            return Err(err.clone());
        }

        let active = naming::active_index(lookup.as_str(), state.indices.keys().map(String::as_str));
        Ok(match active {
            Some((index, _)) => ActualMapping::Present {
                index: index.to_string(),
                mapping: state.indices[index].clone(),
            },
            None => ActualMapping::Absent,
        })
    }

    async fn create_index(
        &self,
        index: &IndexName,
        mapping: &Schema,
    ) -> Result<(), SearchEngineError> {
        let mut state = self.state();
        state.operations.push(MockOperation::CreateIndex {
            index: index.to_string(),
            mapping: mapping.clone(),
        });

        if let Some(err) = state.create_failures.get(index.as_str()) {
            return Err(err.clone());
        }
        if state.indices.contains_key(index.as_str()) {
            return Err(SearchEngineError::IndexExists {
                index: index.to_string(),
            });
        }

        state.indices.insert(index.to_string(), mapping.clone());
        Ok(())
    }
}

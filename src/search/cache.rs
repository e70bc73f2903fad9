//! search::cache
//!
//! Read cache for mapping lookups.
//!
//! # Design
//!
//! [`CachedSearchEngine`] decorates any [`SearchEngine`]. Successful lookups
//! are kept per lookup name for a fixed TTL; errors are never cached.
//!
//! - `LookupOptions { force_refresh: true }` skips the cache and stores the
//!   fresh answer.
//! - A successful `create_index` drops the entry of the lookup name the new
//!   index is a generation of, so the next pass sees it.
//!
//! The entry map is behind a synchronous mutex that is never held across an
//! `.await`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;

use super::traits::{LookupOptions, SearchEngine, SearchEngineError};
use crate::core::naming;
use crate::core::schema::{ActualMapping, Schema};
use crate::core::types::IndexName;

#[derive(Debug, Clone)]
struct CacheEntry {
    mapping: ActualMapping,
    fetched_at: Instant,
}

/// Caching decorator for a search engine.
#[derive(Debug)]
pub struct CachedSearchEngine<E> {
    inner: E,
    ttl: Duration,
    entries: Mutex<HashMap<IndexName, CacheEntry>>,
}

impl<E: SearchEngine> CachedSearchEngine<E> {
    /// Wrap `inner`, keeping lookups for `ttl`.
    pub fn new(inner: E, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Borrow the wrapped engine.
    pub fn inner(&self) -> &E {
        &self.inner
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    fn cached(&self, lookup: &IndexName) -> Option<ActualMapping> {
        let entries = self.entries.lock().ok()?;
        entries
            .get(lookup)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.mapping.clone())
    }

    fn store(&self, lookup: &IndexName, mapping: &ActualMapping) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                lookup.clone(),
                CacheEntry {
                    mapping: mapping.clone(),
                    fetched_at: Instant::now(),
                },
            );
        }
    }

    fn invalidate_for(&self, index: &IndexName) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|lookup, _| naming::generation_of(lookup.as_str(), index.as_str()).is_none());
        }
    }
}

#[async_trait]
impl<E: SearchEngine> SearchEngine for CachedSearchEngine<E> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn get_current_mapping(
        &self,
        lookup: &IndexName,
        options: LookupOptions,
    ) -> Result<ActualMapping, SearchEngineError> {
        if !options.force_refresh {
            if let Some(hit) = self.cached(lookup) {
                debug!(lookup = %lookup, "mapping cache hit");
                return Ok(hit);
            }
        }

        let mapping = self.inner.get_current_mapping(lookup, options).await?;
        self.store(lookup, &mapping);
        Ok(mapping)
    }

    async fn create_index(
        &self,
        index: &IndexName,
        mapping: &Schema,
    ) -> Result<(), SearchEngineError> {
        self.inner.create_index(index, mapping).await?;
        self.invalidate_for(index);
        Ok(())
    }
}

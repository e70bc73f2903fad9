//! search::elasticsearch
//!
//! Elasticsearch implementation of the `SearchEngine` trait over its REST API.
//!
//! # Endpoints
//!
//! - Mapping lookup:
//!   `GET /{lookup},{lookup}_*/_mapping?ignore_unavailable=true&allow_no_indices=true`.
//!   The response is keyed by concrete index name:
//!   `{ "master_2": { "mappings": { ... } } }`. A 404 (older clusters, or a
//!   lookup name that resolves to nothing) means no index.
//! - Index creation: `PUT /{index}` with body `{ "mappings": <schema> }`.
//!   `resource_already_exists_exception` maps to
//!   [`SearchEngineError::IndexExists`].
//!
//! # Retries
//!
//! None. A failed call fails the branch; the caller re-runs the pass.
//!
//! # Example
//!
//! ```ignore
//! use mapsync::search::{ElasticsearchClient, LookupOptions, SearchEngine};
//! use mapsync::core::types::IndexName;
//! use std::time::Duration;
//!
//! let es = ElasticsearchClient::with_timeout("http://localhost:9200", Duration::from_secs(30))?;
//! let current = es
//!     .get_current_mapping(&IndexName::new("master")?, LookupOptions::default())
//!     .await?;
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::traits::{LookupOptions, SearchEngine, SearchEngineError};
use crate::core::naming::{self, GENERATION_SEPARATOR};
use crate::core::schema::{ActualMapping, Schema};
use crate::core::types::IndexName;

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = concat!("mapsync/", env!("CARGO_PKG_VERSION"));

/// Elasticsearch admin client.
#[derive(Debug, Clone)]
pub struct ElasticsearchClient {
    /// HTTP client for making requests
    client: Client,
    /// Base URL without a trailing slash
    base_url: String,
}

impl ElasticsearchClient {
    /// Create a client with reqwest's default settings.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Create a client whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `SearchEngineError::NetworkError` if the HTTP client cannot be
    /// built (e.g., TLS backend initialization failure).
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SearchEngineError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT_VALUE)
            .build()
            .map_err(|e| SearchEngineError::NetworkError(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create a client around an existing `reqwest::Client`.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Turn a non-success response into a typed error.
    async fn error_from_response(response: Response, index: &str) -> SearchEngineError {
        let status = response.status();
        let body = response.json::<EsErrorResponse>().await.ok();
        let (kind, reason) = match body.map(|b| b.error) {
            Some(EsError::Detailed { kind, reason }) => (kind, reason),
            Some(EsError::Plain(reason)) => (None, Some(reason)),
            None => (None, None),
        };
        let message = reason.unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        });

        match kind.as_deref() {
            Some("resource_already_exists_exception") => SearchEngineError::IndexExists {
                index: index.to_string(),
            },
            Some("invalid_index_name_exception") => SearchEngineError::InvalidIndexName(message),
            _ if status.is_server_error() => SearchEngineError::ApiError {
                status: status.as_u16(),
                message: format!("search engine server error: {}", message),
            },
            _ => SearchEngineError::ApiError {
                status: status.as_u16(),
                message,
            },
        }
    }
}

/// Pick the active index out of a mapping response.
///
/// Generation indices win by number. Failing that, a key outside the
/// `<lookup>_` wildcard can only have come from the bare lookup name (the
/// index itself, or the target of an alias), so it counts as generation 0.
fn select_active<'a>(lookup: &str, indices: &'a BTreeMap<String, EsIndexMapping>) -> Option<&'a str> {
    let keys = || indices.keys().map(String::as_str);
    let wildcard_prefix = format!("{}{}", lookup, GENERATION_SEPARATOR);

    naming::active_index(lookup, keys())
        .map(|(name, _)| name)
        .or_else(|| keys().find(|name| !name.starts_with(&wildcard_prefix)))
}

#[async_trait]
impl SearchEngine for ElasticsearchClient {
    fn name(&self) -> &'static str {
        "elasticsearch"
    }

    async fn get_current_mapping(
        &self,
        lookup: &IndexName,
        _options: LookupOptions,
    ) -> Result<ActualMapping, SearchEngineError> {
        let url = self.url(&format!(
            "{lookup},{lookup}{GENERATION_SEPARATOR}*/_mapping",
            lookup = lookup
        ));
        debug!(%url, "fetching mapping");

        let response = self
            .client
            .get(&url)
            .query(&[("ignore_unavailable", "true"), ("allow_no_indices", "true")])
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| SearchEngineError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(ActualMapping::Absent);
        }
        if !status.is_success() {
            return Err(Self::error_from_response(response, lookup.as_str()).await);
        }

        let indices: BTreeMap<String, EsIndexMapping> = response
            .json()
            .await
            .map_err(|e| SearchEngineError::MalformedResponse(e.to_string()))?;

        let Some(index) = select_active(lookup.as_str(), &indices) else {
            return Ok(ActualMapping::Absent);
        };
        let mapping = Schema::from_value(indices[index].mappings.clone()).map_err(|e| {
            SearchEngineError::MalformedResponse(format!("mappings of {}: {}", index, e))
        })?;

        Ok(ActualMapping::Present {
            index: index.to_string(),
            mapping,
        })
    }

    async fn create_index(
        &self,
        index: &IndexName,
        mapping: &Schema,
    ) -> Result<(), SearchEngineError> {
        let url = self.url(index.as_str());
        debug!(%url, "creating index");

        let response = self
            .client
            .put(&url)
            .header(ACCEPT, "application/json")
            .json(&CreateIndexBody { mappings: mapping })
            .send()
            .await
            .map_err(|e| SearchEngineError::NetworkError(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_from_response(response, index.as_str()).await)
        }
    }
}

// =============================================================================
// Elasticsearch API types
// =============================================================================

/// Body of `PUT /{index}`.
#[derive(Debug, Serialize)]
struct CreateIndexBody<'a> {
    mappings: &'a Schema,
}

/// One entry of a `_mapping` response.
#[derive(Debug, Deserialize)]
struct EsIndexMapping {
    #[serde(default = "empty_object")]
    mappings: Value,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

#[derive(Debug, Deserialize)]
struct EsErrorResponse {
    error: EsError,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EsError {
    Detailed {
        #[serde(rename = "type")]
        kind: Option<String>,
        reason: Option<String>,
    },
    Plain(String),
}

//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Example
//!
//! ```toml
//! repo_path = "/srv/content.git"
//! mapping_path = "mapping.json"
//!
//! [search]
//! url = "http://localhost:9200"
//! timeout_secs = 30
//! cache_ttl_secs = 0
//!
//! [branches]
//! include = ["*"]
//! exclude = ["wip/*"]
//!
//! [watch]
//! trigger = "/tmp/mapsync/trigger"
//! poll_interval_ms = 500
//! ```
//!
//! # Validation
//!
//! Values are validated after parsing so that a bad URL or glob is reported
//! at startup rather than on the first reconciliation pass.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Default mapping file path, relative to the branch tip tree root.
pub const DEFAULT_MAPPING_PATH: &str = "mapping.json";

/// Default per-call search engine timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Top-level configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Path to the content repository
    pub repo_path: PathBuf,

    /// Mapping file path inside each branch tip
    #[serde(default)]
    pub mapping_path: Option<String>,

    /// Search engine connection
    pub search: SearchConfig,

    /// Branch selection
    #[serde(default)]
    pub branches: BranchesConfig,

    /// Trigger watching
    #[serde(default)]
    pub watch: WatchConfig,
}

impl FileConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.repo_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue(
                "repo_path cannot be empty".into(),
            ));
        }

        if let Some(path) = &self.mapping_path {
            if path.is_empty() || path.starts_with('/') || path.ends_with('/') {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid mapping_path '{}', must be a relative file path",
                    path
                )));
            }
        }

        self.search.validate()?;
        self.branches.validate()?;
        self.watch.validate()?;

        Ok(())
    }
}

/// Search engine connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    /// Base URL of the search engine, e.g. `http://localhost:9200`
    pub url: String,

    /// Per-call timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Mapping lookup cache TTL in seconds (0 or unset disables the cache)
    #[serde(default)]
    pub cache_ttl_secs: Option<u64>,
}

impl SearchConfig {
    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.url).map_err(|e| {
            ConfigError::InvalidValue(format!("invalid search.url '{}': {}", self.url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue(format!(
                "invalid search.url '{}', scheme must be http or https",
                self.url
            )));
        }

        if self.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "search.timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}

/// Branch selection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BranchesConfig {
    /// Glob patterns of branches to reconcile (empty means all)
    pub include: Vec<String>,

    /// Glob patterns of branches to skip; wins over `include`
    pub exclude: Vec<String>,
}

impl BranchesConfig {
    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for pattern in self.include.iter().chain(&self.exclude) {
            globset::Glob::new(pattern).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid branch pattern '{}': {}", pattern, e))
            })?;
        }
        Ok(())
    }
}

/// Trigger watching settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    /// File whose changes trigger a reconciliation pass
    pub trigger: Option<PathBuf>,

    /// Poll the trigger every this many milliseconds instead of relying on
    /// native file system events
    pub poll_interval_ms: Option<u64>,
}

impl WatchConfig {
    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == Some(0) {
            return Err(ConfigError::InvalidValue(
                "watch.poll_interval_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Poll interval, if polling was requested.
    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval_ms.map(Duration::from_millis)
    }
}

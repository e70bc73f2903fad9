//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! The reconciler itself takes plain construction inputs (a repository path,
//! a search engine client). This module turns a TOML file into those inputs
//! for the `mapsync` binary.
//!
//! # Locations
//!
//! Searched in order:
//! 1. The path given with `--config`
//! 2. `./mapsync.toml`
//! 3. `$XDG_CONFIG_HOME/mapsync/config.toml` (platform config dir)
//!
//! A missing config file is an error: there is no sensible default for the
//! repository path or the search engine address.
//!
//! # Paths
//!
//! Relative `repo_path` and `watch.trigger` values are resolved against the
//! directory containing the config file.
//!
//! # Example
//!
//! ```no_run
//! use mapsync::core::config::Config;
//! use std::path::Path;
//!
//! let config = Config::load(Some(Path::new("/etc/mapsync.toml"))).unwrap();
//! println!("repository: {}", config.repo_path().display());
//! println!("search: {}", config.search_url());
//! ```

pub mod schema;

pub use schema::{BranchesConfig, FileConfig, SearchConfig, WatchConfig};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

pub use schema::{DEFAULT_MAPPING_PATH, DEFAULT_TIMEOUT_SECS};

/// File name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "mapsync.toml";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("no config file found (searched: {})", display_paths(.searched))]
    NotFound { searched: Vec<PathBuf> },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Loaded configuration with defaults and path resolution applied.
#[derive(Debug, Clone)]
pub struct Config {
    /// The parsed file contents
    pub file: FileConfig,
    /// Where the file was loaded from
    path: PathBuf,
}

impl Config {
    /// Locate, read, parse and validate the configuration.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::NotFound`] if no candidate file exists
    /// - [`ConfigError::ReadError`] / [`ConfigError::ParseError`] for unreadable files
    /// - [`ConfigError::InvalidValue`] if validation fails
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = Self::locate(explicit)?;
        Self::load_from(&path)
    }

    /// Read, parse and validate a specific config file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let file: FileConfig = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        file.validate()?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Find the config file to use.
    fn locate(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }

        let mut searched = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            searched.push(dir.join("mapsync/config.toml"));
        }

        if let Some(found) = searched.iter().find(|p| p.exists()) {
            return Ok(found.clone());
        }
        Err(ConfigError::NotFound { searched })
    }

    /// Path of the loaded config file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match self.path.parent() {
            Some(dir) => dir.join(path),
            None => path.to_path_buf(),
        }
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    /// Repository path, resolved against the config file's directory.
    pub fn repo_path(&self) -> PathBuf {
        self.resolve(&self.file.repo_path)
    }

    /// Mapping file path inside each branch tip.
    ///
    /// Defaults to `mapping.json`.
    pub fn mapping_path(&self) -> &str {
        self.file
            .mapping_path
            .as_deref()
            .unwrap_or(DEFAULT_MAPPING_PATH)
    }

    /// Search engine base URL.
    pub fn search_url(&self) -> &str {
        &self.file.search.url
    }

    /// Per-call search engine timeout.
    ///
    /// Defaults to 30 seconds.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.file.search.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Mapping lookup cache TTL, `None` when caching is disabled.
    pub fn cache_ttl(&self) -> Option<Duration> {
        match self.file.search.cache_ttl_secs {
            None | Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
        }
    }

    /// Branch selection patterns.
    pub fn branches(&self) -> &BranchesConfig {
        &self.file.branches
    }

    /// Trigger file, resolved against the config file's directory.
    pub fn trigger(&self) -> Option<PathBuf> {
        self.file.watch.trigger.as_deref().map(|p| self.resolve(p))
    }

    /// Trigger poll interval; `None` means native file system events.
    pub fn poll_interval(&self) -> Option<Duration> {
        self.file.watch.poll_interval()
    }
}

//! core::types
//!
//! Strong types for the two namespaces mapsync bridges.
//!
//! # Types
//!
//! - [`BranchName`] - Validated Git branch name
//! - [`IndexName`] - Validated search engine index (or alias) name
//!
//! # Validation
//!
//! These types enforce validity at construction time. A branch can exist in
//! the repository and still have no legal index name (for example
//! `feature/Search`), so converting between the two is fallible.
//!
//! # Examples
//!
//! ```
//! use mapsync::core::types::{BranchName, IndexName};
//!
//! let branch = BranchName::new("staging").unwrap();
//! let index = IndexName::for_branch(&branch).unwrap();
//! assert_eq!(index.as_str(), "staging");
//!
//! assert!(BranchName::new("invalid..name").is_err());
//! assert!(IndexName::new("Upper").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid index name: {0}")]
    InvalidIndexName(String),
}

/// A validated Git branch name.
///
/// Branch names must conform to Git's refname rules (see `git check-ref-format`):
/// - Cannot be empty
/// - Cannot start with `.` or `-`
/// - Cannot end with `.lock` or `/`
/// - Cannot contain `..`, `@{`, `//`, or ASCII control characters
/// - Cannot contain spaces, `~`, `^`, `:`, `\`, `?`, `*`, `[`
/// - Cannot be exactly `@`
///
/// # Example
///
/// ```
/// use mapsync::core::types::BranchName;
///
/// let name = BranchName::new("feature/my-branch").unwrap();
/// assert_eq!(name.as_str(), "feature/my-branch");
///
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new(".hidden").is_err());
/// assert!(BranchName::new("branch.lock").is_err());
/// assert!(BranchName::new("has space").is_err());
/// assert!(BranchName::new("@").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let invalid = |reason: &str| Err(TypeError::InvalidBranchName(reason.to_string()));

        if name.is_empty() {
            return invalid("branch name cannot be empty");
        }
        if name == "@" {
            return invalid("branch name cannot be '@' (reserved)");
        }
        if name.starts_with('.') || name.starts_with('-') {
            return invalid("branch name cannot start with '.' or '-'");
        }
        if name.ends_with(".lock") || name.ends_with('/') {
            return invalid("branch name cannot end with '.lock' or '/'");
        }
        for pattern in ["..", "@{", "//"] {
            if name.contains(pattern) {
                return Err(TypeError::InvalidBranchName(format!(
                    "branch name cannot contain '{pattern}'"
                )));
            }
        }

        const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
        if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
            return Err(TypeError::InvalidBranchName(format!(
                "branch name cannot contain '{c}'"
            )));
        }
        if name.chars().any(|c| c.is_ascii_control()) {
            return invalid("branch name cannot contain control characters");
        }

        for component in name.split('/').filter(|c| !c.is_empty()) {
            if component.starts_with('.') {
                return invalid("path component cannot start with '.'");
            }
            if component.ends_with(".lock") {
                return invalid("path component cannot end with '.lock'");
            }
        }

        Ok(())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated search engine index name.
///
/// Follows the Elasticsearch index naming rules:
/// - Cannot be empty, `.` or `..`
/// - Lowercase only
/// - At most 255 bytes
/// - Cannot contain `\`, `/`, `*`, `?`, `"`, `<`, `>`, `|`, `,`, `#`, `:` or space
/// - Cannot start with `-`, `_` or `+`
///
/// The same rules apply to alias names, so an `IndexName` is also used as
/// the lookup name for a branch.
///
/// # Example
///
/// ```
/// use mapsync::core::types::IndexName;
///
/// assert!(IndexName::new("master_1").is_ok());
/// assert!(IndexName::new("feature/x").is_err());
/// assert!(IndexName::new("_hidden").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IndexName(String);

impl IndexName {
    /// Maximum index name length in bytes.
    pub const MAX_LEN: usize = 255;

    /// Create a new validated index name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidIndexName` if the name breaks the engine's naming rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    /// The lookup name for a branch: the bare branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidIndexName` if the branch name is not a
    /// legal index name.
    pub fn for_branch(branch: &BranchName) -> Result<Self, TypeError> {
        Self::new(branch.as_str())
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let invalid = |reason: String| Err(TypeError::InvalidIndexName(reason));

        if name.is_empty() || name == "." || name == ".." {
            return invalid(format!("'{name}' is reserved"));
        }
        if name.len() > Self::MAX_LEN {
            return invalid(format!("'{name}' is longer than {} bytes", Self::MAX_LEN));
        }
        if name.starts_with(['-', '_', '+']) {
            return invalid(format!("'{name}' cannot start with '-', '_' or '+'"));
        }
        if name.chars().any(|c| c.is_uppercase()) {
            return invalid(format!("'{name}' must be lowercase"));
        }

        const INVALID_CHARS: [char; 12] =
            ['\\', '/', '*', '?', '"', '<', '>', '|', ',', '#', ':', ' '];
        if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
            return invalid(format!("'{name}' cannot contain '{c}'"));
        }

        Ok(())
    }

    /// Get the index name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for IndexName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<IndexName> for String {
    fn from(name: IndexName) -> Self {
        name.0
    }
}

impl AsRef<str> for IndexName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IndexName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

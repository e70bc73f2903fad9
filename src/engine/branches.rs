//! engine::branches
//!
//! Branch enumeration and selection.
//!
//! The repository accessor lists every local branch; [`BranchSelector`] is
//! the one place that decides which of them get reconciled. With no patterns
//! configured it selects everything.

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::core::config::BranchesConfig;
use crate::core::types::BranchName;
use crate::git::{GitError, RepoHandle};

/// Include/exclude filter over branch names.
///
/// Exclusion wins over inclusion. An empty include list includes everything.
///
/// # Example
///
/// ```
/// use mapsync::core::types::BranchName;
/// use mapsync::engine::BranchSelector;
///
/// let selector = BranchSelector::new(&[], &["wip/*".to_string()]).unwrap();
/// assert!(selector.is_selected(&BranchName::new("master").unwrap()));
/// assert!(!selector.is_selected(&BranchName::new("wip/search").unwrap()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct BranchSelector {
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl BranchSelector {
    /// Select every branch.
    pub fn all() -> Self {
        Self::default()
    }

    /// Build a selector from glob patterns.
    ///
    /// # Errors
    ///
    /// Returns the `globset` error for the first invalid pattern.
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, globset::Error> {
        Ok(Self {
            include: build_set(include)?,
            exclude: build_set(exclude)?,
        })
    }

    /// Build a selector from the `[branches]` config section.
    pub fn from_config(config: &BranchesConfig) -> Result<Self, globset::Error> {
        Self::new(&config.include, &config.exclude)
    }

    /// Whether `branch` should be reconciled.
    pub fn is_selected(&self, branch: &BranchName) -> bool {
        let name = branch.as_str();
        if self.exclude.as_ref().is_some_and(|set| set.is_match(name)) {
            return false;
        }
        self.include.as_ref().map_or(true, |set| set.is_match(name))
    }

    /// The branches in `branches` that pass the filter, sorted by name.
    pub fn select(&self, branches: &[BranchName]) -> Vec<BranchName> {
        let mut selected: Vec<BranchName> = branches
            .iter()
            .filter(|b| self.is_selected(b))
            .cloned()
            .collect();
        selected.sort();
        selected
    }

    /// List the repository's branches that pass the filter, sorted by name.
    pub async fn list(&self, repo: &RepoHandle) -> Result<Vec<BranchName>, GitError> {
        Ok(self.select(&repo.list_branches().await?))
    }
}

fn build_set(patterns: &[String]) -> Result<Option<GlobSet>, globset::Error> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    builder.build().map(Some)
}

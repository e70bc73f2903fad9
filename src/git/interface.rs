//! git::interface
//!
//! Git interface implementation using git2.
//!
//! This module provides the **single doorway** to the content repository.
//! All repository reads flow through this interface, which returns
//! structured results and normalizes errors into typed failure categories.
//!
//! # Architecture
//!
//! The `Git` struct is the only way to read the repository. No other module
//! should import `git2` directly. mapsync never writes to the repository.
//!
//! # Error Handling
//!
//! Git errors are categorized into typed variants:
//! - [`GitError::NotARepo`]: The configured path is not a repository
//! - [`GitError::BranchNotFound`]: A listed branch no longer resolves
//! - [`GitError::ObjectNotFound`]: A commit, tree or blob is missing
//! - [`GitError::Internal`]: Anything else libgit2 reports
//!
//! A missing file at a branch tip is **not** an error; it is `Ok(None)`.
//!
//! # Example
//!
//! ```ignore
//! use mapsync::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("/srv/content.git"))?;
//! for branch in git.list_branches()? {
//!     let entry = git.read_file_at_branch_tip(&branch, "mapping.json")?;
//!     println!("{}: {:?}", branch, entry.map(|e| e.kind()));
//! }
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::core::types::BranchName;

/// Git file mode of a symbolic link tree entry.
const FILEMODE_LINK: i32 = 0o120000;

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// The path is not a readable repository.
    #[error("not a git repository: {path}: {message}")]
    NotARepo {
        /// The path that was opened
        path: PathBuf,
        /// libgit2's description of the failure
        message: String,
    },

    /// A branch does not resolve to a reference.
    #[error("branch not found: {branch}")]
    BranchNotFound {
        /// The branch that was looked up
        branch: String,
    },

    /// Object not found in repository.
    #[error("object not found: {what}")]
    ObjectNotFound {
        /// Description of the missing object
        what: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with richer context.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => GitError::ObjectNotFound {
                what: context.to_string(),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }
}

/// What kind of tree entry sits at a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A regular (or executable) file
    File,
    /// A subdirectory
    Directory,
    /// A submodule (gitlink)
    Submodule,
    /// A symbolic link
    Symlink,
    /// Anything libgit2 cannot classify
    Unknown,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntryKind::File => "file",
            EntryKind::Directory => "directory",
            EntryKind::Submodule => "submodule",
            EntryKind::Symlink => "symlink",
            EntryKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// An entry found at a path in a branch tip tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TipEntry {
    /// A regular file and its contents.
    File(Vec<u8>),
    /// Something that is not a regular file.
    Other(EntryKind),
}

impl TipEntry {
    /// The kind of entry.
    pub fn kind(&self) -> EntryKind {
        match self {
            TipEntry::File(_) => EntryKind::File,
            TipEntry::Other(kind) => *kind,
        }
    }
}

/// The Git interface.
///
/// Wraps a `git2::Repository` opened at an explicit path. Bare repositories
/// are supported; mapsync only ever reads refs and objects.
pub struct Git {
    /// The underlying git2 repository
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    // =========================================================================
    // Repository Opening
    // =========================================================================

    /// Open the repository at exactly `path`.
    ///
    /// Unlike discovery, this does not walk up parent directories: the
    /// configured path must itself be a repository (bare or not).
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if the path is missing, unreadable, or not a repository
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::open(path).map_err(|e| GitError::NotARepo {
            path: path.to_path_buf(),
            message: e.message().to_string(),
        })?;
        debug!(path = %path.display(), bare = repo.is_bare(), "opened repository");

        Ok(Self { repo })
    }

    /// Path of the `.git` directory (or the bare repository itself).
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    // =========================================================================
    // Branch Enumeration
    // =========================================================================

    /// List all local branches.
    ///
    /// Names are short names (`refs/heads/` stripped). Branches whose names
    /// are not valid UTF-8 or fail validation cannot be reconciled; they are
    /// skipped with a warning. Order is whatever libgit2 yields.
    pub fn list_branches(&self) -> Result<Vec<BranchName>, GitError> {
        let branches = self
            .repo
            .branches(Some(git2::BranchType::Local))
            .map_err(|e| GitError::Internal {
                message: e.message().to_string(),
            })?;

        let mut names = Vec::new();
        for branch in branches {
            let (branch, _) = branch.map_err(|e| GitError::Internal {
                message: e.message().to_string(),
            })?;
            if let Some(name) = branch_name(branch.name_bytes().ok()) {
                names.push(name);
            }
        }

        Ok(names)
    }

    // =========================================================================
    // Tree Reads
    // =========================================================================

    /// Read the entry at `path` in the tip commit of `branch`.
    ///
    /// Returns `Ok(None)` when the tip tree has no such path. A regular file
    /// comes back with its contents; directories, submodules and symlinks
    /// come back as [`TipEntry::Other`] without reading anything.
    ///
    /// # Errors
    ///
    /// - [`GitError::BranchNotFound`] if the branch no longer exists
    /// - [`GitError::ObjectNotFound`] if the tip commit, tree, or blob is missing
    pub fn read_file_at_branch_tip(
        &self,
        branch: &BranchName,
        path: &str,
    ) -> Result<Option<TipEntry>, GitError> {
        let refname = format!("refs/heads/{}", branch);
        let local = self
            .repo
            .find_branch(branch.as_str(), git2::BranchType::Local)
            .map_err(|e| match e.code() {
                git2::ErrorCode::NotFound => GitError::BranchNotFound {
                    branch: branch.to_string(),
                },
                _ => GitError::from_git2(e, &refname),
            })?;

        let commit = local
            .get()
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, &format!("tip commit of {}", refname)))?;
        let tree = commit
            .tree()
            .map_err(|e| GitError::from_git2(e, &format!("tree of {}", commit.id())))?;

        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(GitError::from_git2(e, path)),
        };

        let kind = match entry.kind() {
            Some(git2::ObjectType::Blob) if entry.filemode() == FILEMODE_LINK => {
                EntryKind::Symlink
            }
            Some(git2::ObjectType::Blob) => EntryKind::File,
            Some(git2::ObjectType::Tree) => EntryKind::Directory,
            Some(git2::ObjectType::Commit) => EntryKind::Submodule,
            _ => EntryKind::Unknown,
        };
        if kind != EntryKind::File {
            return Ok(Some(TipEntry::Other(kind)));
        }

        let blob = self
            .repo
            .find_blob(entry.id())
            .map_err(|e| GitError::from_git2(e, &format!("blob {} at {}", entry.id(), path)))?;

        Ok(Some(TipEntry::File(blob.content().to_vec())))
    }
}

/// Validate a raw local branch name, warning about names that cannot be used.
fn branch_name(raw: Option<&[u8]>) -> Option<BranchName> {
    let Some(raw) = raw else {
        warn!("skipping branch whose name cannot be read");
        return None;
    };
    let Ok(name) = std::str::from_utf8(raw) else {
        warn!(branch = %String::from_utf8_lossy(raw), "skipping branch with non-UTF-8 name");
        return None;
    };
    match BranchName::new(name) {
        Ok(name) => Some(name),
        Err(e) => {
            warn!(branch = name, error = %e, "skipping branch with unusable name");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod git_error {
        use super::*;

        #[test]
        fn not_found_maps_to_object_not_found() {
            let err = git2::Error::new(
                git2::ErrorCode::NotFound,
                git2::ErrorClass::Odb,
                "object missing",
            );
            let mapped = GitError::from_git2(err, "tree of abc");
            assert!(matches!(mapped, GitError::ObjectNotFound { ref what } if what == "tree of abc"));
        }

        #[test]
        fn other_codes_map_to_internal() {
            let err = git2::Error::new(
                git2::ErrorCode::Locked,
                git2::ErrorClass::Reference,
                "locked",
            );
            let mapped = GitError::from_git2(err, "refs/heads/master");
            assert!(mapped.to_string().contains("refs/heads/master"));
            assert!(mapped.to_string().contains("locked"));
        }

        #[test]
        fn display_formatting() {
            let err = GitError::BranchNotFound {
                branch: "staging".to_string(),
            };
            assert_eq!(err.to_string(), "branch not found: staging");
        }
    }

    mod tip_entry {
        use super::*;

        #[test]
        fn kinds() {
            assert_eq!(TipEntry::File(vec![]).kind(), EntryKind::File);
            assert_eq!(
                TipEntry::Other(EntryKind::Directory).kind(),
                EntryKind::Directory
            );
        }

        #[test]
        fn kind_display() {
            assert_eq!(EntryKind::Submodule.to_string(), "submodule");
            assert_eq!(EntryKind::Symlink.to_string(), "symlink");
        }
    }

    mod branch_names {
        use super::*;
        use tracing_test::traced_test;

        #[test]
        fn valid_name_is_kept() {
            assert_eq!(
                branch_name(Some(b"release/2024".as_slice())),
                Some(BranchName::new("release/2024").unwrap())
            );
        }

        #[test]
        #[traced_test]
        fn non_utf8_name_is_skipped_with_warning() {
            assert_eq!(branch_name(Some(b"caf\xe9".as_slice())), None);
            assert!(logs_contain("WARN"));
            assert!(logs_contain("skipping branch with non-UTF-8 name"));
        }

        #[test]
        #[traced_test]
        fn invalid_name_is_skipped_with_warning() {
            assert_eq!(branch_name(Some(b"bad..name".as_slice())), None);
            assert!(logs_contain("skipping branch with unusable name"));
            assert!(logs_contain("bad..name"));
        }

        #[test]
        #[traced_test]
        fn unreadable_name_is_skipped_with_warning() {
            assert_eq!(branch_name(None), None);
            assert!(logs_contain("skipping branch whose name cannot be read"));
        }
    }

    #[test]
    fn open_missing_path_is_not_a_repo() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = Git::open(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, GitError::NotARepo { .. }));
    }
}

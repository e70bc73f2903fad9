//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to Git. All repository reads flow
//! through this interface. No other module should import `git2`.
//!
//! # Responsibilities
//!
//! - Repository opening
//! - Local branch enumeration
//! - Reading a path from a branch's tip tree
//!
//! # Invariants
//!
//! - The repository is never written to
//! - A missing path is `Ok(None)`, never an error
//! - All operations return strong types (BranchName, TipEntry)
//!
//! # Example
//!
//! ```ignore
//! use mapsync::git::RepoHandle;
//!
//! let repo = RepoHandle::open("/srv/content.git".into()).await?;
//! for branch in repo.list_branches().await? {
//!     let entry = repo
//!         .read_file_at_branch_tip(branch.clone(), "mapping.json".into())
//!         .await?;
//!     println!("{}: {:?}", branch, entry);
//! }
//! ```

mod handle;
mod interface;

pub use handle::RepoHandle;
pub use interface::{EntryKind, Git, GitError, TipEntry};

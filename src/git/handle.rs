//! git::handle
//!
//! Shareable, async-friendly handle to an open repository.
//!
//! `git2::Repository` is `Send` but not `Sync`, and every libgit2 call
//! blocks. [`RepoHandle`] keeps a small pool of open [`Git`] instances for the
//! same repository and runs each read on tokio's blocking pool with one of
//! them checked out. A read takes an idle instance or opens a new one, so
//! reads for different branches proceed in parallel. The pool lock is held
//! only while checking out or returning an instance, never during a read and
//! never across an `.await`.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use super::interface::{Git, GitError, TipEntry};
use crate::core::types::BranchName;

/// Cloneable handle to the process-wide repository.
#[derive(Debug, Clone)]
pub struct RepoHandle {
    pool: Arc<Pool>,
}

#[derive(Debug)]
struct Pool {
    /// Path every pooled instance was opened from.
    path: PathBuf,
    /// Instances not currently lent to a read.
    idle: Mutex<Vec<Git>>,
}

impl Pool {
    fn checkout(&self) -> Result<Git, GitError> {
        let idle = self.idle.lock().map_err(|_| poisoned())?.pop();
        match idle {
            Some(git) => Ok(git),
            None => Git::open(&self.path),
        }
    }

    fn checkin(&self, git: Git) -> Result<(), GitError> {
        self.idle.lock().map_err(|_| poisoned())?.push(git);
        Ok(())
    }
}

fn poisoned() -> GitError {
    GitError::Internal {
        message: "repository pool lock poisoned".to_string(),
    }
}

impl RepoHandle {
    /// Wrap an already open repository.
    ///
    /// Further instances are opened from its git directory on demand.
    pub fn new(git: Git) -> Self {
        Self {
            pool: Arc::new(Pool {
                path: git.git_dir().to_path_buf(),
                idle: Mutex::new(vec![git]),
            }),
        }
    }

    /// Open the repository at `path` on the blocking pool.
    pub async fn open(path: PathBuf) -> Result<Self, GitError> {
        tokio::task::spawn_blocking(move || Git::open(&path))
            .await
            .map_err(|e| GitError::Internal {
                message: format!("repository open task failed: {}", e),
            })?
            .map(Self::new)
    }

    /// List all local branches.
    pub async fn list_branches(&self) -> Result<Vec<BranchName>, GitError> {
        self.with_git(|git| git.list_branches()).await
    }

    /// Read the entry at `path` in the tip commit of `branch`.
    pub async fn read_file_at_branch_tip(
        &self,
        branch: BranchName,
        path: String,
    ) -> Result<Option<TipEntry>, GitError> {
        self.with_git(move |git| git.read_file_at_branch_tip(&branch, &path))
            .await
    }

    async fn with_git<T, F>(&self, f: F) -> Result<T, GitError>
    where
        F: FnOnce(&Git) -> Result<T, GitError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = Arc::clone(&self.pool);
        tokio::task::spawn_blocking(move || {
            let git = pool.checkout()?;
            let result = f(&git);
            pool.checkin(git)?;
            result
        })
        .await
        .map_err(|e| GitError::Internal {
            message: format!("repository read task failed: {}", e),
        })?
    }

    #[cfg(test)]
    fn idle(&self) -> usize {
        self.pool.idle.lock().map(|idle| idle.len()).unwrap_or(0)
    }
}

//! Shared fixtures for integration tests.
//!
//! Repositories are built directly with git2 (no `git` binary needed):
//! every commit's tree is assembled in an in-memory index, so a branch tip
//! contains exactly the entries given to it.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use git2::{IndexEntry, IndexTime, Oid, Repository, Signature};
use tempfile::TempDir;

/// File modes as stored in git trees.
pub const MODE_FILE: u32 = 0o100644;
pub const MODE_LINK: u32 = 0o120000;
pub const MODE_GITLINK: u32 = 0o160000;

/// A bare repository in a temporary directory.
pub struct TestRepo {
    dir: TempDir,
    repo: Repository,
}

impl TestRepo {
    /// Create an empty bare repository.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let repo = Repository::init_bare(dir.path().join("content.git"))
            .expect("failed to init repository");
        Self { dir, repo }
    }

    /// Path of the repository.
    pub fn path(&self) -> PathBuf {
        self.dir.path().join("content.git")
    }

    /// The temporary directory holding the repository.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Commit `files` as the complete tree of `branch`, creating the branch
    /// if needed.
    pub fn commit_files(&self, branch: &str, files: &[(&str, &str)]) -> Oid {
        let entries: Vec<(String, u32, Oid)> = files
            .iter()
            .map(|(path, contents)| (path.to_string(), MODE_FILE, self.blob(contents)))
            .collect();
        self.commit_entries(branch, &entries)
    }

    /// Commit a branch whose only entry is `mapping.json` with `contents`.
    pub fn commit_mapping(&self, branch: &str, contents: &str) -> Oid {
        self.commit_files(branch, &[("mapping.json", contents)])
    }

    /// Commit a branch without a mapping file.
    pub fn commit_without_mapping(&self, branch: &str) -> Oid {
        self.commit_files(branch, &[("README.md", "# content\n")])
    }

    /// Write a blob and return its id.
    pub fn blob(&self, contents: &str) -> Oid {
        self.repo
            .blob(contents.as_bytes())
            .expect("failed to write blob")
    }

    /// Commit raw `(path, mode, id)` entries as the complete tree of `branch`.
    pub fn commit_entries(&self, branch: &str, entries: &[(String, u32, Oid)]) -> Oid {
        let mut index = git2::Index::new().expect("failed to create index");
        for (path, mode, id) in entries {
            index
                .add(&IndexEntry {
                    ctime: IndexTime::new(0, 0),
                    mtime: IndexTime::new(0, 0),
                    dev: 0,
                    ino: 0,
                    mode: *mode,
                    uid: 0,
                    gid: 0,
                    file_size: 0,
                    id: *id,
                    flags: 0,
                    flags_extended: 0,
                    path: path.as_bytes().to_vec(),
                })
                .expect("failed to add index entry");
        }
        let tree_id = index
            .write_tree_to(&self.repo)
            .expect("failed to write tree");
        let tree = self.repo.find_tree(tree_id).expect("failed to find tree");

        let refname = format!("refs/heads/{}", branch);
        let parent = self
            .repo
            .refname_to_id(&refname)
            .ok()
            .and_then(|id| self.repo.find_commit(id).ok());
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        let sig = Signature::now("Test User", "test@example.com").expect("signature");
        self.repo
            .commit(Some(&refname), &sig, &sig, "update content", &tree, &parents)
            .expect("failed to commit")
    }

    /// Point `refs/heads/<branch>` at a tree object instead of a commit.
    pub fn corrupt_branch(&self, branch: &str) {
        let tree_id = git2::Index::new()
            .and_then(|mut index| index.write_tree_to(&self.repo))
            .expect("failed to write tree");
        self.repo
            .reference(
                &format!("refs/heads/{}", branch),
                tree_id,
                true,
                "point branch at a tree",
            )
            .expect("failed to write reference");
    }
}

/// Write a minimal config file next to the repository and return its path.
pub fn write_config(root: &Path, repo: &Path, search_url: &str, extra: &str) -> PathBuf {
    let path = root.join("mapsync.toml");
    let contents = format!(
        "repo_path = {:?}\n{}\n[search]\nurl = {:?}\ntimeout_secs = 5\n",
        repo.display().to_string(),
        extra,
        search_url
    );
    std::fs::write(&path, contents).expect("failed to write config");
    path
}

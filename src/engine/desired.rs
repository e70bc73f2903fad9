//! engine::desired
//!
//! Desired-schema reader: the mapping a branch's tip says its index should have.
//!
//! | Entry at the mapping path     | Desired schema              |
//! |-------------------------------|-----------------------------|
//! | nothing                       | `{}`                        |
//! | directory, submodule, symlink | `{}`                        |
//! | regular file, JSON object     | the parsed object           |
//! | regular file, anything else   | `MalformedMapping` error    |

use tracing::debug;

use super::outcome::BranchError;
use crate::core::schema::Schema;
use crate::core::types::BranchName;
use crate::git::{RepoHandle, TipEntry};

/// Read and parse the mapping file at `path` on the tip of `branch`.
///
/// # Errors
///
/// - [`BranchError::RepoRead`] if the branch tip cannot be resolved
/// - [`BranchError::MalformedMapping`] if the file is not a JSON object
pub async fn get_desired_mapping(
    repo: &RepoHandle,
    branch: &BranchName,
    path: &str,
) -> Result<Schema, BranchError> {
    let entry = repo
        .read_file_at_branch_tip(branch.clone(), path.to_string())
        .await?;
    schema_from_entry(branch, path, entry)
}

fn schema_from_entry(
    branch: &BranchName,
    path: &str,
    entry: Option<TipEntry>,
) -> Result<Schema, BranchError> {
    match entry {
        None => {
            debug!(branch = %branch, path, "no mapping file, using empty mapping");
            Ok(Schema::empty())
        }
        Some(TipEntry::Other(kind)) => {
            debug!(branch = %branch, path, %kind, "mapping path is not a regular file, using empty mapping");
            Ok(Schema::empty())
        }
        Some(TipEntry::File(bytes)) => {
            Schema::from_slice(&bytes).map_err(|source| BranchError::MalformedMapping {
                path: path.to_string(),
                source,
            })
        }
    }
}

//! Target file resolution
//!
//! Finds the funding file of a repository at a given ref. GitHub reads
//! `.github/FUNDING.yml` before a root-level `FUNDING.yml`, so the probes run
//! in that order and the first hit wins.
//!
//! Only "not found" moves on to the next candidate. Any other failure aborts
//! the probe, since treating an outage as "no file yet" would make the
//! reconciler create a second funding file next to the real one.

use log::debug;

use crate::error::Result;
use crate::locator::RepoId;
use crate::repository::HostingApi;

/// Candidate locations, in priority order.
pub const FUNDING_PATHS: [&str; 2] = [".github/FUNDING.yml", "FUNDING.yml"];

/// The funding file of one repository at one ref.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFile {
    /// Where the file was found, or where it should be created.
    pub path: String,
    pub content: Option<Vec<u8>>,
    /// Version token of `content`; `None` iff the file is absent.
    pub version_token: Option<String>,
}

impl TargetFile {
    /// A missing file, to be created at the preferred location.
    pub fn absent() -> Self {
        Self {
            path: FUNDING_PATHS[0].to_string(),
            content: None,
            version_token: None,
        }
    }

    pub fn exists(&self) -> bool {
        self.content.is_some()
    }
}

/// Probe the candidate paths of `repo` at `git_ref` (default branch if `None`).
///
/// # Errors
///
/// Propagates the first failure that is not `RemoteNotFound`.
pub fn resolve(api: &dyn HostingApi, repo: &RepoId, git_ref: Option<&str>) -> Result<TargetFile> {
    for path in FUNDING_PATHS {
        match api.get_file(repo, path, git_ref) {
            Ok(file) => {
                debug!(
                    "Found {} in {} at {}",
                    path,
                    repo,
                    git_ref.unwrap_or("default branch")
                );
                return Ok(TargetFile {
                    path: file.path,
                    content: Some(file.content),
                    version_token: Some(file.sha),
                });
            }
            Err(e) if e.is_not_found() => continue,
            Err(e) => return Err(e),
        }
    }

    debug!("No funding file in {}", repo);
    Ok(TargetFile::absent())
}

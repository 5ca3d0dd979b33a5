//! # Hosting API Abstraction
//!
//! This module defines the `HostingApi` trait, the only way the reconciler
//! talks to the version-control hosting platform, together with the plain
//! data types that cross it.
//!
//! ## Design
//!
//! The reconciliation phases are written against the trait rather than a
//! concrete client. The production implementation is
//! [`GitHubClient`](crate::github::GitHubClient), which speaks the GitHub v3
//! REST API. Tests use an in-memory implementation that records every call,
//! which lets them assert not only on results but on which remote writes were
//! (or were not) issued.
//!
//! ## Error contract
//!
//! Implementations must report failures as:
//!
//! - `Error::RemoteNotFound` when the resource does not exist (HTTP 404).
//! - `Error::RemoteConflict` when a write lost a race or used a stale version
//!   token, including "already exists" responses (HTTP 409 and 422).
//! - `Error::RemoteUnavailable` for everything else.
//!
//! The phases rely on this split to treat "not found" and "already exists" as
//! ordinary control flow.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::locator::RepoId;

/// Repository metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryInfo {
    pub id: RepoId,
    pub default_branch: String,
}

/// A file read from a repository at some ref.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub path: String,
    pub content: Vec<u8>,
    /// Version token required to overwrite this revision of the file.
    pub sha: String,
}

/// A create-or-update of a single file on a branch.
#[derive(Debug, Clone)]
pub struct FileWrite<'a> {
    pub path: &'a str,
    pub branch: &'a str,
    pub message: &'a str,
    pub content: &'a [u8],
    /// `None` creates the file; `Some` updates the given revision.
    pub sha: Option<&'a str>,
}

/// Pull request lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PullRequestState {
    Open,
    Closed,
    Merged,
}

/// Which pull requests to enumerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullRequestFilter {
    Open,
    All,
}

impl PullRequestFilter {
    pub fn as_query(&self) -> &'static str {
        match self {
            PullRequestFilter::Open => "open",
            PullRequestFilter::All => "all",
        }
    }
}

/// A pull request as returned by the hosting API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRecord {
    pub number: u64,
    pub url: String,
    pub state: PullRequestState,
    pub author: String,
    pub title: String,
    pub body: String,
    /// `owner:branch` of the head.
    pub head_label: String,
}

/// Parameters for opening a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPullRequest {
    pub title: String,
    pub body: String,
    /// `owner:branch`
    pub head: String,
    pub base: String,
}

/// Operations the reconciler needs from the hosting platform.
pub trait HostingApi: Send + Sync {
    /// Login of the identity the client is authenticated as.
    fn authenticated_user(&self) -> Result<String>;

    /// Repository metadata; `RemoteNotFound` if it does not exist.
    fn get_repository(&self, repo: &RepoId) -> Result<RepositoryInfo>;

    /// Commit SHA at the tip of `branch`.
    fn branch_head(&self, repo: &RepoId, branch: &str) -> Result<String>;

    /// Read a file; `git_ref` of `None` means the default branch.
    fn get_file(&self, repo: &RepoId, path: &str, git_ref: Option<&str>) -> Result<RemoteFile>;

    /// Create or update a file.
    fn put_file(&self, repo: &RepoId, write: &FileWrite<'_>) -> Result<()>;

    /// Request a fork of `repo` under the authenticated identity.
    ///
    /// The returned repository may not be usable yet.
    fn create_fork(&self, repo: &RepoId) -> Result<RepositoryInfo>;

    /// Create `refs/heads/<branch>` at `sha`; `RemoteConflict` if it exists.
    fn create_branch(&self, repo: &RepoId, branch: &str, sha: &str) -> Result<()>;

    /// Enumerate pull requests against `repo` in the platform's default
    /// order, optionally restricted to a head label (`owner:branch`).
    fn list_pull_requests(
        &self,
        repo: &RepoId,
        filter: PullRequestFilter,
        head: Option<&str>,
    ) -> Result<Vec<PullRequestRecord>>;

    /// Open a pull request; `RemoteConflict` if one already exists for the head.
    fn create_pull_request(&self, repo: &RepoId, pr: &NewPullRequest) -> Result<PullRequestRecord>;

    /// Open an issue and return its URL.
    fn create_issue(&self, repo: &RepoId, title: &str, body: &str) -> Result<String>;
}

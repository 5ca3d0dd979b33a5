//! Deterministic branch management in the fork.
//!
//! The branch name is a pure function of the request id, which makes it the
//! idempotency key for the whole pipeline: every run for a request lands on
//! the same branch, and the hosting API's atomic ref creation picks a single
//! winner among concurrent runs.

use log::debug;

use crate::error::Result;
use crate::phases::fork::ForkHandle;
use crate::repository::HostingApi;

/// Prefix used when the settings do not override it.
pub const DEFAULT_BRANCH_PREFIX: &str = "funding-request-";

/// Branch name for a request.
pub fn branch_name(prefix: &str, request_id: u64) -> String {
    format!("{}{}", prefix, request_id)
}

/// A branch in the fork and the commit it was created from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRef {
    pub name: String,
    pub base_sha: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchOutcome {
    Created,
    /// The branch was already there, from a previous or concurrent run.
    Reused,
}

/// Create `branch.name` at `branch.base_sha` in the fork.
///
/// "Reference already exists" counts as success. The existing branch is not
/// compared against `base_sha`; the commit step reconciles its content.
pub fn ensure_branch(
    api: &dyn HostingApi,
    fork: &ForkHandle,
    branch: &BranchRef,
) -> Result<BranchOutcome> {
    match api.create_branch(&fork.id, &branch.name, &branch.base_sha) {
        Ok(()) => {
            debug!("Created branch {} in {}", branch.name, fork.id);
            Ok(BranchOutcome::Created)
        }
        Err(e) if e.is_conflict() => {
            debug!("Reusing branch {} in {}", branch.name, fork.id);
            Ok(BranchOutcome::Reused)
        }
        Err(e) => Err(e),
    }
}

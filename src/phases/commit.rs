//! Writes the reconciled funding file to the fork branch.
//!
//! The file is always re-read from the branch right before the write. A
//! version token from the upstream repository, or from an earlier run against
//! the fork, does not describe the branch tip and would be rejected.

use log::{debug, info};

use crate::content::{self, CanonicalUrl, ContentPolicy};
use crate::error::Result;
use crate::phases::branch::BranchRef;
use crate::phases::fork::ForkHandle;
use crate::phases::resolve::resolve;
use crate::repository::{FileWrite, HostingApi};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The branch had no funding file.
    Created,
    Updated,
    /// The branch already carried the reconciled content; nothing written.
    Unchanged,
}

pub fn commit_message(request_id: u64) -> String {
    format!("Add sponsorship link for funding request #{}", request_id)
}

/// Reconcile the funding file on `branch` of the fork and commit the result.
///
/// # Errors
///
/// Resolution and parse failures, and any write failure. A conflict on the
/// write means another writer moved the file after the re-read; it is not
/// retried.
pub fn apply_funding_update(
    api: &dyn HostingApi,
    fork: &ForkHandle,
    branch: &BranchRef,
    canonical: &CanonicalUrl,
    policy: &ContentPolicy,
) -> Result<CommitOutcome> {
    let current = resolve(api, &fork.id, Some(&branch.name))?;
    let updated = content::reconcile(current.content.as_deref(), canonical, policy)?;

    if current.content.as_deref() == Some(updated.as_slice()) {
        debug!("{} on {} is already reconciled", current.path, branch.name);
        return Ok(CommitOutcome::Unchanged);
    }

    let message = commit_message(canonical.request_id());
    api.put_file(
        &fork.id,
        &FileWrite {
            path: &current.path,
            branch: &branch.name,
            message: &message,
            content: &updated,
            sha: current.version_token.as_deref(),
        },
    )?;

    let outcome = if current.exists() {
        CommitOutcome::Updated
    } else {
        CommitOutcome::Created
    };
    info!(
        "{:?} {} on {}:{}",
        outcome, current.path, fork.id, branch.name
    );
    Ok(outcome)
}

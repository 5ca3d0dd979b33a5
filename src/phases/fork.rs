//! Fork acquisition
//!
//! The acting identity cannot push to the target repository, so every write
//! goes to its fork. Forking is asynchronous on the hosting side: the create
//! call returns before the fork can be read or written. The configured
//! [`ForkReadiness`] policy decides how long to wait before moving on.

use std::thread;
use std::time::Duration;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::locator::RepoId;
use crate::repository::{HostingApi, RepositoryInfo};

/// The acting identity's copy of the target repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkHandle {
    pub id: RepoId,
    pub default_branch: String,
    /// True if this run requested the fork.
    pub created: bool,
}

/// How to absorb fork provisioning delay after a create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ForkReadiness {
    /// Sleep once, then assume the fork is usable.
    FixedDelay { delay_ms: u64 },
    /// Look the fork up until it answers, at most `attempts` times.
    Poll { interval_ms: u64, attempts: u32 },
}

impl Default for ForkReadiness {
    fn default() -> Self {
        ForkReadiness::FixedDelay { delay_ms: 5_000 }
    }
}

/// Ensure a fork of `target` exists under `acting_identity`.
///
/// An existing repository with the target's name under the acting identity
/// is used as is. Otherwise a fork is requested; "already exists" from the
/// create call means a concurrent run got there first and counts as success.
///
/// # Errors
///
/// Propagates lookup failures other than "not found", fork creation failures
/// other than "already exists", and poll failures.
pub fn ensure_fork(
    api: &dyn HostingApi,
    target: &RepositoryInfo,
    acting_identity: &str,
    readiness: &ForkReadiness,
) -> Result<ForkHandle> {
    let candidate = RepoId::new(acting_identity, target.id.name.clone());

    match api.get_repository(&candidate) {
        Ok(existing) => {
            debug!("Using existing fork {}", existing.id);
            return Ok(ForkHandle {
                id: existing.id,
                default_branch: existing.default_branch,
                created: false,
            });
        }
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e),
    }

    info!("Forking {} as {}", target.id, acting_identity);
    let handle = match api.create_fork(&target.id) {
        Ok(fork) => ForkHandle {
            id: fork.id,
            default_branch: fork.default_branch,
            created: true,
        },
        Err(e) if e.is_conflict() => {
            debug!("Fork of {} already exists", target.id);
            ForkHandle {
                id: candidate,
                default_branch: target.default_branch.clone(),
                created: true,
            }
        }
        Err(e) => return Err(e),
    };

    wait_until_ready(api, &handle, readiness)?;
    Ok(handle)
}

fn wait_until_ready(
    api: &dyn HostingApi,
    fork: &ForkHandle,
    readiness: &ForkReadiness,
) -> Result<()> {
    match readiness {
        ForkReadiness::FixedDelay { delay_ms } => {
            debug!("Waiting {}ms for fork {} to provision", delay_ms, fork.id);
            thread::sleep(Duration::from_millis(*delay_ms));
            Ok(())
        }
        ForkReadiness::Poll {
            interval_ms,
            attempts,
        } => {
            for attempt in 1..=*attempts {
                match api.get_repository(&fork.id) {
                    Ok(_) => {
                        debug!("Fork {} ready after {} lookup(s)", fork.id, attempt);
                        return Ok(());
                    }
                    Err(e) if e.is_not_found() => {
                        thread::sleep(Duration::from_millis(*interval_ms));
                    }
                    Err(e) => return Err(e),
                }
            }
            Err(Error::RemoteNotFound {
                resource: format!("{} (not ready after {} lookups)", fork.id, attempts),
            })
        }
    }
}

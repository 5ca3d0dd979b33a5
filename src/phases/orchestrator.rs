//! Driver for a complete reconciliation run
//!
//! This module sequences the stages in [`crate::phases`] and turns the run
//! into a single [`Outcome`]. Every collaborator is passed in explicitly;
//! there is no process-wide state.

use log::{info, warn};

use super::branch::{self, BranchRef};
use super::commit;
use super::fork::{self, ForkReadiness};
use super::pull_request::{self, PullRequestTemplate};
use super::resolve;
use super::Outcome;
use crate::content::{self, ContentPolicy};
use crate::error::Result;
use crate::locator::parse_repository_url;
use crate::repository::HostingApi;
use crate::request::{build_request, ReconciliationRequest, RequestSource};
use crate::sinks::{CacheRefresher, FailureSink};

/// Deployment-wide knobs for a run.
#[derive(Debug, Clone)]
pub struct Policy {
    pub fulfillment_base_url: String,
    pub content: ContentPolicy,
    pub fork_readiness: ForkReadiness,
    pub branch_prefix: String,
    pub template: PullRequestTemplate,
    /// Stop before the first write and report what would happen.
    pub dry_run: bool,
}

/// Runs reconciliations against one hosting API.
pub struct Reconciler<'a> {
    api: &'a dyn HostingApi,
    policy: &'a Policy,
    failure_sink: &'a dyn FailureSink,
    cache: Option<&'a dyn CacheRefresher>,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        api: &'a dyn HostingApi,
        policy: &'a Policy,
        failure_sink: &'a dyn FailureSink,
    ) -> Self {
        Self {
            api,
            policy,
            failure_sink,
            cache: None,
        }
    }

    pub fn with_cache_refresher(mut self, cache: &'a dyn CacheRefresher) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Look the request up, check its preconditions, and run it.
    pub fn run_by_id(&self, source: &dyn RequestSource, request_id: u64) -> Outcome {
        match build_request(source, request_id, &self.policy.fulfillment_base_url) {
            Ok(request) => self.run(&request),
            Err(e) => self.fail(request_id, e),
        }
    }

    /// Run one reconciliation. Never returns an error: failures become
    /// [`Outcome::Failed`] and are handed to the failure sink.
    pub fn run(&self, request: &ReconciliationRequest) -> Outcome {
        let outcome = match self.reconcile(request) {
            Ok(outcome) => outcome,
            Err(e) => return self.fail(request.request_id, e),
        };
        info!("Request #{}: {}", request.request_id, outcome);

        if let (false, Some(cache)) = (self.policy.dry_run, self.cache) {
            if let Err(e) = cache.refresh(request.request_id) {
                warn!("Cache refresh for request #{} failed: {}", request.request_id, e);
            }
        }
        outcome
    }

    fn fail(&self, request_id: u64, err: crate::error::Error) -> Outcome {
        if let Err(sink_err) = self.failure_sink.report(request_id, &err) {
            warn!(
                "Could not report failure of request #{}: {}",
                request_id, sink_err
            );
        }
        Outcome::Failed {
            kind: err.kind(),
            detail: err.to_string(),
        }
    }

    fn reconcile(&self, request: &ReconciliationRequest) -> Result<Outcome> {
        let canonical = &request.canonical_url;
        let target_id = parse_repository_url(&request.target_repository)?;
        let target = self.api.get_repository(&target_id)?;

        let upstream = resolve::resolve(self.api, &target.id, None)?;
        let reconciled =
            content::reconcile(upstream.content.as_deref(), canonical, &self.policy.content)?;
        if upstream.content.as_deref() == Some(reconciled.as_slice()) {
            return Ok(Outcome::AlreadySatisfied {
                reference: format!("{}:{}", target.id, upstream.path),
            });
        }

        let identity = self.api.authenticated_user()?;
        if let Some(existing) = pull_request::find_by_content(
            self.api,
            &target.id,
            &identity,
            canonical,
            &self.policy.template,
        )? {
            return Ok(Outcome::AlreadySatisfied {
                reference: existing.url,
            });
        }

        if self.policy.dry_run {
            return Ok(Outcome::Skipped {
                reason: format!(
                    "dry run: {}:{} needs an update and no pull request exists",
                    target.id, upstream.path
                ),
            });
        }

        let fork = fork::ensure_fork(self.api, &target, &identity, &self.policy.fork_readiness)?;
        let base_sha = self.api.branch_head(&fork.id, &fork.default_branch)?;
        let branch = BranchRef {
            name: branch::branch_name(&self.policy.branch_prefix, request.request_id),
            base_sha,
        };
        branch::ensure_branch(self.api, &fork, &branch)?;
        commit::apply_funding_update(self.api, &fork, &branch, canonical, &self.policy.content)?;

        pull_request::open_pull_request(
            self.api,
            request,
            &target,
            &fork,
            &branch,
            &identity,
            &self.policy.template,
        )
    }
}

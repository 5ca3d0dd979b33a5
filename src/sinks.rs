//! Collaborators the driver notifies after a run.
//!
//! Failures go to a [`FailureSink`]; successful runs trigger a
//! [`CacheRefresher`]. Both are best effort: their own failures are logged by
//! the driver and never change the run's outcome.

use std::time::Duration;

use log::{debug, error};
use url::Url;

use crate::error::{Error, Result};
use crate::locator::RepoId;
use crate::repository::HostingApi;

/// Receives the error of a failed run.
pub trait FailureSink {
    fn report(&self, request_id: u64, error: &Error) -> Result<()>;
}

/// Writes failures to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFailureSink;

impl FailureSink for LogFailureSink {
    fn report(&self, request_id: u64, err: &Error) -> Result<()> {
        error!(
            "Reconciliation of request #{} failed ({}): {}",
            request_id,
            err.kind(),
            err
        );
        Ok(())
    }
}

/// Files an issue per failure in a fixed repository.
pub struct IssueFailureSink<'a> {
    api: &'a dyn HostingApi,
    repository: RepoId,
}

impl<'a> IssueFailureSink<'a> {
    pub fn new(api: &'a dyn HostingApi, repository: RepoId) -> Self {
        Self { api, repository }
    }
}

pub fn failure_issue_title(request_id: u64) -> String {
    format!("Funding reconciliation failed for request #{}", request_id)
}

impl FailureSink for IssueFailureSink<'_> {
    fn report(&self, request_id: u64, err: &Error) -> Result<()> {
        let body = format!(
            "Reconciling the funding file for request #{} failed.\n\n\
             **Kind:** `{}`\n\n```\n{}\n```\n",
            request_id,
            err.kind(),
            err
        );
        let url = self
            .api
            .create_issue(&self.repository, &failure_issue_title(request_id), &body)
            .map_err(|e| Error::DownstreamSideEffect {
                target: self.repository.full_name(),
                message: e.to_string(),
            })?;
        debug!("Reported failure of request #{} at {}", request_id, url);
        Ok(())
    }
}

/// Refreshes a downstream cache once a request is reconciled.
pub trait CacheRefresher {
    fn refresh(&self, request_id: u64) -> Result<()>;
}

/// Issues a GET against a URL template; `{id}` is replaced by the request id.
pub struct HttpCacheRefresher {
    url_template: String,
    http: reqwest::blocking::Client,
}

impl HttpCacheRefresher {
    pub fn new(url_template: &str) -> Result<Self> {
        Url::parse(&url_template.replace("{id}", "0"))?;
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Config {
                message: format!("cannot build HTTP client: {}", e),
                hint: None,
            })?;
        Ok(Self {
            url_template: url_template.to_string(),
            http,
        })
    }

    pub fn url_for(&self, request_id: u64) -> String {
        self.url_template.replace("{id}", &request_id.to_string())
    }
}

impl CacheRefresher for HttpCacheRefresher {
    fn refresh(&self, request_id: u64) -> Result<()> {
        let url = self.url_for(request_id);
        let side_effect = |message: String| Error::DownstreamSideEffect {
            target: url.clone(),
            message,
        };

        let response = self
            .http
            .get(&url)
            .send()
            .map_err(|e| side_effect(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(side_effect(format!("HTTP {}", status.as_u16())));
        }
        debug!("Refreshed cache at {}", url);
        Ok(())
    }
}

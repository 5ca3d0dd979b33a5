//! # Reconcile Command Implementation
//!
//! Runs one reconciliation against the GitHub API and prints its outcome.
//!
//! ## Process
//!
//! 1. Load the settings and the approved-request registry.
//! 2. Build the API client from the token (`--token` or `GITHUB_TOKEN`).
//! 3. Wire up the failure sink and the optional cache refresher.
//! 4. Run the request and print the outcome, as text or as JSON.
//!
//! A failed outcome makes the process exit non-zero after printing it.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use funding_reconciler::github::GitHubClient;
use funding_reconciler::output::{format_outcome, OutputConfig};
use funding_reconciler::phases::orchestrator::{Policy, Reconciler};
use funding_reconciler::phases::pull_request::PullRequestTemplate;
use funding_reconciler::request::YamlRequestSource;
use funding_reconciler::sinks::{
    FailureSink, HttpCacheRefresher, IssueFailureSink, LogFailureSink,
};
use log::debug;

use super::load_settings;

/// Reconcile a request's FUNDING.yml
#[derive(Args, Debug)]
pub struct ReconcileArgs {
    /// Approved request to reconcile
    #[arg(long, value_name = "ID")]
    pub request_id: u64,

    /// Stop before the first write and report whether a change is needed
    #[arg(long)]
    pub dry_run: bool,

    /// Print the outcome as JSON
    #[arg(long)]
    pub json: bool,

    /// Settings file
    #[arg(long, value_name = "PATH", env = "FUNDING_RECONCILER_CONFIG")]
    pub config: Option<PathBuf>,

    /// GitHub API token
    #[arg(long, value_name = "TOKEN", env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

pub fn execute(args: ReconcileArgs, output: &OutputConfig) -> Result<()> {
    let settings = load_settings(args.config)?;

    let Some(requests_file) = settings.requests_file.as_deref() else {
        bail!("No requests_file configured; add it to the settings file");
    };
    let source = YamlRequestSource::from_file(requests_file)?;

    let token = match args.token.as_deref().map(str::trim) {
        Some(token) if !token.is_empty() => token.to_string(),
        _ => bail!("A GitHub token is required; pass --token or set GITHUB_TOKEN"),
    };
    let client = GitHubClient::new(&settings.api_base_url, &token, &settings.user_agent)?;

    let policy = Policy {
        fulfillment_base_url: settings.fulfillment_base_url.clone(),
        content: settings.content_policy()?,
        fork_readiness: settings.fork_readiness.clone(),
        branch_prefix: settings.branch_prefix.clone(),
        template: PullRequestTemplate::default(),
        dry_run: args.dry_run,
    };

    let sink: Box<dyn FailureSink + '_> = if settings.report_failures_as_issues {
        Box::new(IssueFailureSink::new(&client, settings.home_repository_id()?))
    } else {
        Box::new(LogFailureSink)
    };
    let cache = settings
        .cache_refresh_url
        .as_deref()
        .map(HttpCacheRefresher::new)
        .transpose()
        .context("Invalid cache_refresh_url")?;

    let mut reconciler = Reconciler::new(&client, &policy, sink.as_ref());
    if let Some(cache) = &cache {
        reconciler = reconciler.with_cache_refresher(cache);
    }

    debug!("Reconciling request #{}", args.request_id);
    let outcome = reconciler.run_by_id(&source, args.request_id);

    if args.json {
        println!("{}", serde_json::to_string(&outcome)?);
    } else {
        println!("{}", format_outcome(output, &outcome));
    }

    if outcome.is_failed() {
        bail!("Reconciliation of request #{} failed", args.request_id);
    }
    Ok(())
}

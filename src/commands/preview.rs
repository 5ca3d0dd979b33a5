//! # Preview Command Implementation
//!
//! Prints what `FUNDING.yml` would look like after reconciliation, using a
//! local file as the current content. Nothing is sent over the network, which
//! makes it handy for checking the deployment's obsolete-link settings
//! against real files.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use funding_reconciler::content::{reconcile, CanonicalUrl};

use super::load_settings;

/// Preview the reconciled FUNDING.yml
#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Request whose canonical link should be present
    #[arg(long, value_name = "ID")]
    pub request_id: u64,

    /// Current FUNDING.yml; omit to preview a freshly created file
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Settings file
    #[arg(long, value_name = "PATH", env = "FUNDING_RECONCILER_CONFIG")]
    pub config: Option<PathBuf>,
}

pub fn execute(args: PreviewArgs) -> Result<()> {
    let settings = load_settings(args.config)?;
    let policy = settings.content_policy()?;
    let canonical = CanonicalUrl::new(&settings.fulfillment_base_url, args.request_id)?;

    let existing = match &args.file {
        Some(path) => Some(
            fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?,
        ),
        None => None,
    };

    let updated = reconcile(existing.as_deref(), &canonical, &policy)?;
    io::stdout().write_all(&updated)?;
    Ok(())
}

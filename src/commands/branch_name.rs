//! # Branch Name Command Implementation
//!
//! Prints the fork branch a request's changes live on. The name only depends
//! on the request id and the configured prefix, so it can be computed offline.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use funding_reconciler::phases::branch::{branch_name, DEFAULT_BRANCH_PREFIX};

use super::load_settings;

/// Print the branch name used for a request
#[derive(Args, Debug)]
pub struct BranchNameArgs {
    #[arg(long, value_name = "ID")]
    pub request_id: u64,

    /// Settings file to read `branch_prefix` from; the default prefix is
    /// used when omitted
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

pub fn execute(args: BranchNameArgs) -> Result<()> {
    let prefix = match args.config {
        Some(path) => load_settings(Some(path))?.branch_prefix,
        None => DEFAULT_BRANCH_PREFIX.to_string(),
    };
    println!("{}", branch_name(&prefix, args.request_id));
    Ok(())
}

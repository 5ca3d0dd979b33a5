//! # CLI Command Implementations
//!
//! Each subcommand of `funding-reconciler` lives in its own file with:
//! - An `Args` struct that defines the command-specific arguments, derived
//!   using `clap`.
//! - An `execute` function that takes the parsed `Args` and calls into the
//!   `funding_reconciler` library.

use std::path::PathBuf;

use anyhow::{Context, Result};
use funding_reconciler::config::Settings;
use funding_reconciler::defaults::default_config_path;

pub mod branch_name;
pub mod completions;
pub mod preview;
pub mod reconcile;

/// Load settings from `path`, or from the default location.
pub(crate) fn load_settings(path: Option<PathBuf>) -> Result<Settings> {
    let path = path.unwrap_or_else(default_config_path);
    Settings::load(&path).with_context(|| format!("Failed to load settings from {}", path.display()))
}

//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};
use funding_reconciler::output::OutputConfig;

use crate::commands;

/// Funding Reconciler - Keep sponsorship links in FUNDING.yml up to date
#[derive(Parser, Debug)]
#[command(name = "funding-reconciler")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconcile FUNDING.yml of a request's repository through a pull request
    Reconcile(commands::reconcile::ReconcileArgs),

    /// Print the reconciled FUNDING.yml for a local file, without network access
    Preview(commands::preview::PreviewArgs),

    /// Print the branch name used for a request
    BranchName(commands::branch_name::BranchNameArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        // Logs go to stderr so `--json` output stays clean.
        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(self.log_level.as_str()),
        )
        .target(env_logger::Target::Stderr)
        .try_init()
        .ok();

        let output = OutputConfig::from_env_and_flag(&self.color);

        match self.command {
            Commands::Reconcile(args) => commands::reconcile::execute(args, &output),
            Commands::Preview(args) => commands::preview::execute(args),
            Commands::BranchName(args) => commands::branch_name::execute(args),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

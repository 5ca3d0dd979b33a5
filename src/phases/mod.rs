//! The stages of a funding reconciliation run.
//!
//! ## Overview
//!
//! A run moves through these stages, each taking the previous stage's output:
//! 1. Resolve - find the funding file upstream (`resolve`)
//! 2. Fork - make sure the acting identity has a fork (`fork`)
//! 3. Branch - create or reuse the request's branch in the fork (`branch`)
//! 4. Commit - re-read, reconcile, and write the file on that branch (`commit`)
//! 5. Pull request - find or open the pull request (`pull_request`)
//!
//! The [`orchestrator`] sequences them, short-circuits before any write when
//! upstream is already reconciled, and folds every failure into an
//! [`Outcome`].

use std::fmt;

use serde::Serialize;

use crate::error::ErrorKind;

pub mod branch;
pub mod commit;
pub mod fork;
pub mod orchestrator;
pub mod pull_request;
pub mod resolve;

/// Result of one run, as reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// A new pull request was opened.
    Created { pr_url: String },
    /// Nothing to do: the file is already reconciled upstream, or a matching
    /// pull request exists. `reference` points at whichever it was.
    AlreadySatisfied { reference: String },
    Skipped { reason: String },
    Failed { kind: ErrorKind, detail: String },
}

impl Outcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }

    /// URL of the pull request this run opened, if any.
    pub fn pr_url(&self) -> Option<&str> {
        match self {
            Outcome::Created { pr_url } => Some(pr_url),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Created { pr_url } => write!(f, "Opened pull request {}", pr_url),
            Outcome::AlreadySatisfied { reference } => {
                write!(f, "Already satisfied by {}", reference)
            }
            Outcome::Skipped { reason } => write!(f, "Skipped: {}", reason),
            Outcome::Failed { kind, detail } => write!(f, "Failed ({}): {}", kind, detail),
        }
    }
}

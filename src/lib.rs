//! # Funding Reconciler Library
//!
//! This library keeps the sponsorship link of an approved funding request in
//! a third-party repository's `FUNDING.yml`. It has no write access to that
//! repository, so it works the way a contributor would: fork, branch, commit,
//! pull request. It is designed to be used by the `funding-reconciler`
//! command-line tool but can be driven by any caller that can supply a
//! [`repository::HostingApi`].
//!
//! ## Quick Example
//!
//! ```
//! use funding_reconciler::content::{reconcile, CanonicalUrl, ContentPolicy};
//!
//! let canonical = CanonicalUrl::new("https://x/fullfill", 42).unwrap();
//! let policy = ContentPolicy::for_deployment(
//!     "https://github.com/org/repo",
//!     "https://x/fullfill",
//!     &[],
//! )
//! .unwrap();
//!
//! let existing = b"custom: ['https://github.com/org/repo/issues/42']\n";
//! let updated = reconcile(Some(&existing[..]), &canonical, &policy).unwrap();
//! assert_eq!(updated, b"custom: ['https://x/fullfill?issue=42']\n");
//!
//! // Reconciling again changes nothing.
//! assert_eq!(reconcile(Some(updated.as_slice()), &canonical, &policy).unwrap(), updated);
//! ```
//!
//! ## Core Concepts
//!
//! - **Content (`content`)**: The pure transformation of a funding file. It
//!   drops links in any recognized obsolete shape and makes sure the
//!   canonical link appears exactly once.
//! - **Hosting API (`repository`, `github`)**: The trait every remote call
//!   goes through, and its GitHub REST implementation.
//! - **Phases (`phases`)**: Resolve, fork, branch, commit, and pull request
//!   stages, sequenced by `phases::orchestrator::Reconciler`.
//! - **Requests (`request`)**: Approved-request lookup and precondition
//!   checks.
//! - **Sinks (`sinks`)**: Failure reporting and downstream cache refresh.
//!
//! ## Idempotency
//!
//! Every run for a request uses the same branch name, and existing pull
//! requests are found by the canonical URL in their body. Repeated or
//! concurrent runs therefore converge on one branch and one pull request,
//! and a run aborted halfway is finished by the next one.

pub mod config;
pub mod content;
pub mod defaults;
pub mod error;
pub mod github;
pub mod locator;
pub mod output;
pub mod phases;
pub mod repository;
pub mod request;
pub mod sinks;

#[cfg(test)]
mod content_proptest;
#[cfg(test)]
mod testing;

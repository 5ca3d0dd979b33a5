//! # Error Handling
//!
//! This module defines the centralized error handling mechanism for the
//! `funding-reconciler` library. It uses the `thiserror` library to create a
//! single `Error` enum that covers every failure a reconciliation run can
//! encounter, with messages that carry enough context to be posted back to
//! whoever triggered the run.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Remote failures are split into three
//!   variants (`RemoteNotFound`, `RemoteConflict`, `RemoteUnavailable`) so that
//!   callers can tell "the resource is not there" apart from "someone else
//!   created it first" and from "the hosting API is broken".
//!
//! - **`ErrorKind`**: The coarse classification surfaced in a failed
//!   [`Outcome`](crate::phases::Outcome). Every `Error` maps to exactly one
//!   kind through [`Error::kind`].
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.

use serde::Serialize;
use thiserror::Error;

/// Coarse error classification reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The request is unknown, not approved, or the feature is disabled.
    PreconditionFailed,
    /// A repository URL or the existing funding file could not be parsed.
    MalformedInput,
    /// An expected remote resource is absent.
    RemoteNotFound,
    /// A version mismatch or a duplicate-creation race.
    RemoteConflict,
    /// Any other failure talking to the hosting API.
    RemoteUnavailable,
    /// A best-effort side effect (cache refresh, failure report) failed.
    DownstreamSideEffectFailed,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::PreconditionFailed => "precondition_failed",
            ErrorKind::MalformedInput => "malformed_input",
            ErrorKind::RemoteNotFound => "remote_not_found",
            ErrorKind::RemoteConflict => "remote_conflict",
            ErrorKind::RemoteUnavailable => "remote_unavailable",
            ErrorKind::DownstreamSideEffectFailed => "downstream_side_effect_failed",
        };
        f.write_str(name)
    }
}

/// Main error type for funding reconciliation
#[derive(Error, Debug)]
pub enum Error {
    /// The request record cannot be reconciled (unknown, unapproved, disabled).
    #[error("Precondition failed for request #{request_id}: {message}")]
    PreconditionFailed { request_id: u64, message: String },

    /// Input that should have a known shape did not.
    ///
    /// Covers repository URLs and the content of an existing funding file.
    #[error("Malformed input: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    MalformedInput {
        message: String,
        /// Optional hint for how to fix the input
        hint: Option<String>,
    },

    /// The hosting API reported that a resource does not exist (404).
    #[error("Remote resource not found: {resource}")]
    RemoteNotFound { resource: String },

    /// The hosting API rejected a write because of a conflict (409/422).
    #[error("Remote conflict on {resource}: {message}")]
    RemoteConflict { resource: String, message: String },

    /// Any other hosting API failure, including transport errors.
    #[error("Hosting API error for {resource}{}: {message}", status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
    RemoteUnavailable {
        resource: String,
        status: Option<u16>,
        message: String,
    },

    /// A best-effort side effect failed.
    #[error("Downstream side effect failed for {target}: {message}")]
    DownstreamSideEffect { target: String, message: String },

    /// The settings file is missing or invalid.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Config {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl Error {
    /// Classifies this error for reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::PreconditionFailed { .. } => ErrorKind::PreconditionFailed,
            Error::MalformedInput { .. }
            | Error::Yaml(_)
            | Error::UrlParse(_)
            | Error::Regex(_)
            | Error::Config { .. } => ErrorKind::MalformedInput,
            Error::RemoteNotFound { .. } => ErrorKind::RemoteNotFound,
            Error::RemoteConflict { .. } => ErrorKind::RemoteConflict,
            Error::RemoteUnavailable { .. } | Error::Io(_) | Error::Json(_) => {
                ErrorKind::RemoteUnavailable
            }
            Error::DownstreamSideEffect { .. } => ErrorKind::DownstreamSideEffectFailed,
        }
    }

    /// Returns true if the hosting API reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::RemoteNotFound { .. })
    }

    /// Returns true for "already exists" / stale-version rejections.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::RemoteConflict { .. })
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Error::MalformedInput {
            message: message.into(),
            hint: None,
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

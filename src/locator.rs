//! Repository URL parsing
//!
//! Turns the free-form repository URL stored on a request record into an
//! `(owner, name)` identity. No I/O happens here.
//!
//! Accepted forms:
//! - `https://github.com/owner/name` (optional `.git`, trailing slash, or
//!   extra path segments such as `/tree/main`)
//! - `git@github.com:owner/name.git`
//! - `owner/name`

use std::fmt;

use url::Url;

use crate::error::{Error, Result};

/// Identity of a repository on the hosting platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Parse a repository URL into its owner and name.
///
/// # Errors
///
/// Returns `Error::MalformedInput` when the input does not name an owner and
/// a repository.
pub fn parse_repository_url(input: &str) -> Result<RepoId> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(malformed(input));
    }

    let path = if let Some(rest) = trimmed.strip_prefix("git@") {
        // scp-like syntax: git@host:owner/name.git
        match rest.split_once(':') {
            Some((_, path)) => path.to_string(),
            None => return Err(malformed(input)),
        }
    } else if trimmed.contains("://") {
        let url = Url::parse(trimmed).map_err(|_| malformed(input))?;
        if url.host_str().is_none() {
            return Err(malformed(input));
        }
        url.path().to_string()
    } else {
        trimmed.to_string()
    };

    let mut segments = path.split('/').filter(|s| !s.is_empty());
    let owner = segments.next().ok_or_else(|| malformed(input))?;
    let name = segments.next().ok_or_else(|| malformed(input))?;
    let name = name.strip_suffix(".git").unwrap_or(name);

    if !is_valid_segment(owner) || !is_valid_segment(name) {
        return Err(malformed(input));
    }

    Ok(RepoId::new(owner, name))
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn malformed(input: &str) -> Error {
    Error::MalformedInput {
        message: format!("'{}' is not a repository URL", input),
        hint: Some("Expected https://github.com/<owner>/<name> or <owner>/<name>".to_string()),
    }
}

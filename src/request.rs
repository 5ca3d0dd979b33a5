//! # Reconciliation Requests
//!
//! A run starts from a request id. The approved-request source turns it into
//! the record a maintainer filed (who they are, which repository) plus the
//! two gates that must both be open before anything is written: the request
//! was approved, and funding links are enabled for it.
//!
//! The source is a trait so deployments can plug in whatever store holds the
//! records. [`YamlRequestSource`] reads them from a local YAML registry:
//!
//! ```yaml
//! requests:
//!   42:
//!     maintainer: octocat
//!     repository: https://github.com/acme/widgets
//!     approved: true
//!     funding_enabled: true
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::content::CanonicalUrl;
use crate::error::{Error, Result};

/// A request record as stored by the approved-request source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovedRequest {
    /// Handle of the maintainer who filed the request.
    pub maintainer: String,
    /// URL of the repository whose funding file should change.
    pub repository: String,
    #[serde(default)]
    pub approved: bool,
    #[serde(default)]
    pub funding_enabled: bool,
}

/// Everything one run needs to know about its request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationRequest {
    pub request_id: u64,
    pub target_repository: String,
    pub canonical_url: CanonicalUrl,
    pub requester_handle: String,
}

/// Where approved requests come from.
pub trait RequestSource {
    /// Look up a request; `Ok(None)` if the id is unknown.
    fn fetch(&self, request_id: u64) -> Result<Option<ApprovedRequest>>;
}

/// Request registry kept in a YAML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct YamlRequestSource {
    #[serde(default)]
    requests: BTreeMap<u64, ApprovedRequest>,
}

impl YamlRequestSource {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("cannot read requests file {}: {}", path.display(), e),
            hint: Some("Set `requests_file` in the settings to an existing file".to_string()),
        })?;
        let source = Self::parse(&text)?;
        debug!(
            "Loaded {} request(s) from {}",
            source.requests.len(),
            path.display()
        );
        Ok(source)
    }

    pub fn parse(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

impl RequestSource for YamlRequestSource {
    fn fetch(&self, request_id: u64) -> Result<Option<ApprovedRequest>> {
        Ok(self.requests.get(&request_id).cloned())
    }
}

/// Fetch a request and check that it may be reconciled.
///
/// # Errors
///
/// `PreconditionFailed` if the request is unknown, not approved, or has
/// funding disabled. `MalformedInput` if the canonical URL cannot be built.
pub fn build_request(
    source: &dyn RequestSource,
    request_id: u64,
    fulfillment_base_url: &str,
) -> Result<ReconciliationRequest> {
    let precondition = |message: &str| Error::PreconditionFailed {
        request_id,
        message: message.to_string(),
    };

    let record = source
        .fetch(request_id)?
        .ok_or_else(|| precondition("request not found"))?;
    if !record.approved {
        return Err(precondition("request is not approved"));
    }
    if !record.funding_enabled {
        return Err(precondition("funding is not enabled for this request"));
    }
    if record.maintainer.trim().is_empty() {
        return Err(precondition("request has no maintainer handle"));
    }

    Ok(ReconciliationRequest {
        request_id,
        target_repository: record.repository,
        canonical_url: CanonicalUrl::new(fulfillment_base_url, request_id)?,
        requester_handle: record.maintainer,
    })
}

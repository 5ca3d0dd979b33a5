//! # Settings
//!
//! This module defines the deployment settings of the reconciler and the
//! logic for loading them from a YAML file.
//!
//! ## Format
//!
//! ```yaml
//! fulfillment_base_url: https://sponsors.example.org/fullfill
//! home_repository: https://github.com/example/requests
//! legacy_fulfillment_base_urls:
//!   - https://old.example.org/fullfill
//! fork_readiness:
//!   strategy: poll
//!   interval_ms: 1000
//!   attempts: 10
//! requests_file: requests.yaml
//! cache_refresh_url: https://sponsors.example.org/refresh/{id}
//! report_failures_as_issues: true
//! ```
//!
//! Only `fulfillment_base_url` and `home_repository` are required. Relative
//! paths are resolved against the directory holding the settings file.
//!
//! The API token is deliberately not part of this file; it comes from the
//! command line or the environment.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::content::ContentPolicy;
use crate::error::{Error, Result};
use crate::github::DEFAULT_API_BASE_URL;
use crate::locator::{parse_repository_url, RepoId};
use crate::phases::branch::DEFAULT_BRANCH_PREFIX;
use crate::phases::fork::ForkReadiness;

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_branch_prefix() -> String {
    DEFAULT_BRANCH_PREFIX.to_string()
}

fn default_user_agent() -> String {
    format!("funding-reconciler/{}", env!("CARGO_PKG_VERSION"))
}

/// Deployment settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Base URL of the hosting REST API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Canonical URLs are `<fulfillment_base_url>?issue=<id>`.
    pub fulfillment_base_url: String,

    /// Repository the requests were originally filed in. Issue links into it
    /// are migrated away, and failures are reported there.
    pub home_repository: String,

    /// Earlier fulfillment bases whose links are also replaced.
    #[serde(default)]
    pub legacy_fulfillment_base_urls: Vec<String>,

    #[serde(default)]
    pub fork_readiness: ForkReadiness,

    #[serde(default = "default_branch_prefix")]
    pub branch_prefix: String,

    /// GET after each successful run; `{id}` is replaced by the request id.
    #[serde(default)]
    pub cache_refresh_url: Option<String>,

    /// YAML registry of approved requests.
    #[serde(default)]
    pub requests_file: Option<PathBuf>,

    #[serde(default)]
    pub report_failures_as_issues: bool,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Settings {
    /// Parse and validate settings from YAML text.
    pub fn parse(text: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(text).map_err(|e| Error::Config {
            message: format!("invalid settings: {}", e),
            hint: Some(
                "`fulfillment_base_url` and `home_repository` are required".to_string(),
            ),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("cannot read settings file {}: {}", path.display(), e),
            hint: Some("Pass --config or set FUNDING_RECONCILER_CONFIG".to_string()),
        })?;
        let mut settings = Self::parse(&text)?;

        if let (Some(file), Some(dir)) = (settings.requests_file.as_mut(), path.parent()) {
            if file.is_relative() {
                *file = dir.join(&*file);
            }
        }
        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("api_base_url", &self.api_base_url),
            ("fulfillment_base_url", &self.fulfillment_base_url),
        ] {
            let url = Url::parse(value).map_err(|e| Error::Config {
                message: format!("`{}` is not a valid URL: {}", field, e),
                hint: None,
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(Error::Config {
                    message: format!("`{}` must be an http(s) URL", field),
                    hint: None,
                });
            }
        }

        parse_repository_url(&self.home_repository).map_err(|e| Error::Config {
            message: format!("`home_repository` is invalid: {}", e),
            hint: Some("Use https://github.com/<owner>/<name>".to_string()),
        })?;

        let prefix = &self.branch_prefix;
        if prefix.is_empty()
            || prefix.contains(char::is_whitespace)
            || prefix.contains("..")
            || prefix.starts_with('/')
        {
            return Err(Error::Config {
                message: format!("`branch_prefix` {:?} is not a valid ref prefix", prefix),
                hint: Some(format!("For example {:?}", DEFAULT_BRANCH_PREFIX)),
            });
        }

        if let ForkReadiness::Poll { attempts: 0, .. } = self.fork_readiness {
            return Err(Error::Config {
                message: "`fork_readiness.attempts` must be at least 1".to_string(),
                hint: None,
            });
        }
        Ok(())
    }

    /// Canonical form of the home repository URL, used for issue links.
    pub fn home_repository_url(&self) -> Result<String> {
        let id = self.home_repository_id()?;
        let host = Url::parse(self.home_repository.trim())
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "github.com".to_string());
        Ok(format!("https://{}/{}", host, id))
    }

    pub fn home_repository_id(&self) -> Result<RepoId> {
        parse_repository_url(&self.home_repository)
    }

    /// The obsolete link shapes for this deployment.
    pub fn content_policy(&self) -> Result<ContentPolicy> {
        ContentPolicy::for_deployment(
            &self.home_repository_url()?,
            &self.fulfillment_base_url,
            &self.legacy_fulfillment_base_urls,
        )
    }
}

//! Shared test utilities for integration and E2E tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_settings(settings::MINIMAL);
//!     fixture.command().arg("preview").arg("--request-id").arg("1");
//! }
//! ```

use assert_fs::prelude::*;
use std::env;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::github_token;
    #[allow(unused_imports)]
    pub use super::settings;
    pub use super::TestFixture;
}

/// Settings file snippets.
#[allow(dead_code)]
pub mod settings {
    /// Required fields only.
    pub const MINIMAL: &str = "\
fulfillment_base_url: https://x/fullfill
home_repository: https://github.com/org/repo
";

    /// A deployment that moved from an older fulfillment host.
    pub const WITH_LEGACY: &str = "\
fulfillment_base_url: https://x/fullfill
home_repository: https://github.com/org/repo
legacy_fulfillment_base_urls:
  - https://old.example/fulfill
branch_prefix: sponsor/
";

    /// Registry with one approved request.
    pub const REQUESTS: &str = "\
requests:
  42:
    maintainer: octocat
    repository: https://github.com/acme/widgets
    approved: true
    funding_enabled: true
";

    /// Invalid YAML for error testing.
    pub const INVALID_YAML: &str = "fulfillment_base_url: [unclosed";
}

/// Token for live API tests, if one is available.
#[allow(dead_code)]
pub fn github_token() -> Option<String> {
    env::var("GITHUB_TOKEN").ok().filter(|t| !t.trim().is_empty())
}

/// A temporary directory holding a settings file and related files.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Write `config.yaml` with the given content.
    pub fn with_settings(self, content: &str) -> Self {
        self.with_file("config.yaml", content)
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn settings_path(&self) -> PathBuf {
        self.temp_dir.path().join("config.yaml")
    }

    #[allow(dead_code)]
    pub fn child_path(&self, path: &str) -> PathBuf {
        self.temp_dir.path().join(path)
    }

    /// The binary, run from the fixture directory with a clean environment
    /// for the variables it reads.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("funding-reconciler");
        cmd.current_dir(self.path())
            .env_remove("FUNDING_RECONCILER_CONFIG")
            .env_remove("GITHUB_TOKEN")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

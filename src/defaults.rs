//! Default locations for funding-reconciler files.

use std::path::PathBuf;

/// Returns the default settings file path.
///
/// Uses the platform-appropriate configuration directory:
/// - Linux: `~/.config/funding-reconciler/config.yaml` (XDG Base Directory)
/// - macOS: `~/Library/Application Support/funding-reconciler/config.yaml`
/// - Windows: `{FOLDERID_RoamingAppData}\funding-reconciler\config.yaml`
///
/// Falls back to `.funding-reconciler/config.yaml` in the current directory
/// if the platform directory cannot be determined.
///
/// This can be overridden by the `--config` CLI flag or the
/// `FUNDING_RECONCILER_CONFIG` environment variable.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("funding-reconciler"))
        .unwrap_or_else(|| PathBuf::from(".funding-reconciler"))
        .join("config.yaml")
}

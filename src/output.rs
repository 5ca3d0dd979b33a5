//! # Output Configuration
//!
//! Controls how outcomes are printed: colors and emoji markers follow the
//! terminal's capabilities and the user's preferences.
//!
//! ## Respecting User Preferences
//!
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals

use std::env;

use console::style;

use crate::phases::Outcome;

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// `color_flag` is the value of `--color`: "always", "never", or "auto".
    /// In auto mode colors are disabled by `NO_COLOR`, `CLICOLOR=0`,
    /// `TERM=dumb`, or a non-TTY stdout (unless `CLICOLOR_FORCE=1`).
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // Presence alone disables colors, even if empty.
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }

        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }

        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }

        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stdout().features().colors_supported()
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Returns `emoji_str` when colors are enabled, `plain` otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// One human-readable line describing an outcome.
pub fn format_outcome(config: &OutputConfig, outcome: &Outcome) -> String {
    let (marker, plain) = match outcome {
        Outcome::Created { .. } => ("✅", "[CREATED]"),
        Outcome::AlreadySatisfied { .. } => ("👌", "[OK]"),
        Outcome::Skipped { .. } => ("⏭️", "[SKIPPED]"),
        Outcome::Failed { .. } => ("❌", "[FAILED]"),
    };
    let marker = emoji(config, marker, plain);
    let text = outcome.to_string();

    if !config.use_color {
        return format!("{} {}", marker, text);
    }
    let text = match outcome {
        Outcome::Created { .. } => style(text).green().to_string(),
        Outcome::AlreadySatisfied { .. } => style(text).cyan().to_string(),
        Outcome::Skipped { .. } => style(text).yellow().to_string(),
        Outcome::Failed { .. } => style(text).red().bold().to_string(),
    };
    format!("{} {}", marker, text)
}

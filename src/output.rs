//! # Output Configuration
//!
//! Controls how the CLI presents results: whether colors and emoji are used,
//! and how package states and sync outcomes are rendered.
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

use crate::sync::SyncOutcome;

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and the `--color`
    /// flag (`always`, `never`, or `auto`).
    ///
    /// In auto mode, colors are disabled if `NO_COLOR` is set, `CLICOLOR=0`,
    /// `TERM=dumb`, or stdout is not a TTY (unless `CLICOLOR_FORCE=1`).
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };
        console::set_colors_enabled(use_color);
        Self { use_color }
    }

    fn detect_color_support() -> bool {
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

/// Returns the emoji when colors are enabled, the plain text otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// Render a package state word (see `PackageReport::state`).
pub fn state(config: &OutputConfig, state: &str) -> String {
    if !config.use_color {
        return state.to_string();
    }
    let styled = match state {
        "loaded" => style(state).green(),
        "configured" | "installed" => style(state).cyan(),
        "missing" => style(state).yellow(),
        "error" => style(state).red().bold(),
        _ => style(state).dim(),
    };
    styled.to_string()
}

/// One line describing a sync outcome.
pub fn outcome_line(config: &OutputConfig, id: &str, outcome: &SyncOutcome) -> String {
    let marker = match outcome {
        SyncOutcome::Installed { .. } => emoji(config, "📦", "[NEW]"),
        SyncOutcome::Updated { .. } => emoji(config, "⬆️ ", "[UPD]"),
        SyncOutcome::Skipped { .. } => emoji(config, "✅", "[OK]"),
        SyncOutcome::Pinned => emoji(config, "📌", "[PIN]"),
        SyncOutcome::Disabled => emoji(config, "💤", "[OFF]"),
        SyncOutcome::Failed { .. } => emoji(config, "❌", "[ERR]"),
    };
    let detail = match outcome {
        SyncOutcome::Installed {
            revision: Some(rev),
        } => format!("installed at {}", rev),
        SyncOutcome::Updated { from, to } => format!("updated {}..{}", from, to),
        SyncOutcome::Failed { stage, error } => format!("{} failed: {}", stage, error),
        other => other.label().to_string(),
    };
    format!("{} {} {}", marker, id, detail)
}

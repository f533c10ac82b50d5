//! Default values for packsync configuration.
//!
//! Centralized so the library and the commands agree on them.

use std::path::PathBuf;

/// Returns the default base directory for package clones.
///
/// Uses the platform data directory:
/// - Linux: `~/.local/share/packsync` (XDG Base Directory)
/// - macOS: `~/Library/Application Support/packsync`
/// - Windows: `{FOLDERID_RoamingAppData}\packsync`
///
/// Falls back to `.packsync` in the current directory if the platform data
/// directory cannot be determined.
///
/// This can be overridden by `base_dir` in the configuration file, the
/// `--base-dir` CLI flag, or the `PACKSYNC_HOME` environment variable.
pub fn default_base_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("packsync"))
        .unwrap_or_else(|| PathBuf::from(".packsync"))
}

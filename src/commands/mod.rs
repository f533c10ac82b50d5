//! # CLI Command Implementations
//!
//! One module per subcommand of the `packsync` tool. Each module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic by calling into the `packsync` library.
//!
//! Arguments shared by every command that reads the configuration live in
//! [`ConfigArgs`] and are flattened into each `Args` struct.

pub mod clean;
pub mod completions;
pub mod install;
pub mod path;
pub mod status;
pub mod sync;
pub mod tree;
pub mod validate;

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use packsync::config::{self, Config, DEFAULT_CONFIG_FILE};
use packsync::manager::Manager;
use packsync::suggestions;

/// Where to find the configuration and the package clones.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Path to the packsync.yaml configuration file.
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "PACKSYNC_CONFIG",
        default_value = DEFAULT_CONFIG_FILE
    )]
    pub config: PathBuf,

    /// Directory holding the package clones.
    ///
    /// Overrides `base_dir` from the configuration file. Defaults to the
    /// platform data directory (e.g. `~/.local/share/packsync` on Linux).
    #[arg(long, value_name = "DIR", env = "PACKSYNC_HOME")]
    pub base_dir: Option<PathBuf>,
}

impl ConfigArgs {
    /// Read the configuration file and apply command-line overrides.
    pub fn load(&self) -> Result<Config> {
        if !self.config.exists() {
            return Err(suggestions::config_not_found(&self.config));
        }
        let mut config = config::from_file(&self.config).map_err(suggestions::explain)?;
        if let Some(base_dir) = &self.base_dir {
            config.settings.base_dir = base_dir.clone();
        }
        log::debug!(
            "Loaded {} entries from {}, base dir {}",
            config.entries.len(),
            self.config.display(),
            config.settings.base_dir.display()
        );
        Ok(config)
    }

    /// Load the configuration and build a manager from it.
    pub fn manager(&self) -> Result<Manager> {
        let config = self.load()?;
        Manager::from_config(config).map_err(suggestions::explain)
    }
}

/// The single-threaded runtime every async command runs on.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
}

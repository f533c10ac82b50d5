//! # Path Command Implementation
//!
//! Configures and loads the installed packages, then prints the runtime
//! path: the clone directories in the order they were activated. Nothing is
//! fetched; missing packages are skipped along with their dependents.
//!
//! ```bash
//! export MY_TOOL_PATH="$(packsync path)"
//! ```

use anyhow::Result;
use clap::Args;

use super::ConfigArgs;

/// Initialize installed packages and print the runtime path
#[derive(Args, Debug)]
pub struct PathArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Print one directory per line instead of a joined path.
    #[arg(long)]
    pub lines: bool,
}

/// Execute the `path` command.
pub fn execute(args: PathArgs) -> Result<()> {
    let mut manager = args.config.manager()?;
    let rt = super::runtime()?;
    rt.block_on(manager.refresh_exists());

    let configured = manager.configure();
    let loaded = manager.load();
    if !configured || !loaded {
        log::warn!("Some packages were not initialized");
    }

    let entries = manager.activator().entries();
    if args.lines {
        for entry in entries {
            println!("{}", entry.display());
        }
    } else {
        let joined = std::env::join_paths(entries)?;
        println!("{}", joined.to_string_lossy());
    }
    Ok(())
}

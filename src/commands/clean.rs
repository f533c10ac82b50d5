//! # Clean Command Implementation
//!
//! Removes every entry of the base directory that no declared package
//! claims. With `--dry-run` the stale entries are only listed.

use anyhow::Result;
use clap::Args;

use packsync::clean::{known_names, stale_entries};
use packsync::filesystem::{DefaultFileOperations, FileOperations};
use packsync::output::{emoji, OutputConfig};

use super::ConfigArgs;

/// Remove clones of packages that are no longer declared
#[derive(Args, Debug)]
pub struct CleanArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// List what would be removed without deleting anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Execute the `clean` command.
pub fn execute(args: CleanArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let manager = args.config.manager()?;
    let rt = super::runtime()?;

    if args.dry_run {
        let entries = rt.block_on(DefaultFileOperations.list_entries(manager.base_dir()))?;
        let stale = stale_entries(entries, &known_names(manager.graph()));
        if stale.is_empty() {
            println!("{} Nothing to remove", emoji(&out, "✅", "[OK]"));
        }
        for name in stale {
            println!("   would remove {}", manager.base_dir().join(name).display());
        }
        return Ok(());
    }

    let report = rt
        .block_on(manager.clean())
        .ok_or_else(|| anyhow::anyhow!("Failed to list {}", manager.base_dir().display()))?;

    if report.removed.is_empty() && report.failed.is_empty() {
        println!("{} Nothing to remove", emoji(&out, "✅", "[OK]"));
    }
    for name in &report.removed {
        println!("{} Removed {}", emoji(&out, "🧹", "[DEL]"), name);
    }
    for (name, reason) in &report.failed {
        println!("{} Could not remove {}: {}", emoji(&out, "❌", "[ERR]"), name, reason);
    }

    if report.is_clean() {
        Ok(())
    } else {
        anyhow::bail!("{} entries could not be removed", report.failed.len())
    }
}

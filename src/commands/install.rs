//! # Install Command Implementation
//!
//! Like `sync`, but only clones packages that are missing. Packages already
//! on disk are left at their current revision and no fetch is made for them.

use anyhow::Result;
use clap::Args;

use packsync::sync::SyncMode;

use super::ConfigArgs;

/// Install missing packages without updating existing ones
#[derive(Args, Debug)]
pub struct InstallArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Only print failures and the final summary.
    #[arg(short, long)]
    pub quiet: bool,
}

/// Execute the `install` command.
pub fn execute(args: InstallArgs, color_flag: &str) -> Result<()> {
    super::sync::run(&args.config, SyncMode::Install, args.quiet, color_flag)
}

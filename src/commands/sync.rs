//! # Sync Command Implementation
//!
//! This module implements the `sync` subcommand: install missing packages,
//! update installed ones, remove stale clones, then configure and load
//! everything in dependency order.
//!
//! Every package is synced concurrently; the summary is printed once all of
//! them have finished.

use anyhow::Result;
use clap::Args;

use packsync::manager::SyncReport;
use packsync::output::{emoji, outcome_line, OutputConfig};
use packsync::suggestions;
use packsync::sync::SyncMode;

use super::ConfigArgs;

/// Install, update, and initialize every declared package
#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Only print failures and the final summary.
    #[arg(short, long)]
    pub quiet: bool,
}

/// Execute the `sync` command.
pub fn execute(args: SyncArgs, color_flag: &str) -> Result<()> {
    run(&args.config, SyncMode::Update, args.quiet, color_flag)
}

/// Shared by `sync` and `install`.
pub(crate) fn run(config: &ConfigArgs, mode: SyncMode, quiet: bool, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let mut manager = config.manager()?;

    println!(
        "{} Syncing {} packages into {}",
        emoji(&out, "🔄", "[SYNC]"),
        manager.graph().packages().count(),
        manager.base_dir().display()
    );

    let rt = super::runtime()?;
    let report = rt.block_on(async {
        manager.refresh_exists().await;
        manager.sync(mode).await
    });

    print_report(&out, &report, quiet);

    if report.failed() {
        let failures = report.count("failed")
            + report.clean.as_ref().map_or(1, |c| c.failed.len());
        return Err(suggestions::sync_failed(failures));
    }
    Ok(())
}

fn print_report(out: &OutputConfig, report: &SyncReport, quiet: bool) {
    for result in &report.results {
        if quiet && !result.outcome.is_failure() {
            continue;
        }
        println!("   {}", outcome_line(out, &result.id, &result.outcome));
    }

    if let Some(clean) = &report.clean {
        for name in &clean.removed {
            println!("   {} removed {}", emoji(out, "🧹", "[DEL]"), name);
        }
        for (name, reason) in &clean.failed {
            println!("   {} could not remove {}: {}", emoji(out, "❌", "[ERR]"), name, reason);
        }
    }

    if !report.configured || !report.loaded {
        println!(
            "{} Some packages did not finish initializing; see the log above",
            emoji(out, "⚠️", "[WARN]")
        );
    }

    println!(
        "{} {} installed, {} updated, {} up to date, {} failed",
        emoji(out, "📊", "[INFO]"),
        report.count("installed"),
        report.count("updated"),
        report.count("skipped"),
        report.count("failed"),
    );
}

//! # Status Command Implementation
//!
//! Shows every declared package with its on-disk state and checked-out
//! revision. Nothing is fetched and no hooks run.
//!
//! With `--json` the full per-package report, adjacency lists included, is
//! printed as a JSON array for other tools to consume.

use anyhow::Result;
use clap::Args;

use packsync::output::{emoji, state, OutputConfig};

use super::ConfigArgs;

/// Show the state of every declared package
#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Execute the `status` command.
pub fn execute(args: StatusArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let mut manager = args.config.manager()?;

    let rt = super::runtime()?;
    rt.block_on(async {
        manager.refresh_exists().await;
        manager.refresh_revisions().await;
    });

    let reports = manager.report();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    if reports.is_empty() {
        println!("{} No packages declared", emoji(&out, "📭", "[INFO]"));
        return Ok(());
    }

    let width = reports.iter().map(|r| r.id.len()).max().unwrap_or(0);
    for report in &reports {
        let mut line = format!(
            "{:<width$}  {:<10}  {}",
            report.id,
            state(&out, report.state()),
            report.revision.as_deref().unwrap_or("-"),
            width = width
        );
        if report.pin {
            line.push_str(&format!("  {}", emoji(&out, "📌", "(pinned)")));
        }
        if let Some(branch) = &report.branch {
            line.push_str(&format!("  @{}", branch));
        }
        println!("{}", line);
    }

    let missing = reports.iter().filter(|r| r.enabled && !r.exists).count();
    if missing > 0 {
        println!(
            "\n{} {} package(s) missing; run 'packsync install'",
            emoji(&out, "💡", "hint:"),
            missing
        );
    }
    Ok(())
}

//! # Validate Command Implementation
//!
//! Checks a configuration without touching the network or the base
//! directory:
//!
//! - **Parsing**: every field has the right type and no unknown keys.
//! - **Identities**: every package is named `namespace/name`.
//! - **Cycles**: the `requires`/`wants` relation has no cycle.
//!
//! A short summary of the declared packages is printed on success.

use anyhow::Result;
use clap::Args;

use packsync::output::{emoji, OutputConfig};

use super::ConfigArgs;

/// Validate a packsync.yaml configuration file
#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Execute the `validate` command.
pub fn execute(args: ValidateArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    println!(
        "{} Validating configuration: {}",
        emoji(&out, "🔍", "[SCAN]"),
        args.config.config.display()
    );

    let manager = match args.config.manager() {
        Ok(manager) => manager,
        Err(e) => {
            println!("{} Validation failed", emoji(&out, "❌", "[ERR]"));
            return Err(e);
        }
    };

    let graph = manager.graph();
    let total = graph.packages().count();
    let disabled = graph.packages().filter(|(_, p)| !p.enabled).count();
    let pinned = graph.packages().filter(|(_, p)| p.pin).count();
    let hooks: usize = graph.packages().map(|(_, p)| p.hooks.len()).sum();

    println!("{} Configuration is valid", emoji(&out, "✅", "[OK]"));
    println!("\n{} Summary:", emoji(&out, "📊", "[INFO]"));
    println!("   Packages: {}", total);
    println!("   Disabled: {}", disabled);
    println!("   Pinned:   {}", pinned);
    println!("   Hooks:    {}", hooks);
    println!("   Base dir: {}", manager.base_dir().display());
    Ok(())
}

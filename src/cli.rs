//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// packsync - keep git-hosted packages installed, updated, and initialized
#[derive(Parser, Debug)]
#[command(name = "packsync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install, update, clean, and initialize every declared package
    Sync(commands::sync::SyncArgs),

    /// Install missing packages without updating existing ones
    Install(commands::install::InstallArgs),

    /// Remove clones of packages that are no longer declared
    Clean(commands::clean::CleanArgs),

    /// Show the state of every declared package
    Status(commands::status::StatusArgs),

    /// Display the package dependency tree
    Tree(commands::tree::TreeArgs),

    /// Validate a packsync.yaml configuration file
    Validate(commands::validate::ValidateArgs),

    /// Initialize installed packages and print the runtime path
    Path(commands::path::PathArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        self.init_logging();

        let color = self.color.as_str();
        match self.command {
            Commands::Sync(args) => commands::sync::execute(args, color),
            Commands::Install(args) => commands::install::execute(args, color),
            Commands::Clean(args) => commands::clean::execute(args, color),
            Commands::Status(args) => commands::status::execute(args, color),
            Commands::Tree(args) => commands::tree::execute(args),
            Commands::Validate(args) => commands::validate::execute(args, color),
            Commands::Path(args) => commands::path::execute(args),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }

    fn init_logging(&self) {
        let env = env_logger::Env::default().default_filter_or(self.log_level.as_str());
        let style = match self.color.as_str() {
            "always" => env_logger::WriteStyle::Always,
            "never" => env_logger::WriteStyle::Never,
            _ => env_logger::WriteStyle::Auto,
        };
        // Tests may already have installed a logger.
        let _ = env_logger::Builder::from_env(env)
            .format_timestamp(None)
            .write_style(style)
            .try_init();
    }
}

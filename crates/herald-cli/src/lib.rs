//! Herald command-line interface.

pub mod commands;

use clap::{Parser, Subcommand};
use herald_core::{Config, ConfigError};
use std::path::Path;

/// Herald - multi-channel notification dispatch
#[derive(Parser)]
#[command(name = "herald")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to config file
    #[arg(short, long, env = "HERALD_CONFIG")]
    pub config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Send a notification
    Send(commands::send::SendArgs),

    /// Configuration management
    Config(commands::config::ConfigArgs),

    /// Show version information
    Version,
}

/// Load configuration from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => Config::load(path),
        None => Config::load_default(),
    }
}

/// Run the CLI with the given arguments.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Send(args) => {
            let config = load_config(cli.config.as_deref())?;
            config.validate()?;
            commands::send::run(args, config).await
        }
        Commands::Config(args) => commands::config::run(args, cli.config.as_deref()).await,
        Commands::Version => {
            println!("herald {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

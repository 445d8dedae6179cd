//! CLI module for the charge engine
//!
//! Command-line interface definitions and handlers.
//!
//! # Commands
//!
//! - `plugins list` - List registered charge plugins and their settings schema
//! - `config` - Configuration utilities (init, validate)
//! - `replay` - Dispatch a file of events into an in-memory ledger and audit it
//! - `completions` - Generate shell completions
//!
//! # Example
//!
//! ```bash
//! # Write a starter config
//! charge-engine config init
//!
//! # Replay events and print the resulting ledger
//! charge-engine replay --events events.json
//!
//! # Generate shell completions
//! charge-engine completions bash > ~/.bash_completion.d/charge-engine
//! ```

pub mod completions;
pub mod config;
pub mod output;
pub mod plugins;
pub mod replay;

pub use completions::handle_completions;
pub use config::{handle_config_init, handle_config_validate};

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Charge engine - reconciles ledger charges with domain events
#[derive(Parser, Debug)]
#[command(
    name = "charge-engine",
    version,
    about = "Plugin-driven charge reconciliation for worker and employer ledgers"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect charge plugins
    #[command(subcommand)]
    Plugins(PluginsCommands),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Replay events against an in-memory ledger
    Replay(ReplayArgs),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Subcommand, Debug)]
pub enum PluginsCommands {
    /// List registered plugins
    List(PluginsListArgs),
}

#[derive(Args, Debug)]
pub struct PluginsListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Initialize a new configuration file
    Init(ConfigInitArgs),
    /// Check a configuration file, including every plugin's settings
    Validate(ConfigValidateArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "charge-engine.toml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct ConfigValidateArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "charge-engine.toml")]
    pub config: PathBuf,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "charge-engine.toml")]
    pub config: PathBuf,

    /// JSON file holding an array of trigger events
    #[arg(short, long)]
    pub events: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "CHARGE_ENGINE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Override enabled capability flags (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub capabilities: Option<Vec<String>>,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_parse_plugins_list() {
        let cli = Cli::try_parse_from(["charge-engine", "plugins", "list", "--json"]).unwrap();
        match cli.command {
            Commands::Plugins(PluginsCommands::List(args)) => assert!(args.json),
            _ => panic!("Expected Plugins List command"),
        }
    }

    #[test]
    fn test_cli_parse_replay_defaults() {
        let cli =
            Cli::try_parse_from(["charge-engine", "replay", "--events", "events.json"]).unwrap();
        match cli.command {
            Commands::Replay(args) => {
                assert_eq!(args.config, PathBuf::from("charge-engine.toml"));
                assert_eq!(args.events, PathBuf::from("events.json"));
                assert!(!args.json);
                assert!(args.capabilities.is_none());
            }
            _ => panic!("Expected Replay command"),
        }
    }

    #[test]
    fn test_cli_parse_replay_capabilities() {
        let cli = Cli::try_parse_from([
            "charge-engine",
            "replay",
            "-e",
            "events.json",
            "--capabilities",
            "ledger,payroll",
        ])
        .unwrap();
        match cli.command {
            Commands::Replay(args) => assert_eq!(
                args.capabilities,
                Some(vec!["ledger".to_string(), "payroll".to_string()])
            ),
            _ => panic!("Expected Replay command"),
        }
    }

    #[test]
    fn test_cli_replay_requires_events() {
        assert!(Cli::try_parse_from(["charge-engine", "replay"]).is_err());
    }

    #[test]
    fn test_cli_parse_config_validate() {
        let cli =
            Cli::try_parse_from(["charge-engine", "config", "validate", "-c", "x.toml"]).unwrap();
        match cli.command {
            Commands::Config(ConfigCommands::Validate(args)) => {
                assert_eq!(args.config, PathBuf::from("x.toml"))
            }
            _ => panic!("Expected Config Validate command"),
        }
    }
}

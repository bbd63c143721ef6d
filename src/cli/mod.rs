//! CLI module for EdgePulse
//!
//! Command-line interface definitions and handlers.
//!
//! # Commands
//!
//! - `watch` - Follow the live event stream and keep the alert store current
//! - `fetch` - Fetch (or poll) a REST resource through the deduplicating cache
//! - `config` - Configuration utilities (init)
//! - `completions` - Generate shell completions
//!
//! # Example
//!
//! ```bash
//! # Follow alerts from a remote source
//! edgepulse watch --url wss://edge.example.com/ws
//!
//! # Poll metrics every 10 seconds
//! edgepulse fetch /api/metrics -q range=1h --interval-ms 10000
//!
//! # Generate shell completions
//! edgepulse completions bash > ~/.bash_completion.d/edgepulse
//! ```

pub mod completions;
pub mod config;
pub mod fetch;
pub mod output;
pub mod watch;

pub use completions::handle_completions;
pub use config::handle_config_init;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// EdgePulse - real-time sync client for edge fleet monitoring
#[derive(Parser, Debug)]
#[command(
    name = "edgepulse",
    version,
    about = "Live alert stream and deduplicated polling for edge-compute monitoring"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Follow the live event stream
    Watch(WatchArgs),
    /// Fetch a REST resource once or on an interval
    Fetch(FetchArgs),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "edgepulse.toml")]
    pub config: PathBuf,

    /// Override the event stream URL
    #[arg(short, long)]
    pub url: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Print the final alert state as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Resource path, relative to the API base URL (e.g. /api/alerts)
    pub resource: String,

    /// Query parameter, repeatable
    #[arg(short, long = "query", value_name = "KEY=VALUE", value_parser = crate::fetch::parse_query_pair)]
    pub query: Vec<(String, String)>,

    /// Explicit cache key instead of the derived signature
    #[arg(long)]
    pub cache_key: Option<String>,

    /// Keep polling at this interval until interrupted
    #[arg(short, long)]
    pub interval_ms: Option<u64>,

    /// Override the API base URL
    #[arg(long)]
    pub api_url: Option<String>,

    /// Path to configuration file
    #[arg(short, long, default_value = "edgepulse.toml")]
    pub config: PathBuf,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Initialize a new configuration file
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "edgepulse.toml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
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
    fn test_cli_parse_watch_defaults() {
        let cli = Cli::try_parse_from(["edgepulse", "watch"]).unwrap();
        match cli.command {
            Commands::Watch(args) => {
                assert_eq!(args.config, PathBuf::from("edgepulse.toml"));
                assert!(args.url.is_none());
                assert!(!args.json);
            }
            _ => panic!("Expected Watch command"),
        }
    }

    #[test]
    fn test_cli_parse_watch_with_url() {
        let cli =
            Cli::try_parse_from(["edgepulse", "watch", "-u", "wss://edge.example.com/ws"]).unwrap();
        match cli.command {
            Commands::Watch(args) => {
                assert_eq!(args.url.as_deref(), Some("wss://edge.example.com/ws"))
            }
            _ => panic!("Expected Watch command"),
        }
    }

    #[test]
    fn test_cli_parse_fetch_with_query() {
        let cli = Cli::try_parse_from([
            "edgepulse",
            "fetch",
            "/api/metrics",
            "-q",
            "range=1h",
            "--query",
            "pop=lax1",
            "--interval-ms",
            "10000",
        ])
        .unwrap();
        match cli.command {
            Commands::Fetch(args) => {
                assert_eq!(args.resource, "/api/metrics");
                assert_eq!(
                    args.query,
                    vec![
                        ("range".to_string(), "1h".to_string()),
                        ("pop".to_string(), "lax1".to_string())
                    ]
                );
                assert_eq!(args.interval_ms, Some(10_000));
            }
            _ => panic!("Expected Fetch command"),
        }
    }

    #[test]
    fn test_cli_parse_fetch_rejects_bad_query() {
        let result = Cli::try_parse_from(["edgepulse", "fetch", "/api/metrics", "-q", "range"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_config_init() {
        let cli = Cli::try_parse_from(["edgepulse", "config", "init", "--force"]).unwrap();
        match cli.command {
            Commands::Config(ConfigCommands::Init(args)) => assert!(args.force),
            _ => panic!("Expected Config Init command"),
        }
    }

    #[test]
    fn test_cli_parse_completions() {
        let cli = Cli::try_parse_from(["edgepulse", "completions", "zsh"]).unwrap();
        assert!(matches!(cli.command, Commands::Completions(_)));
    }
}

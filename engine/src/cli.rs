//! CLI interface for Mindloop
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags for running the agent loop and
//! inspecting its policy engine and schedule.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Mindloop autonomous agent
///
/// Runs an agent through a daily schedule of phases, generating goals,
/// making decisions and firing behaviors, with every action vetted by a
/// policy engine before it is executed.
#[derive(Parser, Debug)]
#[command(name = "mindloop")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the autonomous loop
    Run {
        /// Run this many ticks back to back and exit instead of running
        /// until interrupted
        #[arg(long, value_name = "N")]
        ticks: Option<u64>,
    },

    /// Evaluate a single action against the policy engine
    Evaluate {
        /// Action verb, e.g. "read_article"
        verb: String,

        /// Action category (communication, learning, cognitive, creative,
        /// social, exploration, maintenance)
        #[arg(long, default_value = "learning")]
        category: String,

        /// Override the target executor
        #[arg(long)]
        executor: Option<String>,

        /// Action parameters as a JSON object
        #[arg(long, value_name = "JSON")]
        params: Option<String>,
    },

    /// Show the daily phase schedule
    Phases,

    /// List the built-in behaviors
    Behaviors,

    /// Validate configuration and show the effective settings
    Doctor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_evaluate() {
        let cli = Cli::parse_from([
            "mindloop",
            "--json",
            "evaluate",
            "send_greeting",
            "--category",
            "communication",
            "--params",
            r#"{"consent":false}"#,
        ]);
        assert!(cli.json);
        match cli.command {
            Command::Evaluate {
                verb,
                category,
                params,
                executor,
            } => {
                assert_eq!(verb, "send_greeting");
                assert_eq!(category, "communication");
                assert_eq!(params.as_deref(), Some(r#"{"consent":false}"#));
                assert!(executor.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_run_with_ticks() {
        let cli = Cli::parse_from(["mindloop", "run", "--ticks", "5"]);
        assert!(matches!(cli.command, Command::Run { ticks: Some(5) }));
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["mindloop", "phases", "--config", "/tmp/mindloop.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/mindloop.toml")));
    }
}

// Mindloop autonomous agent
// Main entry point for the mindloop binary

use clap::Parser;
use mindloop_engine::cli::{Cli, Command};
use mindloop_engine::config::Config;
use mindloop_engine::handlers::{
    handle_behaviors, handle_doctor, handle_evaluate, handle_phases, handle_run, OutputFormat,
};
use mindloop_engine::telemetry::init_telemetry_with_level;
use sdk::errors::AgentErrorExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Load configuration (or use custom path if provided)
    let loaded = match &cli.config {
        Some(config_path) => Config::load_from_path(config_path),
        None => Config::load_or_default(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Hint: {}", e.user_hint());
            std::process::exit(1);
        }
    };

    // --log overrides the configured level; RUST_LOG overrides both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    tracing::info!("Mindloop v{}", env!("CARGO_PKG_VERSION"));

    // Handle commands
    match cli.command {
        Command::Run { ticks } => handle_run(&config, ticks, format).await,

        Command::Evaluate {
            verb,
            category,
            executor,
            params,
        } => {
            let evaluation = handle_evaluate(&config, &verb, &category, executor, params, format)?;
            if !evaluation.allowed {
                std::process::exit(2);
            }
            Ok(())
        }

        Command::Phases => handle_phases(format),

        Command::Behaviors => handle_behaviors(format),

        Command::Doctor => handle_doctor(&config, cli.config.as_deref(), format),
    }
}

//! Telemetry and Observability
//!
//! Sets up `tracing-subscriber` for structured logging of the control loop
//! and the policy engine. Supports config-driven log levels, `RUST_LOG`
//! overrides, and switching between pretty and JSON output.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Pretty in debug builds, JSON in release builds
    #[default]
    Auto,
    Pretty,
    Json,
}

impl LogFormat {
    fn use_json(self) -> bool {
        match self {
            LogFormat::Auto => !cfg!(debug_assertions),
            LogFormat::Pretty => false,
            LogFormat::Json => true,
        }
    }
}

/// Build the filter for a configured level.
///
/// Priority: `RUST_LOG` env var > `log_level` parameter > default "info"
fn env_filter(log_level: &str) -> EnvFilter {
    let default_filter = format!("{},mindloop_engine={}", log_level, log_level);
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the tracing subscriber with a log level and output format.
///
/// Calling this more than once is a no-op; the first subscriber wins.
pub fn init_telemetry_with_format(log_level: &str, format: LogFormat) {
    let filter = env_filter(log_level);

    if format.use_json() {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_current_span(true))
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty().with_target(false))
            .try_init()
            .ok();
    }
}

/// Initialize the tracing subscriber with the given log level from config.
///
/// In debug builds: pretty-printed terminal output.
/// In release builds: JSON structured output with spans.
pub fn init_telemetry_with_level(log_level: &str) {
    init_telemetry_with_format(log_level, LogFormat::Auto);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_formats() {
        assert!(LogFormat::Json.use_json());
        assert!(!LogFormat::Pretty.use_json());
    }

    #[test]
    fn test_reinit_is_noop() {
        init_telemetry_with_level("debug");
        init_telemetry_with_level("info");
    }
}

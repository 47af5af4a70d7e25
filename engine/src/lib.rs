//! Mindloop Engine Library
//!
//! This library provides the core functionality of the Mindloop engine.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Time source shared by every time-dependent component
pub mod clock;

/// Sliding-window action rate limiting
pub mod rate_limiter;

/// Dangerous-pattern detection over action text
pub mod pattern_detector;

/// Safety pre-checks (rate limit, prohibited and approval-gated actions)
pub mod safety;

/// Policy and ethics engine
pub mod ethics;

/// Message bus for inter-component communication
pub mod message_bus;

/// Action executor registry
pub mod executors;

/// Built-in human interaction channel
pub mod interaction;

/// Autonomous control loop
pub mod autonomy;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;

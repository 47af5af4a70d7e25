//! Error types and handling
//!
//! This module provides the error types used throughout the Mindloop engine.
//! All errors implement the `AgentErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! Policy denials are *not* errors: a blocked action is reported through an
//! evaluation with `allowed = false`. `PolicyEvaluation` is reserved for the
//! case where the evaluation pipeline itself could not run, and callers must
//! treat it as a deny.

use std::any::Any;
use thiserror::Error;

/// Trait for Mindloop error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information. All engine errors implement this trait.
pub trait AgentErrorExt {
    /// Returns a user-friendly hint for the error
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors are logged and the loop continues with the next
    /// action, behavior or tick. Non-recoverable errors require operator
    /// intervention (usually a configuration fix and restart).
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration, unknown phases
/// - **Policy**: Malformed rules or patterns, evaluation pipeline failures
/// - **Execution**: Executor lookup and dispatch failures
/// - **Behavior**: Failures inside a behavior's action factory
/// - **Lifecycle**: Concurrency limits and shutdown timeouts
///
/// # Examples
///
/// ```
/// use sdk::errors::{AgentErrorExt, EngineError};
///
/// let error = EngineError::ExecutorNotFound("learning".to_string());
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let fatal = EngineError::Config("tick_interval_ms must be > 0".to_string());
/// assert!(!fatal.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown phase: {0}")]
    UnknownPhase(String),

    // Policy errors
    #[error("Invalid constraint rule: {0}")]
    InvalidRule(String),

    #[error("Invalid dangerous pattern '{name}': {reason}")]
    InvalidPattern { name: String, reason: String },

    #[error("Policy evaluation failed: {0}")]
    PolicyEvaluation(String),

    // Execution errors
    #[error("No executor registered for '{0}'")]
    ExecutorNotFound(String),

    #[error("Executor error: {0}")]
    Executor(String),

    #[error("Concurrency limit reached: {active}/{limit} actions active")]
    ConcurrencyLimit { active: usize, limit: usize },

    // Behavior errors
    #[error("Behavior '{id}' failed: {reason}")]
    Behavior { id: String, reason: String },

    // Interaction channel errors
    #[error("Interaction channel error: {0}")]
    Interaction(String),

    // Lifecycle errors
    #[error("Shutdown timed out with {0} actions still active")]
    ShutdownTimeout(usize),

    /// A collaborator panicked and the panic was caught at a loop boundary
    #[error("Panicked: {0}")]
    Panicked(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Build a `Panicked` error from a caught panic payload
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self::Panicked(message)
    }
}

impl AgentErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::UnknownPhase(_) => "The schedule references a phase that does not exist",

            Self::InvalidRule(_) => "A constraint rule in the ethics section is malformed",
            Self::InvalidPattern { .. } => "A dangerous pattern in the ethics section is malformed",
            Self::PolicyEvaluation(_) => "The action was blocked because it could not be vetted",

            Self::ExecutorNotFound(_) => "No executor handles this kind of action",
            Self::Executor(_) => "Action execution failed. Check executor logs",
            Self::ConcurrencyLimit { .. } => "Too many actions in flight. Try again shortly",

            Self::Behavior { .. } => "A behavior failed to produce actions",

            Self::Interaction(_) => "Failed to deliver the message to the interaction channel",

            Self::ShutdownTimeout(_) => "Some actions were still running at shutdown",
            Self::Panicked(_) => "An internal component crashed. The agent kept running",

            Self::Serialization(_) => "Failed to serialize agent data",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Non-recoverable errors
            Self::Config(_)
            | Self::UnknownPhase(_)
            | Self::InvalidRule(_)
            | Self::InvalidPattern { .. } => false,

            // All other errors are potentially recoverable
            _ => true,
        }
    }
}

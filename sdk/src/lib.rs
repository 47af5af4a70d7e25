//! Mindloop SDK
//!
//! Shared library providing the data model, collaborator traits and error
//! types used by the engine and by external executors or channels.

/// Interaction channel trait
pub mod channel;

/// Error types and handling
pub mod errors;

/// Action executor trait
pub mod executor;

/// Agent, action, goal and interaction types
pub mod types;

// Re-export commonly used types
pub use channel::{InteractionChannel, InterruptionHandler};
pub use errors::{AgentErrorExt, EngineError};
pub use executor::ActionExecutor;
pub use types::{
    Action, ActionCategory, ActionStatus, AgentProfile, DecisionContext, ExecutionResult, Goal, GoalType,
    InteractionEvent, InteractionKind, Params,
};

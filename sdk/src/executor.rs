//! Action executor trait
//!
//! Executors perform an approved action's effect (send a message, fetch a
//! document, run a tool). The engine resolves an executor by the action's
//! `target_executor` field and is otherwise unaware of what it does.

use async_trait::async_trait;

use crate::errors::EngineError;
use crate::types::{Action, ExecutionResult};

/// Trait that all action executors must implement
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Returns the name actions use to target this executor
    fn name(&self) -> &str;

    /// Perform the action
    ///
    /// Returning `Ok` with `success = false` and returning `Err` both mark
    /// the action as failed; an `Err` is additionally logged as an executor
    /// failure.
    async fn execute(&self, action: &Action) -> Result<ExecutionResult, EngineError>;
}

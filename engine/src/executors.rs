//! Action executor registry
//!
//! Resolves an action's `target_executor` to a registered
//! [`ActionExecutor`]. The engine ships a [`LoggingExecutor`] that only
//! records what it was asked to do, which is what the binary registers for
//! every built-in executor name.

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use sdk::errors::EngineError;
use sdk::executor::ActionExecutor;
use sdk::types::{Action, ExecutionResult};

/// Executor names the built-in action categories route to
pub const BUILTIN_EXECUTORS: [&str; 4] = ["communication", "learning", "cognition", "tool"];

#[derive(Default)]
pub struct ExecutorRegistry {
    executors: HashMap<String, Arc<dyn ActionExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with a `LoggingExecutor` under every built-in name
    pub fn with_logging_defaults() -> Self {
        let mut registry = Self::new();
        for name in BUILTIN_EXECUTORS {
            registry.register(Arc::new(LoggingExecutor::new(name)));
        }
        registry
    }

    /// Register an executor under its own name, replacing any previous one
    pub fn register(&mut self, executor: Arc<dyn ActionExecutor>) {
        let name = executor.name().to_string();
        debug!("Registered executor '{}'", name);
        self.executors.insert(name, executor);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ActionExecutor>> {
        self.executors.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.executors.keys().cloned().collect();
        names.sort();
        names
    }

    /// Dispatch an action to its target executor
    ///
    /// # Errors
    ///
    /// Returns `ExecutorNotFound` if nothing is registered under the
    /// action's `target_executor`, otherwise whatever the executor returns.
    pub async fn dispatch(&self, action: &Action) -> Result<ExecutionResult, EngineError> {
        let executor = self
            .get(&action.target_executor)
            .ok_or_else(|| EngineError::ExecutorNotFound(action.target_executor.clone()))?;
        executor.execute(action).await
    }
}

/// Executor that logs the action and reports success
pub struct LoggingExecutor {
    name: String,
    executed: AtomicU64,
}

impl LoggingExecutor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            executed: AtomicU64::new(0),
        }
    }

    pub fn executed(&self) -> u64 {
        self.executed.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ActionExecutor for LoggingExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, action: &Action) -> Result<ExecutionResult, EngineError> {
        let count = self.executed.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            "[{}] {} ({} params)",
            self.name,
            action.verb,
            action.params.len()
        );
        Ok(ExecutionResult::success(json!({
            "executor": self.name,
            "verb": action.verb,
            "count": count,
        })))
    }
}

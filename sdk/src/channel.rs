//! Interaction channel trait
//!
//! The interaction channel delivers human messages to the agent and the
//! agent's replies back to humans. The control loop registers an
//! interruption callback with the channel so that incoming messages are
//! queued and handled at the next opportunity that the current phase allows.

use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::EngineError;
use crate::types::{InteractionEvent, InteractionKind};

/// Callback invoked by a channel when a human interrupts the agent
pub type InterruptionHandler = Arc<dyn Fn(InteractionEvent) + Send + Sync>;

/// Trait for the human interaction channel
#[async_trait]
pub trait InteractionChannel: Send + Sync {
    /// Start accepting interactions
    async fn start(&self) -> Result<(), EngineError>;

    /// Stop accepting interactions
    async fn stop(&self) -> Result<(), EngineError>;

    /// Register a handler that is called for every incoming interruption
    ///
    /// `tag` identifies the registrant (a phase name or a subsystem tag).
    fn register_interruption_callback(&self, tag: &str, handler: InterruptionHandler);

    /// Process an interaction and return the response text
    async fn process_interaction(
        &self,
        human_id: &str,
        content: &str,
        kind: InteractionKind,
    ) -> Result<String, EngineError>;

    /// Channel-specific metrics
    fn interaction_stats(&self) -> serde_json::Value;
}

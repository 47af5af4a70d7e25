//! Logging interaction channel
//!
//! A minimal [`InteractionChannel`] that acknowledges every interaction and
//! keeps counters. Incoming events are delivered with
//! [`LoggingChannel::deliver`], which forwards them to every registered
//! interruption handler.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

use sdk::channel::{InteractionChannel, InterruptionHandler};
use sdk::errors::EngineError;
use sdk::types::{InteractionEvent, InteractionKind};

#[derive(Default)]
pub struct LoggingChannel {
    running: AtomicBool,
    handlers: RwLock<BTreeMap<String, InterruptionHandler>>,
    processed: Mutex<BTreeMap<String, u64>>,
}

impl LoggingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Hand an incoming event to every registered interruption handler
    ///
    /// Returns the number of handlers that received it.
    pub fn deliver(&self, event: InteractionEvent) -> usize {
        let handlers: Vec<InterruptionHandler> = self.handlers.read().values().cloned().collect();
        debug!(
            "Delivering interaction from {} to {} handler(s)",
            event.human_id,
            handlers.len()
        );
        for handler in &handlers {
            handler(event.clone());
        }
        handlers.len()
    }

    fn kind_key(kind: InteractionKind) -> &'static str {
        match kind {
            InteractionKind::Message => "message",
            InteractionKind::Question => "question",
            InteractionKind::Command => "command",
            InteractionKind::Emergency => "emergency",
        }
    }
}

#[async_trait]
impl InteractionChannel for LoggingChannel {
    async fn start(&self) -> Result<(), EngineError> {
        self.running.store(true, Ordering::SeqCst);
        info!("Interaction channel started");
        Ok(())
    }

    async fn stop(&self) -> Result<(), EngineError> {
        self.running.store(false, Ordering::SeqCst);
        info!("Interaction channel stopped");
        Ok(())
    }

    fn register_interruption_callback(&self, tag: &str, handler: InterruptionHandler) {
        self.handlers.write().insert(tag.to_string(), handler);
    }

    async fn process_interaction(
        &self,
        human_id: &str,
        content: &str,
        kind: InteractionKind,
    ) -> Result<String, EngineError> {
        if content.trim().is_empty() {
            return Err(EngineError::Interaction(format!(
                "empty {} from {}",
                Self::kind_key(kind),
                human_id
            )));
        }

        *self
            .processed
            .lock()
            .entry(Self::kind_key(kind).to_string())
            .or_insert(0) += 1;

        info!("Interaction from {} ({}): {}", human_id, Self::kind_key(kind), content);
        Ok(format!("Acknowledged {} from {}", Self::kind_key(kind), human_id))
    }

    fn interaction_stats(&self) -> serde_json::Value {
        let processed = self.processed.lock().clone();
        let total: u64 = processed.values().sum();
        json!({
            "running": self.is_running(),
            "handlers": self.handlers.read().len(),
            "processed": processed,
            "total": total,
        })
    }
}

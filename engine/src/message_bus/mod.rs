//! Message Bus for loop notifications
//!
//! The MessageBus provides a pub/sub pattern so observers (the CLI, tests,
//! embedding applications) can follow what the control loop and the policy
//! engine do without being coupled to them. It uses bounded channels to
//! prevent unbounded memory growth and supports both specific event
//! subscriptions and global "All" subscriptions.
//!
//! Delivery is fire-and-forget: `publish` never waits for a slow subscriber
//! and never reports failure to the publisher. A full or closed subscriber
//! channel simply misses the event.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use sdk::types::{Action, ExecutionResult, Goal, InteractionEvent};

use crate::ethics::EthicalEvaluation;

/// Channel buffer size for bounded channels
const CHANNEL_BUFFER_SIZE: usize = 100;

/// Event types that can be published on the message bus
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// The current phase changed
    PhaseChange,
    /// A human interaction was handled (or failed to be)
    HumanInteraction,
    /// An approved action finished executing
    ActionCompleted,
    /// The policy engine denied an action
    EthicsViolation,
    /// An emergent goal was generated
    GoalGenerated,
    /// A behavior fired
    BehaviorTriggered,
    /// The control loop started
    LoopStarted,
    /// The control loop stopped
    LoopStopped,
    /// Subscribe to all event types
    All,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::PhaseChange => "phase_change",
            EventType::HumanInteraction => "human_interaction",
            EventType::ActionCompleted => "action_completed",
            EventType::EthicsViolation => "ethics_violation",
            EventType::GoalGenerated => "goal_generated",
            EventType::BehaviorTriggered => "behavior_triggered",
            EventType::LoopStarted => "loop_started",
            EventType::LoopStopped => "loop_stopped",
            EventType::All => "all",
        }
    }
}

/// Events that can be published on the message bus
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    PhaseChange {
        phase: String,
        activities: Vec<String>,
    },
    HumanInteraction {
        event: InteractionEvent,
        handled: bool,
        response: Option<String>,
    },
    ActionCompleted {
        action: Action,
        result: ExecutionResult,
    },
    EthicsViolation {
        action: Action,
        evaluation: EthicalEvaluation,
    },
    GoalGenerated {
        goal: Goal,
    },
    BehaviorTriggered {
        behavior_id: String,
        actions: usize,
    },
    LoopStarted {
        agent_id: String,
    },
    LoopStopped {
        agent_id: String,
    },
}

impl Event {
    /// Get the event type for this event
    pub fn event_type(&self) -> EventType {
        match self {
            Event::PhaseChange { .. } => EventType::PhaseChange,
            Event::HumanInteraction { .. } => EventType::HumanInteraction,
            Event::ActionCompleted { .. } => EventType::ActionCompleted,
            Event::EthicsViolation { .. } => EventType::EthicsViolation,
            Event::GoalGenerated { .. } => EventType::GoalGenerated,
            Event::BehaviorTriggered { .. } => EventType::BehaviorTriggered,
            Event::LoopStarted { .. } => EventType::LoopStarted,
            Event::LoopStopped { .. } => EventType::LoopStopped,
        }
    }
}

/// An event together with its envelope
#[derive(Debug, Clone, Serialize)]
pub struct BusEvent {
    pub id: String,
    /// Component that published the event
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub event: Event,
}

impl BusEvent {
    pub fn new(source: impl Into<String>, event: Event) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source: source.into(),
            timestamp: Utc::now(),
            event,
        }
    }

    pub fn event_type(&self) -> EventType {
        self.event.event_type()
    }
}

/// Message bus for pub/sub notifications
pub struct MessageBus {
    /// Map of event types to lists of subscribers
    /// Each subscriber gets a bounded channel with CHANNEL_BUFFER_SIZE capacity
    channels: Arc<Mutex<HashMap<EventType, Vec<mpsc::Sender<BusEvent>>>>>,
}

impl MessageBus {
    /// Create a new MessageBus
    pub fn new() -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Subscribe to a specific event type, or `EventType::All`
    pub async fn subscribe(&self, event_type: EventType) -> mpsc::Receiver<BusEvent> {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let mut channels = self.channels.lock().await;
        channels.entry(event_type).or_default().push(tx);
        rx
    }

    /// Wrap `event` in an envelope from `source` and publish it
    pub async fn publish(&self, source: &str, event: Event) {
        self.publish_event(BusEvent::new(source, event)).await;
    }

    /// Publish an event to all subscribers
    ///
    /// The event is sent to all subscribers of the specific event type, as
    /// well as all subscribers of EventType::All. Closed subscribers are
    /// pruned.
    pub async fn publish_event(&self, event: BusEvent) {
        let mut channels = self.channels.lock().await;
        let event_type = event.event_type();

        for key in [event_type, EventType::All] {
            if let Some(subscribers) = channels.get_mut(&key) {
                subscribers.retain(|tx| match tx.try_send(event.clone()) {
                    Ok(()) => true,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        tracing::debug!("Subscriber channel full, dropping {} event", event_type.as_str());
                        true
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => false,
                });
            }
        }
    }

    /// Number of live subscribers for an event type
    pub async fn subscriber_count(&self, event_type: EventType) -> usize {
        let channels = self.channels.lock().await;
        channels.get(&event_type).map_or(0, |subs| subs.len())
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phase_event(phase: &str) -> Event {
        Event::PhaseChange {
            phase: phase.to_string(),
            activities: vec!["read".to_string()],
        }
    }

    #[tokio::test]
    async fn test_subscribe_and_publish() {
        let bus = MessageBus::new();
        let mut rx = bus.subscribe(EventType::PhaseChange).await;

        bus.publish("loop", phase_event("learning_session")).await;

        let received = rx.recv().await.unwrap();
        assert_eq!(received.source, "loop");
        match received.event {
            Event::PhaseChange { phase, activities } => {
                assert_eq!(phase, "learning_session");
                assert_eq!(activities, vec!["read".to_string()]);
            }
            _ => panic!("Wrong event type received"),
        }
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = MessageBus::new();
        let mut rx1 = bus.subscribe(EventType::LoopStarted).await;
        let mut rx2 = bus.subscribe(EventType::LoopStarted).await;

        bus.publish(
            "loop",
            Event::LoopStarted {
                agent_id: "a1".to_string(),
            },
        )
        .await;

        let received1 = rx1.recv().await.unwrap();
        let received2 = rx2.recv().await.unwrap();
        assert_eq!(received1.id, received2.id);
    }

    #[tokio::test]
    async fn test_all_event_type() {
        let bus = MessageBus::new();
        let mut rx_all = bus.subscribe(EventType::All).await;
        let mut rx_specific = bus.subscribe(EventType::PhaseChange).await;

        bus.publish("loop", phase_event("exploration")).await;

        assert_eq!(rx_all.recv().await.unwrap().event_type(), EventType::PhaseChange);
        assert_eq!(rx_specific.recv().await.unwrap().event_type(), EventType::PhaseChange);
    }

    #[tokio::test]
    async fn test_bounded_channel_never_blocks() {
        let bus = MessageBus::new();
        let mut rx = bus.subscribe(EventType::PhaseChange).await;

        for _ in 0..CHANNEL_BUFFER_SIZE + 10 {
            bus.publish("loop", phase_event("rest")).await;
        }

        let mut count = 0;
        while rx.try_recv().is_ok() {
            count += 1;
        }
        assert_eq!(count, CHANNEL_BUFFER_SIZE);
    }

    #[tokio::test]
    async fn test_closed_subscriber_pruned() {
        let bus = MessageBus::new();
        let rx = bus.subscribe(EventType::PhaseChange).await;
        drop(rx);

        bus.publish("loop", phase_event("rest")).await;
        assert_eq!(bus.subscriber_count(EventType::PhaseChange).await, 0);
    }

    #[tokio::test]
    async fn test_different_event_types() {
        let bus = MessageBus::new();
        let mut rx_started = bus.subscribe(EventType::LoopStarted).await;
        let mut rx_stopped = bus.subscribe(EventType::LoopStopped).await;

        bus.publish(
            "loop",
            Event::LoopStopped {
                agent_id: "a1".to_string(),
            },
        )
        .await;

        assert!(rx_started.try_recv().is_err());
        assert_eq!(rx_stopped.recv().await.unwrap().event_type(), EventType::LoopStopped);
    }
}

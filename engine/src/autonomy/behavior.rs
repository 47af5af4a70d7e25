//! Triggerable behaviors
//!
//! A behavior is a named, cooldown-limited generator of actions. Its trigger
//! is a closed set of kinds, each with typed parameters; the control loop
//! asks the registry which behaviors are due every tick and runs the actions
//! they produce through the same policy-gated path as its own decisions.

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use sdk::errors::EngineError;
use sdk::types::{Action, ActionCategory, Goal, Params};

use crate::message_bus::EventType;

const MINUTE_MS: i64 = 60_000;
const HOUR_MS: i64 = 60 * MINUTE_MS;

/// Named part of the day used by time triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindow {
    /// 06:00 - 09:00
    Morning,
    /// 12:00 - 18:00
    Afternoon,
    /// 18:00 - 22:00
    Evening,
    /// 22:00 - 06:00
    Night,
    /// Any hour in `[start, end)`, wrapping past midnight when `start > end`
    Hours { start: u32, end: u32 },
}

impl TimeWindow {
    pub fn contains(self, hour: u32) -> bool {
        let (start, end) = match self {
            TimeWindow::Morning => (6, 9),
            TimeWindow::Afternoon => (12, 18),
            TimeWindow::Evening => (18, 22),
            TimeWindow::Night => (22, 6),
            TimeWindow::Hours { start, end } => (start, end),
        };
        if start <= end {
            hour >= start && hour < end
        } else {
            hour >= start || hour < end
        }
    }
}

/// Current emotional state, set from outside the loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionState {
    pub emotion: String,
    /// 0.0 - 1.0
    pub intensity: f64,
}

/// What makes a behavior fire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// The local hour falls in a time window
    Time { window: TimeWindow },
    /// An event of this type was published during the current tick
    Event { event_type: EventType },
    /// Stochastic check with the given probability per tick
    State { probability: f64 },
    /// The current emotion matches with at least this intensity
    Emotion { emotion: String, min_intensity: f64 },
    /// The tick's curiosity score reaches the threshold
    Curiosity { threshold: f64 },
    /// Some incomplete goal has at least this priority
    Goal { min_priority: f64 },
}

/// Everything a trigger may look at
pub struct TriggerContext<'a> {
    pub hour: u32,
    pub phase: &'a str,
    pub published: &'a [EventType],
    pub curiosity: f64,
    pub emotion: Option<&'a EmotionState>,
    pub goals: &'a [Goal],
    /// Multiplier applied to state-trigger probabilities
    pub autonomy_level: f64,
}

impl Trigger {
    pub fn is_triggered<R: Rng>(&self, ctx: &TriggerContext<'_>, rng: &mut R) -> bool {
        match self {
            Trigger::Time { window } => window.contains(ctx.hour),
            Trigger::Event { event_type } => ctx.published.contains(event_type),
            Trigger::State { probability } => {
                let p = (probability * ctx.autonomy_level).clamp(0.0, 1.0);
                rng.gen::<f64>() < p
            }
            Trigger::Emotion {
                emotion,
                min_intensity,
            } => ctx
                .emotion
                .is_some_and(|e| e.emotion.eq_ignore_ascii_case(emotion) && e.intensity >= *min_intensity),
            Trigger::Curiosity { threshold } => ctx.curiosity >= *threshold,
            Trigger::Goal { min_priority } => ctx
                .goals
                .iter()
                .any(|g| !g.is_complete() && g.priority >= *min_priority),
        }
    }
}

/// Produces the actions of a behavior when it fires
pub type ActionFactory =
    Arc<dyn Fn(&TriggerContext<'_>) -> Result<Vec<Action>, EngineError> + Send + Sync>;

/// A registered behavior
#[derive(Clone)]
pub struct Behavior {
    pub id: String,
    pub name: String,
    pub trigger: Trigger,
    pub params: Params,
    /// Higher runs first within a tick
    pub priority: f64,
    pub cooldown_ms: i64,
    pub last_executed_ms: Option<i64>,
    pub enabled: bool,
    factory: ActionFactory,
}

impl fmt::Debug for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Behavior")
            .field("id", &self.id)
            .field("trigger", &self.trigger)
            .field("priority", &self.priority)
            .field("cooldown_ms", &self.cooldown_ms)
            .field("last_executed_ms", &self.last_executed_ms)
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl Behavior {
    pub fn new<F>(id: &str, trigger: Trigger, cooldown_ms: i64, factory: F) -> Self
    where
        F: Fn(&TriggerContext<'_>) -> Result<Vec<Action>, EngineError> + Send + Sync + 'static,
    {
        Self {
            id: id.to_string(),
            name: id.replace('_', " "),
            trigger,
            params: Params::new(),
            priority: 0.5,
            cooldown_ms,
            last_executed_ms: None,
            enabled: true,
            factory: Arc::new(factory),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_param(mut self, key: &str, value: serde_json::Value) -> Self {
        self.params.insert(key.to_string(), value);
        self
    }

    /// Whether the cooldown has elapsed at `now_ms`
    pub fn is_cooled_down(&self, now_ms: i64) -> bool {
        match self.last_executed_ms {
            Some(last) => now_ms - last >= self.cooldown_ms,
            None => true,
        }
    }

    /// Run the action factory
    pub fn produce(&self, ctx: &TriggerContext<'_>) -> Result<Vec<Action>, EngineError> {
        (self.factory)(ctx)
    }
}

/// Serializable view of a behavior
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BehaviorInfo {
    pub id: String,
    pub name: String,
    pub trigger: Trigger,
    pub priority: f64,
    pub cooldown_ms: i64,
    pub last_executed_ms: Option<i64>,
    pub enabled: bool,
}

/// Behaviors owned by one control loop
#[derive(Debug, Default)]
pub struct BehaviorRegistry {
    behaviors: Vec<Behavior>,
}

impl BehaviorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for behavior in default_behaviors() {
            registry.register(behavior);
        }
        registry
    }

    /// Add a behavior, replacing one with the same id
    pub fn register(&mut self, behavior: Behavior) {
        self.behaviors.retain(|b| b.id != behavior.id);
        self.behaviors.push(behavior);
        self.behaviors
            .sort_by(|a, b| b.priority.total_cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));
    }

    pub fn unregister(&mut self, id: &str) -> bool {
        let before = self.behaviors.len();
        self.behaviors.retain(|b| b.id != id);
        self.behaviors.len() < before
    }

    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<(), EngineError> {
        let behavior = self
            .behaviors
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| EngineError::Behavior {
                id: id.to_string(),
                reason: "not registered".to_string(),
            })?;
        behavior.enabled = enabled;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Behavior> {
        self.behaviors.iter().find(|b| b.id == id)
    }

    pub fn list(&self) -> Vec<BehaviorInfo> {
        self.behaviors
            .iter()
            .map(|b| BehaviorInfo {
                id: b.id.clone(),
                name: b.name.clone(),
                trigger: b.trigger.clone(),
                priority: b.priority,
                cooldown_ms: b.cooldown_ms,
                last_executed_ms: b.last_executed_ms,
                enabled: b.enabled,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }

    /// Behaviors that are enabled, cooled down and triggered, by priority
    pub fn due<R: Rng>(&self, now_ms: i64, ctx: &TriggerContext<'_>, rng: &mut R) -> Vec<Behavior> {
        self.behaviors
            .iter()
            .filter(|b| b.enabled && b.is_cooled_down(now_ms))
            .filter(|b| {
                let fired = b.trigger.is_triggered(ctx, rng);
                if fired {
                    debug!("Behavior '{}' triggered", b.id);
                }
                fired
            })
            .cloned()
            .collect()
    }

    pub fn mark_executed(&mut self, id: &str, now_ms: i64) {
        if let Some(b) = self.behaviors.iter_mut().find(|b| b.id == id) {
            b.last_executed_ms = Some(now_ms);
        }
    }
}

/// The built-in behaviors
pub fn default_behaviors() -> Vec<Behavior> {
    vec![
        Behavior::new(
            "morning_reflection",
            Trigger::Time {
                window: TimeWindow::Morning,
            },
            20 * HOUR_MS,
            |_ctx| {
                Ok(vec![Action::new(ActionCategory::Cognitive, "reflect_on_yesterday")
                    .with_param("source", json!("behavior"))])
            },
        )
        .with_priority(0.7),
        Behavior::new(
            "curiosity_exploration",
            Trigger::Curiosity { threshold: 0.7 },
            30 * MINUTE_MS,
            |ctx| {
                Ok(vec![Action::new(ActionCategory::Exploration, "explore_random_topic")
                    .with_param("source", json!("behavior"))
                    .with_param("curiosity", json!(ctx.curiosity))])
            },
        )
        .with_priority(0.6),
        Behavior::new(
            "goal_pursuit",
            Trigger::Goal { min_priority: 0.7 },
            HOUR_MS,
            |ctx| {
                let goal = ctx
                    .goals
                    .iter()
                    .filter(|g| !g.is_complete())
                    .max_by(|a, b| a.priority.total_cmp(&b.priority));
                Ok(goal
                    .map(|g| {
                        Action::new(g.focus.unwrap_or(ActionCategory::Learning), "work_on_goal")
                            .with_priority(g.priority)
                            .with_param("goal_id", json!(g.id))
                            .with_param("source", json!("behavior"))
                    })
                    .into_iter()
                    .collect())
            },
        )
        .with_priority(0.8),
        Behavior::new(
            "spontaneous_check_in",
            Trigger::State { probability: 0.05 },
            2 * HOUR_MS,
            |ctx| {
                Ok(vec![Action::new(ActionCategory::Communication, "send_check_in")
                    .with_param("source", json!("behavior"))
                    .with_param("phase", json!(ctx.phase))])
            },
        )
        .with_priority(0.3),
    ]
}

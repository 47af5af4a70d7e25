//! Autonomous behavior
//!
//! The control loop ([`AutonomousLoop`]) and the pieces it is built from:
//! the daily phase schedule, goals, curiosity, decisions, behaviors and
//! the interruption queue.

pub mod behavior;
pub mod core;
pub mod curiosity;
pub mod decision;
pub mod goals;
pub mod interruption;
pub mod metrics;
pub mod phase;

pub use self::core::{ActionReport, AutonomousLoop, AutonomousState, LoopDependencies};
pub use behavior::{
    default_behaviors, ActionFactory, Behavior, BehaviorInfo, BehaviorRegistry, EmotionState,
    TimeWindow, Trigger, TriggerContext,
};
pub use curiosity::CuriosityModel;
pub use decision::{Criterion, Decision, DecisionEngine, CRITERIA};
pub use goals::{GoalEvaluator, GoalManager, GoalTemplate, NoopGoalEvaluator};
pub use interruption::InterruptionQueue;
pub use metrics::{LoopMetrics, ReflectionSummary};
pub use phase::{categorize_activity, Phase, PhaseSchedule};

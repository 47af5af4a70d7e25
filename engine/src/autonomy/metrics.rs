//! Loop performance metrics and self-reflection

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Counters maintained by the control loop
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoopMetrics {
    pub ticks: u64,
    pub tick_failures: u64,
    pub total_tick_ms: u64,
    pub last_tick_ms: u64,
    pub phase_changes: u64,
    pub decisions_made: u64,
    pub goals_generated: u64,
    /// Actions that reached an executor
    pub actions_executed: u64,
    pub actions_succeeded: u64,
    pub actions_failed: u64,
    /// Actions the policy engine denied
    pub actions_denied: u64,
    /// Actions refused at the concurrency limit
    pub actions_rejected: u64,
    pub behaviors_fired: u64,
    pub behavior_failures: u64,
    pub interruptions_handled: u64,
    pub interruptions_deferred: u64,
    /// Ticks in a row in which the head interruption had to wait
    pub consecutive_deferrals: u64,
    pub last_reflection: Option<ReflectionSummary>,
}

impl LoopMetrics {
    pub fn average_tick_ms(&self) -> f64 {
        if self.ticks == 0 {
            0.0
        } else {
            self.total_tick_ms as f64 / self.ticks as f64
        }
    }

    /// Share of executed actions that succeeded; 0.0 before the first one
    pub fn success_rate(&self) -> f64 {
        if self.actions_executed == 0 {
            0.0
        } else {
            self.actions_succeeded as f64 / self.actions_executed as f64
        }
    }

    pub fn record_tick(&mut self, elapsed_ms: u64) {
        self.ticks += 1;
        self.last_tick_ms = elapsed_ms;
        self.total_tick_ms = self.total_tick_ms.saturating_add(elapsed_ms);
    }
}

/// Periodic summary the loop writes about itself
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReflectionSummary {
    pub at: DateTime<Utc>,
    pub ticks: u64,
    pub success_rate: f64,
    pub average_tick_ms: f64,
    pub active_goals: usize,
    pub notes: Vec<String>,
}

impl ReflectionSummary {
    pub fn from_metrics(
        at: DateTime<Utc>,
        metrics: &LoopMetrics,
        active_goals: usize,
        tick_interval_ms: u64,
    ) -> Self {
        let success_rate = metrics.success_rate();
        let average_tick_ms = metrics.average_tick_ms();

        let mut notes = Vec::new();
        if metrics.actions_executed > 0 && success_rate < 0.5 {
            notes.push("Most actions are failing; favor simpler activities".to_string());
        }
        if metrics.actions_denied > metrics.actions_executed {
            notes.push("More actions are denied than executed".to_string());
        }
        if metrics.consecutive_deferrals > 0 {
            notes.push(format!(
                "Interruption waiting for an interruptible phase for {} tick(s)",
                metrics.consecutive_deferrals
            ));
        }
        if average_tick_ms > tick_interval_ms as f64 {
            notes.push("Ticks are overrunning the interval".to_string());
        }
        if active_goals == 0 {
            notes.push("No active goals".to_string());
        }

        Self {
            at,
            ticks: metrics.ticks,
            success_rate,
            average_tick_ms,
            active_goals,
            notes,
        }
    }
}

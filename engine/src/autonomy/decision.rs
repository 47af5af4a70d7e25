//! Multi-criteria decision making
//!
//! One decision per invocation, throttled to one every `cooldown_ms`.
//! Candidates come strictly from the current phase's activity labels, one per
//! label. Each candidate is scored against a fixed criteria set and the
//! candidate with the highest *summed* score wins; ties keep the first-seen
//! candidate.
//!
//! The criteria carry weights that are reported alongside the scores but are
//! not multiplied in.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use sdk::types::{Action, ActionCategory, AgentProfile, DecisionContext, Goal};

use super::phase::{categorize_activity, Phase};
use crate::ethics::principles::{adherence_score, default_principles};

/// A named scoring criterion
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Criterion {
    pub name: &'static str,
    pub weight: f64,
}

pub const CRITERIA: [Criterion; 4] = [
    Criterion {
        name: "goal_alignment",
        weight: 0.4,
    },
    Criterion {
        name: "personality_fit",
        weight: 0.3,
    },
    Criterion {
        name: "resource_efficiency",
        weight: 0.2,
    },
    Criterion {
        name: "ethical_compliance",
        weight: 0.1,
    },
];

/// Result of one decision
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub id: String,
    pub context: DecisionContext,
    pub criteria: Vec<Criterion>,
    pub alternatives: Vec<Action>,
    /// `scores[i][j]`: alternative `i` against criterion `j`
    pub scores: Vec<Vec<f64>>,
    pub chosen: Action,
    /// Winning sum divided by the number of criteria
    pub confidence: f64,
    pub reasoning: Vec<String>,
    pub made_at: DateTime<Utc>,
}

/// Throttled decision maker
#[derive(Debug)]
pub struct DecisionEngine {
    cooldown_ms: i64,
    last_decision_ms: Option<i64>,
}

impl DecisionEngine {
    pub fn new(cooldown_ms: i64) -> Self {
        Self {
            cooldown_ms,
            last_decision_ms: None,
        }
    }

    /// Whether a decision may be made at `now_ms`
    pub fn is_ready(&self, now_ms: i64) -> bool {
        match self.last_decision_ms {
            Some(last) => now_ms - last >= self.cooldown_ms,
            None => true,
        }
    }

    /// Decide what to do next in `phase`
    ///
    /// Returns `None` when throttled or when the phase has no activities. An
    /// attempt that passes the throttle starts a new cooldown window even if
    /// it yields no candidates.
    pub fn decide(
        &mut self,
        now: DateTime<Utc>,
        agent: &AgentProfile,
        phase: &Phase,
        context: DecisionContext,
    ) -> Option<Decision> {
        let now_ms = now.timestamp_millis();
        if !self.is_ready(now_ms) {
            debug!("Decision throttled");
            return None;
        }
        self.last_decision_ms = Some(now_ms);

        let alternatives: Vec<Action> = phase
            .activities
            .iter()
            .map(|label| {
                Action::new(categorize_activity(label, phase.default_category), label.clone())
                    .with_priority(phase.priority)
                    .with_param("phase", json!(phase.name))
                    .with_param("source", json!("decision"))
            })
            .collect();

        if alternatives.is_empty() {
            debug!("Phase '{}' has no activities, no decision", phase.name);
            return None;
        }

        let scores: Vec<Vec<f64>> = alternatives
            .iter()
            .map(|action| score_action(action, agent, &context.goals))
            .collect();

        let mut best = 0;
        let mut best_sum = f64::MIN;
        for (i, row) in scores.iter().enumerate() {
            let sum: f64 = row.iter().sum();
            if sum > best_sum {
                best = i;
                best_sum = sum;
            }
        }

        let chosen = alternatives[best].clone();
        let confidence = (best_sum / CRITERIA.len() as f64).clamp(0.0, 1.0);
        let reasoning = vec![
            format!(
                "Phase '{}' offered {} alternative(s)",
                phase.name,
                alternatives.len()
            ),
            format!(
                "Chose '{}' with score {:.2} ({})",
                chosen.verb,
                best_sum,
                CRITERIA
                    .iter()
                    .zip(&scores[best])
                    .map(|(c, s)| format!("{} {:.2}", c.name, s))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        ];

        Some(Decision {
            id: Uuid::new_v4().to_string(),
            context,
            criteria: CRITERIA.to_vec(),
            alternatives,
            scores,
            chosen,
            confidence,
            reasoning,
            made_at: now,
        })
    }
}

/// Per-criterion scores in `CRITERIA` order, each in [0, 1]
pub fn score_action(action: &Action, agent: &AgentProfile, goals: &[Goal]) -> Vec<f64> {
    vec![
        goal_alignment(action, goals),
        personality_fit(action, agent),
        resource_efficiency(action.category),
        ethical_compliance(action),
    ]
}

fn goal_alignment(action: &Action, goals: &[Goal]) -> f64 {
    if goals.is_empty() {
        return 0.5;
    }
    goals
        .iter()
        .filter(|g| !g.is_complete() && g.focus == Some(action.category))
        .map(|g| g.priority)
        .fold(0.3, f64::max)
}

fn personality_fit(action: &Action, agent: &AgentProfile) -> f64 {
    let traits: &[&str] = match action.category {
        ActionCategory::Learning => &["curious"],
        ActionCategory::Exploration => &["adventurous", "curious"],
        ActionCategory::Communication | ActionCategory::Social => &["social"],
        ActionCategory::Creative => &["creative"],
        ActionCategory::Cognitive => &["reflective"],
        ActionCategory::Maintenance => &["diligent"],
    };
    if traits.iter().any(|t| agent.has_trait(t)) {
        0.9
    } else {
        0.5
    }
}

fn resource_efficiency(category: ActionCategory) -> f64 {
    match category {
        ActionCategory::Cognitive | ActionCategory::Maintenance => 0.9,
        ActionCategory::Learning | ActionCategory::Communication => 0.8,
        ActionCategory::Creative | ActionCategory::Social => 0.7,
        ActionCategory::Exploration => 0.6,
    }
}

fn ethical_compliance(action: &Action) -> f64 {
    let principles = default_principles();
    let total: f64 = principles
        .iter()
        .map(|p| adherence_score(&p.id, &action.verb))
        .sum();
    total / principles.len() as f64
}

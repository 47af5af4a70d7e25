//! Shared data model: agents, actions, goals and human interaction events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Parameter bag carried by an action
pub type Params = BTreeMap<String, serde_json::Value>;

/// Identity and personality of the agent being driven
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: String,
    pub name: String,
    /// Declared personality traits (e.g. "curious", "social")
    #[serde(default)]
    pub traits: Vec<String>,
}

impl AgentProfile {
    pub fn new(id: impl Into<String>, name: impl Into<String>, traits: Vec<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            traits,
        }
    }

    /// Case-insensitive trait lookup
    pub fn has_trait(&self, name: &str) -> bool {
        self.traits.iter().any(|t| t.eq_ignore_ascii_case(name))
    }
}

/// Broad kind of an action, used for executor routing and scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    Communication,
    Learning,
    Cognitive,
    Creative,
    Social,
    Exploration,
    Maintenance,
}

impl ActionCategory {
    /// Name of the executor that handles this category unless overridden
    pub fn default_executor(self) -> &'static str {
        match self {
            ActionCategory::Communication | ActionCategory::Social => "communication",
            ActionCategory::Learning | ActionCategory::Exploration => "learning",
            ActionCategory::Cognitive | ActionCategory::Creative => "cognition",
            ActionCategory::Maintenance => "tool",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionCategory::Communication => "communication",
            ActionCategory::Learning => "learning",
            ActionCategory::Cognitive => "cognitive",
            ActionCategory::Creative => "creative",
            ActionCategory::Social => "social",
            ActionCategory::Exploration => "exploration",
            ActionCategory::Maintenance => "maintenance",
        }
    }
}

/// Action lifecycle: `Pending -> Executing -> Completed | Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    Executing,
    Completed,
    Failed,
}

impl ActionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ActionStatus::Completed | ActionStatus::Failed)
    }
}

/// Outcome reported by an action executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl ExecutionResult {
    pub fn success(payload: serde_json::Value) -> Self {
        Self {
            success: true,
            payload,
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            payload: serde_json::json!({ "error": reason.into() }),
        }
    }
}

/// A unit of work the agent intends to perform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    pub category: ActionCategory,
    /// Name of the executor the action is dispatched to
    pub target_executor: String,
    /// The verb (e.g. "read_article", "send_message")
    pub verb: String,
    #[serde(default)]
    pub params: Params,
    pub status: ActionStatus,
    #[serde(default)]
    pub result: Option<ExecutionResult>,
    #[serde(default)]
    pub priority: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl Action {
    /// Create a pending action routed to the category's default executor
    pub fn new(category: ActionCategory, verb: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            category,
            target_executor: category.default_executor().to_string(),
            verb: verb.into(),
            params: Params::new(),
            status: ActionStatus::Pending,
            result: None,
            priority: None,
            created_at: Utc::now(),
        }
    }

    /// Route to a specific executor
    pub fn with_executor(mut self, executor: impl Into<String>) -> Self {
        self.target_executor = executor.into();
        self
    }

    /// Add a parameter
    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = Some(priority.clamp(0.0, 1.0));
        self
    }

    /// Get a string parameter
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    ShortTerm,
    LongTerm,
}

/// Something the agent is working towards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub description: String,
    pub goal_type: GoalType,
    /// 0.0 - 1.0
    pub priority: f64,
    /// 0.0 - 1.0
    pub progress: f64,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    /// Ids of dependent sub-goals
    #[serde(default)]
    pub sub_goals: Vec<String>,
    /// Category of action that advances this goal, if any
    #[serde(default)]
    pub focus: Option<ActionCategory>,
    pub created_at: DateTime<Utc>,
}

impl Goal {
    pub fn new(description: impl Into<String>, goal_type: GoalType, priority: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            description: description.into(),
            goal_type,
            priority: priority.clamp(0.0, 1.0),
            progress: 0.0,
            deadline: None,
            sub_goals: Vec::new(),
            focus: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_focus(mut self, focus: ActionCategory) -> Self {
        self.focus = Some(focus);
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= 1.0
    }
}

/// Kind of human interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Message,
    Question,
    Command,
    Emergency,
}

/// A pending human interaction waiting to interrupt the agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub id: String,
    pub human_id: String,
    pub content: String,
    pub kind: InteractionKind,
    pub received_at: DateTime<Utc>,
}

impl InteractionEvent {
    pub fn new(human_id: impl Into<String>, content: impl Into<String>, kind: InteractionKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            human_id: human_id.into(),
            content: content.into(),
            kind,
            received_at: Utc::now(),
        }
    }
}

/// Snapshot of what the agent knows when it decides or is vetted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionContext {
    /// Observable state (phase, counters, emotion, ...)
    #[serde(default)]
    pub state: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub goals: Vec<Goal>,
    /// Named situational constraints (e.g. "quiet_hours")
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub uncertainties: Vec<String>,
    pub planning_horizon_ms: i64,
    pub stakeholders: Vec<String>,
}

impl DecisionContext {
    /// Context with the default stakeholder set `{self, humans}`
    pub fn new(planning_horizon_ms: i64) -> Self {
        Self {
            state: BTreeMap::new(),
            goals: Vec::new(),
            constraints: Vec::new(),
            uncertainties: Vec::new(),
            planning_horizon_ms,
            stakeholders: vec!["self".to_string(), "humans".to_string()],
        }
    }

    pub fn with_state(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.state.insert(key.into(), value);
        self
    }

    pub fn with_goals(mut self, goals: Vec<Goal>) -> Self {
        self.goals = goals;
        self
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraints.push(constraint.into());
        self
    }
}

impl Default for DecisionContext {
    fn default() -> Self {
        Self::new(86_400_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_defaults_to_category_executor() {
        let action = Action::new(ActionCategory::Learning, "read_article");
        assert_eq!(action.target_executor, "learning");
        assert_eq!(action.status, ActionStatus::Pending);
        assert!(action.result.is_none());

        let action = Action::new(ActionCategory::Social, "greet").with_executor("telegram");
        assert_eq!(action.target_executor, "telegram");
    }

    #[test]
    fn test_action_params() {
        let action = Action::new(ActionCategory::Communication, "send_message")
            .with_param("recipient", json!("alice"))
            .with_param("count", json!(2));
        assert_eq!(action.param_str("recipient"), Some("alice"));
        assert_eq!(action.param_str("count"), None);
        assert_eq!(action.param_str("missing"), None);
    }

    #[test]
    fn test_priority_is_clamped() {
        let action = Action::new(ActionCategory::Cognitive, "think").with_priority(4.0);
        assert_eq!(action.priority, Some(1.0));

        let goal = Goal::new("learn", GoalType::ShortTerm, -1.0);
        assert_eq!(goal.priority, 0.0);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!ActionStatus::Pending.is_terminal());
        assert!(!ActionStatus::Executing.is_terminal());
        assert!(ActionStatus::Completed.is_terminal());
        assert!(ActionStatus::Failed.is_terminal());
    }

    #[test]
    fn test_agent_traits_case_insensitive() {
        let agent = AgentProfile::new("a1", "Nyx", vec!["Curious".into()]);
        assert!(agent.has_trait("curious"));
        assert!(!agent.has_trait("social"));
    }

    #[test]
    fn test_decision_context_stakeholders() {
        let ctx = DecisionContext::new(1_000).with_constraint("quiet_hours");
        assert_eq!(ctx.stakeholders, vec!["self", "humans"]);
        assert_eq!(ctx.constraints, vec!["quiet_hours"]);
        assert!(ctx.goals.is_empty());
    }

    #[test]
    fn test_action_serializes_snake_case() {
        let action = Action::new(ActionCategory::Exploration, "wander");
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["category"], "exploration");
        assert_eq!(value["status"], "pending");
    }
}

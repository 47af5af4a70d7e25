//! Goal tracking and emergent goal generation

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info};

use sdk::types::{ActionCategory, AgentProfile, Goal, GoalType};

/// Progress evaluation extension point
///
/// Called once per tick for every live goal. Returning `Some(progress)`
/// replaces the goal's progress.
pub trait GoalEvaluator: Send + Sync {
    fn evaluate(&self, goal: &Goal) -> Option<f64>;
}

/// Leaves every goal untouched
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopGoalEvaluator;

impl GoalEvaluator for NoopGoalEvaluator {
    fn evaluate(&self, _goal: &Goal) -> Option<f64> {
        None
    }
}

/// Blueprint for an emergent goal
#[derive(Debug, Clone, PartialEq)]
pub struct GoalTemplate {
    pub description: &'static str,
    pub goal_type: GoalType,
    pub base_priority: f64,
    pub focus: ActionCategory,
    /// Personality trait that makes this template more likely and urgent
    pub boosted_by: &'static str,
}

/// Priority multiplier when the agent has the template's trait
const TRAIT_BOOST: f64 = 1.5;

impl GoalTemplate {
    /// Priority for `agent`, boosted when the agent has the matching trait
    pub fn priority_for(&self, agent: &AgentProfile) -> f64 {
        if agent.has_trait(self.boosted_by) {
            (self.base_priority * TRAIT_BOOST).min(1.0)
        } else {
            self.base_priority
        }
    }

    fn instantiate(&self, agent: &AgentProfile) -> Goal {
        Goal::new(self.description, self.goal_type, self.priority_for(agent)).with_focus(self.focus)
    }
}

pub fn default_templates() -> Vec<GoalTemplate> {
    vec![
        GoalTemplate {
            description: "Learn about an unfamiliar topic",
            goal_type: GoalType::ShortTerm,
            base_priority: 0.6,
            focus: ActionCategory::Learning,
            boosted_by: "curious",
        },
        GoalTemplate {
            description: "Start a conversation with someone new",
            goal_type: GoalType::ShortTerm,
            base_priority: 0.5,
            focus: ActionCategory::Social,
            boosted_by: "social",
        },
        GoalTemplate {
            description: "Create something original",
            goal_type: GoalType::LongTerm,
            base_priority: 0.5,
            focus: ActionCategory::Creative,
            boosted_by: "creative",
        },
        GoalTemplate {
            description: "Explore an unvisited area of knowledge",
            goal_type: GoalType::LongTerm,
            base_priority: 0.5,
            focus: ActionCategory::Exploration,
            boosted_by: "adventurous",
        },
        GoalTemplate {
            description: "Reflect on recent experiences",
            goal_type: GoalType::ShortTerm,
            base_priority: 0.4,
            focus: ActionCategory::Cognitive,
            boosted_by: "reflective",
        },
    ]
}

/// Bounded set of live goals
pub struct GoalManager {
    goals: Vec<Goal>,
    cap: usize,
    templates: Vec<GoalTemplate>,
    evaluator: Arc<dyn GoalEvaluator>,
}

impl GoalManager {
    pub fn new(cap: usize) -> Self {
        Self {
            goals: Vec::new(),
            cap,
            templates: default_templates(),
            evaluator: Arc::new(NoopGoalEvaluator),
        }
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn GoalEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_templates(mut self, templates: Vec<GoalTemplate>) -> Self {
        self.templates = templates;
        self
    }

    /// Add a goal; returns `false` without adding when at the cap
    pub fn add_goal(&mut self, goal: Goal) -> bool {
        if !self.has_capacity() {
            debug!("Goal cap {} reached, not adding '{}'", self.cap, goal.description);
            return false;
        }
        self.goals.push(goal);
        true
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn len(&self) -> usize {
        self.goals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn has_capacity(&self) -> bool {
        self.goals.len() < self.cap
    }

    /// Set a goal's progress (clamped to [0, 1]); returns whether it exists
    pub fn update_progress(&mut self, goal_id: &str, progress: f64) -> bool {
        match self.goals.iter_mut().find(|g| g.id == goal_id) {
            Some(goal) => {
                goal.progress = progress.clamp(0.0, 1.0);
                true
            }
            None => false,
        }
    }

    /// Run the evaluator over every live goal
    pub fn evaluate_all(&mut self) {
        for goal in &mut self.goals {
            if let Some(progress) = self.evaluator.evaluate(goal) {
                goal.progress = progress.clamp(0.0, 1.0);
            }
        }
    }

    /// Highest-priority incomplete goal
    pub fn top_goal(&self) -> Option<&Goal> {
        self.goals
            .iter()
            .filter(|g| !g.is_complete())
            .max_by(|a, b| a.priority.total_cmp(&b.priority))
    }

    /// Synthesize a goal from the templates and add it
    ///
    /// Templates are drawn with probability proportional to their
    /// trait-adjusted priority. Returns `None` at the cap or without
    /// templates.
    pub fn generate_emergent<R: Rng>(&mut self, agent: &AgentProfile, rng: &mut R) -> Option<Goal> {
        if !self.has_capacity() || self.templates.is_empty() {
            return None;
        }

        let weights: Vec<f64> = self.templates.iter().map(|t| t.priority_for(agent)).collect();
        let index = match WeightedIndex::new(&weights) {
            Ok(dist) => dist.sample(rng),
            Err(_) => 0,
        };

        let goal = self.templates[index].instantiate(agent);
        info!(
            "Generated emergent goal '{}' (priority {:.2})",
            goal.description, goal.priority
        );
        self.goals.push(goal.clone());
        Some(goal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn agent(traits: &[&str]) -> AgentProfile {
        AgentProfile::new("a", "A", traits.iter().map(|t| t.to_string()).collect())
    }

    #[test]
    fn test_cap_enforced() {
        let mut goals = GoalManager::new(2);
        assert!(goals.add_goal(Goal::new("one", GoalType::ShortTerm, 0.5)));
        assert!(goals.add_goal(Goal::new("two", GoalType::ShortTerm, 0.5)));
        assert!(!goals.add_goal(Goal::new("three", GoalType::ShortTerm, 0.5)));
        assert_eq!(goals.len(), 2);
    }

    #[test]
    fn test_generation_respects_cap() {
        let mut goals = GoalManager::new(3);
        let mut rng = StdRng::seed_from_u64(3);
        let agent = agent(&["curious"]);
        for _ in 0..20 {
            goals.generate_emergent(&agent, &mut rng);
        }
        assert_eq!(goals.len(), 3);
        assert!(goals.generate_emergent(&agent, &mut rng).is_none());
    }

    #[test]
    fn test_trait_boost() {
        let template = &default_templates()[0];
        assert_eq!(template.priority_for(&agent(&[])), 0.6);
        assert!((template.priority_for(&agent(&["Curious"])) - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_single_template_always_chosen() {
        let mut goals = GoalManager::new(5).with_templates(vec![default_templates().remove(1)]);
        let goal = goals
            .generate_emergent(&agent(&["social"]), &mut StdRng::seed_from_u64(9))
            .unwrap();
        assert_eq!(goal.focus, Some(ActionCategory::Social));
        assert!((goal.priority - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_update_progress() {
        let mut goals = GoalManager::new(3);
        let goal = Goal::new("one", GoalType::ShortTerm, 0.5);
        let id = goal.id.clone();
        goals.add_goal(goal);
        assert!(goals.update_progress(&id, 1.4));
        assert_eq!(goals.goals()[0].progress, 1.0);
        assert!(!goals.update_progress("missing", 0.5));
        assert!(goals.top_goal().is_none());
    }

    struct HalfWay;

    impl GoalEvaluator for HalfWay {
        fn evaluate(&self, _goal: &Goal) -> Option<f64> {
            Some(0.5)
        }
    }

    #[test]
    fn test_evaluator_applied() {
        let mut goals = GoalManager::new(3).with_evaluator(Arc::new(HalfWay));
        goals.add_goal(Goal::new("one", GoalType::LongTerm, 0.5));
        goals.evaluate_all();
        assert_eq!(goals.goals()[0].progress, 0.5);

        let mut noop = GoalManager::new(3);
        noop.add_goal(Goal::new("one", GoalType::LongTerm, 0.5));
        noop.evaluate_all();
        assert_eq!(noop.goals()[0].progress, 0.0);
    }
}

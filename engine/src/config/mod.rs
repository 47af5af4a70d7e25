//! Configuration management
//!
//! This module handles loading and validation of the Mindloop configuration.
//! Configuration is stored in TOML format at ~/.mindloop/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Agent identity and log level
//! - **autonomy**: Control loop switches, tunables and initial goals
//! - **personality**: Declared personality traits
//! - **curiosity**: Curiosity drivers used for emergent goal generation
//! - **ethics**: Policy engine customization
//!
//! Every section has defaults, so an empty file is a valid configuration.
//!
//! # Examples
//!
//! ```no_run
//! use mindloop_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_default()?;
//! println!("Agent: {}", config.core.agent_name);
//! println!("Tick interval: {}ms", config.autonomy.tick_interval_ms);
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use sdk::errors::EngineError;
use sdk::types::{ActionCategory, AgentProfile, Goal, GoalType};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ethics::principles::default_principles;
use crate::ethics::types::{EthicalConstraint, EthicalPrinciple, InterventionLevel};
use crate::pattern_detector::{PatternDetector, PatternSpec};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub core: CoreConfig,

    #[serde(default)]
    pub autonomy: AutonomyConfig,

    #[serde(default)]
    pub personality: PersonalityConfig,

    #[serde(default)]
    pub curiosity: CuriosityConfig,

    #[serde(default)]
    pub ethics: EthicsConfig,
}

/// Agent identity and logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    #[serde(default = "default_agent_id")]
    pub agent_id: String,

    #[serde(default = "default_agent_name")]
    pub agent_name: String,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            agent_id: default_agent_id(),
            agent_name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

/// Control loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutonomyConfig {
    /// Run the loop at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Allow human interactions to interrupt interruptible phases
    #[serde(default = "default_true")]
    pub interruptible: bool,

    /// Vet every action with the ethics engine before dispatch
    #[serde(default = "default_true")]
    pub ethical_constraints: bool,

    #[serde(default = "default_true")]
    pub goal_generation_enabled: bool,

    /// Minimum time between tick starts
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// 0.0 - 1.0
    #[serde(default = "default_autonomy_level")]
    pub autonomy_level: f64,

    /// Curiosity score needed before an emergent goal is generated (0.0 - 1.0)
    #[serde(default = "default_curiosity_weight")]
    pub curiosity_weight: f64,

    #[serde(default = "default_max_concurrent_actions")]
    pub max_concurrent_actions: usize,

    #[serde(default = "default_planning_horizon_ms")]
    pub planning_horizon_ms: i64,

    /// Cap on live goals
    #[serde(default = "default_max_goals")]
    pub max_goals: usize,

    /// Minimum time between autonomous decisions
    #[serde(default = "default_decision_cooldown_ms")]
    pub decision_cooldown_ms: i64,

    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    #[serde(default = "default_shutdown_poll_ms")]
    pub shutdown_poll_ms: u64,

    /// Ticks between self-reflections
    #[serde(default = "default_reflection_interval_ticks")]
    pub reflection_interval_ticks: u64,

    /// Goals the agent starts with; those beyond `max_goals` are dropped
    #[serde(default)]
    pub goals: Vec<InitialGoalConfig>,
}

/// A goal declared in configuration
///
/// ```toml
/// [[autonomy.goals]]
/// description = "Finish the reading list"
/// type = "long_term"
/// priority = 0.7
/// focus = "learning"
/// deadline = "2026-12-31T00:00:00Z"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialGoalConfig {
    pub description: String,
    #[serde(rename = "type", default = "default_goal_type")]
    pub goal_type: GoalType,
    /// 0.0 - 1.0
    pub priority: f64,
    #[serde(default)]
    pub focus: Option<ActionCategory>,
    /// RFC 3339 timestamp
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

impl InitialGoalConfig {
    pub fn to_goal(&self) -> Goal {
        let mut goal = Goal::new(self.description.clone(), self.goal_type, self.priority);
        goal.focus = self.focus;
        goal.deadline = self.deadline;
        goal
    }
}

impl Default for AutonomyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interruptible: true,
            ethical_constraints: true,
            goal_generation_enabled: true,
            tick_interval_ms: default_tick_interval_ms(),
            autonomy_level: default_autonomy_level(),
            curiosity_weight: default_curiosity_weight(),
            max_concurrent_actions: default_max_concurrent_actions(),
            planning_horizon_ms: default_planning_horizon_ms(),
            max_goals: default_max_goals(),
            decision_cooldown_ms: default_decision_cooldown_ms(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            shutdown_poll_ms: default_shutdown_poll_ms(),
            reflection_interval_ticks: default_reflection_interval_ticks(),
            goals: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonalityConfig {
    #[serde(default = "default_traits")]
    pub traits: Vec<String>,
}

impl Default for PersonalityConfig {
    fn default() -> Self {
        Self {
            traits: default_traits(),
        }
    }
}

/// One curiosity driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuriosityDriverConfig {
    pub name: String,
    /// 0.0 - 1.0
    pub weight: f64,
    /// The driver contributes only when its signal exceeds this (0.0 - 1.0)
    pub threshold: f64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuriosityConfig {
    #[serde(default = "default_curiosity_drivers")]
    pub drivers: Vec<CuriosityDriverConfig>,
}

impl Default for CuriosityConfig {
    fn default() -> Self {
        Self {
            drivers: default_curiosity_drivers(),
        }
    }
}

/// Policy engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EthicsConfig {
    /// When false every action is allowed without checks
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Block on any high-severity violation
    #[serde(default)]
    pub strict_mode: bool,

    #[serde(default)]
    pub intervention_level: InterventionLevel,

    /// Principle ids to enforce; empty means all known principles
    #[serde(default)]
    pub principles: Vec<String>,

    /// Additional principles beyond the built-in set
    #[serde(default)]
    pub custom_principles: Vec<EthicalPrinciple>,

    #[serde(default = "default_max_actions_per_minute")]
    pub max_actions_per_minute: usize,

    /// Verbs that are never allowed
    #[serde(default)]
    pub prohibited_actions: Vec<String>,

    /// Verbs that need human oversight
    #[serde(default)]
    pub requires_approval: Vec<String>,

    #[serde(default = "default_true")]
    pub audit_enabled: bool,

    #[serde(default = "default_audit_capacity")]
    pub audit_capacity: usize,

    /// Include the built-in constraint set
    #[serde(default = "default_true")]
    pub default_constraints: bool,

    /// Additional declarative constraints
    #[serde(default)]
    pub constraints: Vec<EthicalConstraint>,

    /// Include the built-in dangerous pattern set
    #[serde(default = "default_true")]
    pub default_patterns: bool,

    /// Additional dangerous patterns
    #[serde(default)]
    pub patterns: Vec<PatternSpec>,
}

impl Default for EthicsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strict_mode: false,
            intervention_level: InterventionLevel::default(),
            principles: Vec::new(),
            custom_principles: Vec::new(),
            max_actions_per_minute: default_max_actions_per_minute(),
            prohibited_actions: Vec::new(),
            requires_approval: Vec::new(),
            audit_enabled: true,
            audit_capacity: default_audit_capacity(),
            default_constraints: true,
            constraints: Vec::new(),
            default_patterns: true,
            patterns: Vec::new(),
        }
    }
}

// Default value functions
fn default_agent_id() -> String {
    "mindloop-agent".to_string()
}

fn default_agent_name() -> String {
    "Mindloop".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_tick_interval_ms() -> u64 {
    1_000
}

fn default_autonomy_level() -> f64 {
    0.8
}

fn default_curiosity_weight() -> f64 {
    0.6
}

fn default_max_concurrent_actions() -> usize {
    3
}

fn default_planning_horizon_ms() -> i64 {
    86_400_000
}

fn default_max_goals() -> usize {
    3
}

fn default_decision_cooldown_ms() -> i64 {
    5_000
}

fn default_shutdown_timeout_secs() -> u64 {
    30
}

fn default_shutdown_poll_ms() -> u64 {
    100
}

fn default_reflection_interval_ticks() -> u64 {
    10
}

fn default_goal_type() -> GoalType {
    GoalType::ShortTerm
}

fn default_traits() -> Vec<String> {
    vec!["curious".to_string()]
}

fn default_curiosity_drivers() -> Vec<CuriosityDriverConfig> {
    let driver = |name: &str, weight: f64, threshold: f64| CuriosityDriverConfig {
        name: name.to_string(),
        weight,
        threshold,
        enabled: true,
    };
    vec![
        driver("novelty", 0.3, 0.5),
        driver("uncertainty", 0.25, 0.6),
        driver("complexity", 0.2, 0.4),
        driver("social", 0.25, 0.5),
    ]
}

fn default_max_actions_per_minute() -> usize {
    30
}

fn default_audit_capacity() -> usize {
    1_000
}

impl Config {
    /// Load configuration from the default location (~/.mindloop/config.toml)
    ///
    /// Falls back to the built-in defaults when the file does not exist.
    pub fn load_or_default() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            let config = Self::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.mindloop/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".mindloop").join("config.toml"))
    }

    /// The agent identity described by this configuration
    pub fn agent_profile(&self) -> AgentProfile {
        AgentProfile::new(
            self.core.agent_id.clone(),
            self.core.agent_name.clone(),
            self.personality.traits.clone(),
        )
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` describing the first invalid value, or
    /// the rule/pattern error for malformed constraints and patterns.
    pub fn validate(&self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if self.core.agent_id.trim().is_empty() {
            return Err(EngineError::Config("agent_id must not be empty".to_string()));
        }

        let autonomy = &self.autonomy;
        check_unit("autonomy_level", autonomy.autonomy_level)?;
        check_unit("curiosity_weight", autonomy.curiosity_weight)?;

        if autonomy.tick_interval_ms == 0 {
            return Err(EngineError::Config("tick_interval_ms must be greater than 0".to_string()));
        }
        if autonomy.max_concurrent_actions == 0 {
            return Err(EngineError::Config(
                "max_concurrent_actions must be at least 1".to_string(),
            ));
        }
        if autonomy.max_goals == 0 {
            return Err(EngineError::Config("max_goals must be at least 1".to_string()));
        }
        if autonomy.planning_horizon_ms <= 0 {
            return Err(EngineError::Config(
                "planning_horizon_ms must be greater than 0".to_string(),
            ));
        }
        if autonomy.decision_cooldown_ms < 0 {
            return Err(EngineError::Config(
                "decision_cooldown_ms must not be negative".to_string(),
            ));
        }
        if autonomy.shutdown_poll_ms == 0 {
            return Err(EngineError::Config("shutdown_poll_ms must be greater than 0".to_string()));
        }

        for goal in &autonomy.goals {
            if goal.description.trim().is_empty() {
                return Err(EngineError::Config("goal description must not be empty".to_string()));
            }
            check_unit(&format!("goal '{}' priority", goal.description), goal.priority)?;
        }

        for driver in &self.curiosity.drivers {
            check_unit(&format!("curiosity driver '{}' weight", driver.name), driver.weight)?;
            check_unit(
                &format!("curiosity driver '{}' threshold", driver.name),
                driver.threshold,
            )?;
        }

        self.validate_ethics()
    }

    fn validate_ethics(&self) -> Result<(), EngineError> {
        let ethics = &self.ethics;

        if ethics.max_actions_per_minute == 0 {
            return Err(EngineError::Config(
                "max_actions_per_minute must be at least 1".to_string(),
            ));
        }

        let mut known: Vec<String> = default_principles().into_iter().map(|p| p.id).collect();
        for principle in &ethics.custom_principles {
            check_unit(&format!("principle '{}' weight", principle.id), principle.weight)?;
            known.push(principle.id.clone());
        }

        for id in &ethics.principles {
            if !known.contains(id) {
                return Err(EngineError::Config(format!(
                    "Unknown principle '{}'. Must be one of: {}",
                    id,
                    known.join(", ")
                )));
            }
        }

        for constraint in &ethics.constraints {
            if constraint.id.trim().is_empty() {
                return Err(EngineError::Config("constraint id must not be empty".to_string()));
            }
            constraint.rule.validate()?;
        }

        // Compiling validates names and patterns
        PatternDetector::new(&ethics.patterns)?;

        Ok(())
    }
}

fn check_unit(name: &str, value: f64) -> Result<(), EngineError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(EngineError::Config(format!(
            "{} must be between 0.0 and 1.0",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.autonomy.tick_interval_ms, 1_000);
        assert_eq!(config.autonomy.max_goals, 3);
        assert_eq!(config.autonomy.decision_cooldown_ms, 5_000);
        assert_eq!(config.ethics.max_actions_per_minute, 30);
        assert_eq!(config.ethics.audit_capacity, 1_000);
        assert_eq!(config.ethics.intervention_level, InterventionLevel::Blocking);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_is_valid() {
        let config = Config::from_toml_str("").unwrap();
        assert!(config.autonomy.enabled);
        assert_eq!(config.curiosity.drivers.len(), 4);
    }

    #[test]
    fn test_invalid_log_level() {
        let err = Config::from_toml_str("[core]\nlog_level = \"loud\"").unwrap_err();
        assert!(err.to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_out_of_range_tunable() {
        let err = Config::from_toml_str("[autonomy]\ncuriosity_weight = 1.5").unwrap_err();
        assert!(err.to_string().contains("curiosity_weight"));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        assert!(Config::from_toml_str("[autonomy]\nmax_concurrent_actions = 0").is_err());
    }

    #[test]
    fn test_unknown_principle_rejected() {
        let err = Config::from_toml_str("[ethics]\nprinciples = [\"kindness\"]").unwrap_err();
        assert!(err.to_string().contains("Unknown principle"));
    }

    #[test]
    fn test_custom_principle_selectable() {
        let src = r#"
[ethics]
principles = ["harm_prevention", "kindness"]

[[ethics.custom_principles]]
id = "kindness"
name = "Be kind"
weight = 0.6
mandatory = false
"#;
        let config = Config::from_toml_str(src).unwrap();
        assert_eq!(config.ethics.custom_principles[0].id, "kindness");
    }

    #[test]
    fn test_agent_profile() {
        let config = Config::from_toml_str(
            "[core]\nagent_id = \"a1\"\nagent_name = \"Nyx\"\n[personality]\ntraits = [\"social\"]",
        )
        .unwrap();
        let agent = config.agent_profile();
        assert_eq!(agent.id, "a1");
        assert!(agent.has_trait("social"));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_string = toml::to_string(&config).unwrap();

        let deserialized = Config::from_toml_str(&toml_string).unwrap();
        assert_eq!(config.core.log_level, deserialized.core.log_level);
        assert_eq!(
            config.autonomy.max_concurrent_actions,
            deserialized.autonomy.max_concurrent_actions
        );
    }
}

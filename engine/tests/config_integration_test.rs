//! Integration tests for configuration management
//!
//! These tests verify that the Config struct can be loaded from disk,
//! validated, and fed to the engine components it configures.

use chrono::{TimeZone, Utc};
use mindloop_engine::autonomy::{AutonomousLoop, LoopDependencies};
use mindloop_engine::clock::ManualClock;
use mindloop_engine::config::Config;
use mindloop_engine::ethics::{EthicsEngine, InterventionLevel, Rule, Severity};
use mindloop_engine::executors::ExecutorRegistry;
use mindloop_engine::interaction::LoggingChannel;
use mindloop_engine::message_bus::MessageBus;
use mindloop_engine::pattern_detector::PatternLevel;
use sdk::errors::EngineError;
use sdk::types::{ActionCategory, GoalType};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn write_config(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_load_full_config_from_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[core]
agent_id = "ada"
agent_name = "Ada"
log_level = "debug"

[autonomy]
tick_interval_ms = 250
autonomy_level = 0.5
curiosity_weight = 0.4
max_concurrent_actions = 2
max_goals = 5
decision_cooldown_ms = 1000

[personality]
traits = ["curious", "social"]

[[curiosity.drivers]]
name = "novelty"
weight = 1.0
threshold = 0.2

[ethics]
strict_mode = true
intervention_level = "preventive"
max_actions_per_minute = 10
prohibited_actions = ["delete_system_files"]
requires_approval = ["send_email"]
audit_capacity = 50

[[ethics.constraints]]
id = "privacy_no_location_sharing"
principle_id = "privacy"
kind = "hard"
severity = "high"
description = "Do not share a human's location"

[ethics.constraints.rule]
type = "all"
rules = [
    { type = "verb_contains", value = "share" },
    { type = "param_exists", key = "location" },
]

[[ethics.patterns]]
name = "phishing"
pattern = "(?i)verify your account"
level = "danger"
"#,
    );

    let config = Config::load_from_path(&path).unwrap();

    assert_eq!(config.core.agent_id, "ada");
    assert_eq!(config.core.log_level, "debug");
    assert_eq!(config.autonomy.tick_interval_ms, 250);
    assert_eq!(config.autonomy.max_goals, 5);
    // Unset fields keep their defaults
    assert!(config.autonomy.interruptible);
    assert_eq!(config.autonomy.shutdown_timeout_secs, 30);

    let agent = config.agent_profile();
    assert!(agent.has_trait("social"));

    assert_eq!(config.curiosity.drivers.len(), 1);
    assert!(config.curiosity.drivers[0].enabled);

    assert!(config.ethics.strict_mode);
    assert_eq!(config.ethics.intervention_level, InterventionLevel::Preventive);
    assert_eq!(config.ethics.audit_capacity, 50);
    assert_eq!(config.ethics.constraints.len(), 1);
    assert_eq!(config.ethics.constraints[0].severity, Severity::High);
    assert!(matches!(config.ethics.constraints[0].rule, Rule::All { .. }));
    assert_eq!(config.ethics.patterns[0].level, PatternLevel::Danger);
}

#[test]
fn test_empty_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "");

    let config = Config::load_from_path(&path).unwrap();
    assert_eq!(config.core.agent_id, "mindloop-agent");
    assert_eq!(config.autonomy.tick_interval_ms, 1000);
    assert_eq!(config.autonomy.max_concurrent_actions, 3);
    assert_eq!(config.ethics.max_actions_per_minute, 30);
    assert_eq!(config.curiosity.drivers.len(), 4);
}

#[test]
fn test_missing_file_is_config_error() {
    let dir = TempDir::new().unwrap();
    let err = Config::load_from_path(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));
}

#[test]
fn test_invalid_values_rejected() {
    let dir = TempDir::new().unwrap();

    for contents in [
        "[core]\nlog_level = \"loud\"",
        "[autonomy]\ntick_interval_ms = 0",
        "[autonomy]\nautonomy_level = 1.5",
        "[autonomy]\nmax_concurrent_actions = 0",
        "[[autonomy.goals]]\ndescription = \"Overreach\"\npriority = 1.5",
        "[[autonomy.goals]]\ndescription = \"\"\npriority = 0.5",
        "[ethics]\nmax_actions_per_minute = 0",
        "[ethics]\nprinciples = [\"obedience\"]",
    ] {
        let path = write_config(&dir, contents);
        assert!(
            Config::load_from_path(&path).is_err(),
            "expected rejection of: {}",
            contents
        );
    }
}

#[test]
fn test_malformed_pattern_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[[ethics.patterns]]
name = ""
pattern = "x"
level = "warning"
"#,
    );

    let err = Config::load_from_path(&path).unwrap_err();
    assert!(matches!(err, EngineError::InvalidPattern { .. }));
}

#[test]
fn test_malformed_rule_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[[ethics.constraints]]
id = "broken"
principle_id = "privacy"
kind = "soft"
severity = "low"
description = "Empty combinator"

[ethics.constraints.rule]
type = "any"
rules = []
"#,
    );

    let err = Config::load_from_path(&path).unwrap_err();
    assert!(matches!(err, EngineError::InvalidRule(_)));
}

const GOALS_TOML: &str = r#"
[autonomy]
max_goals = 2

[[autonomy.goals]]
description = "Finish the reading list"
type = "long_term"
priority = 0.7
focus = "learning"
deadline = "2026-12-31T00:00:00Z"

[[autonomy.goals]]
description = "Say hello to the new neighbour"
priority = 0.4

[[autonomy.goals]]
description = "Reorganise the notes"
priority = 0.3
"#;

#[test]
fn test_initial_goals_parsed() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, GOALS_TOML);

    let config = Config::load_from_path(&path).unwrap();
    let goals = &config.autonomy.goals;
    assert_eq!(goals.len(), 3);

    let reading = goals[0].to_goal();
    assert_eq!(reading.goal_type, GoalType::LongTerm);
    assert_eq!(reading.priority, 0.7);
    assert_eq!(reading.focus, Some(ActionCategory::Learning));
    assert_eq!(reading.deadline, Some(Utc.with_ymd_and_hms(2026, 12, 31, 0, 0, 0).unwrap()));
    assert_eq!(reading.progress, 0.0);

    // Type defaults to short term, focus and deadline to none
    assert_eq!(goals[1].goal_type, GoalType::ShortTerm);
    assert!(goals[1].focus.is_none());
    assert!(goals[1].deadline.is_none());
}

#[test]
fn test_initial_goals_seed_loop_up_to_cap() {
    let config = Config::from_toml_str(GOALS_TOML).unwrap();
    let clock = Arc::new(ManualClock::at_hour(10));
    let deps = LoopDependencies {
        ethics: Arc::new(EthicsEngine::new(&config.ethics, clock.clone()).unwrap()),
        executors: Arc::new(ExecutorRegistry::with_logging_defaults()),
        channel: Arc::new(LoggingChannel::new()),
        bus: Arc::new(MessageBus::new()),
        clock,
    };

    let agent_loop = AutonomousLoop::new(&config, deps);
    let goals = agent_loop.goals();
    assert_eq!(goals.len(), 2);
    assert_eq!(goals[0].description, "Finish the reading list");
    assert_eq!(goals[1].description, "Say hello to the new neighbour");
    assert!(goals.iter().all(|g| g.description != "Reorganise the notes"));
}

//! Integration tests for the policy engine
//!
//! Drives `EthicsEngine` through its public API with a manual clock and
//! checks verdicts, counters and the audit trail together.

use mindloop_engine::clock::ManualClock;
use mindloop_engine::config::{Config, EthicsConfig};
use mindloop_engine::ethics::{
    AuditDecision, ConstraintKind, EthicalConstraint, EthicsEngine, InterventionLevel, Rule,
    Severity,
};
use sdk::types::{Action, ActionCategory, AgentProfile, DecisionContext};
use std::sync::Arc;

fn agent() -> AgentProfile {
    AgentProfile::new("agent-1", "Test", vec!["curious".to_string()])
}

fn engine(config: EthicsConfig) -> (EthicsEngine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::at_hour(10));
    let engine = EthicsEngine::new(&config, clock.clone()).unwrap();
    (engine, clock)
}

#[test]
fn test_prohibited_action_is_blocked_and_audited() {
    let config = EthicsConfig {
        prohibited_actions: vec!["delete_system_files".to_string()],
        ..Default::default()
    };
    let (engine, _) = engine(config);

    let action = Action::new(ActionCategory::Maintenance, "delete_system_files");
    let evaluation = engine
        .evaluate(&agent(), &action, &DecisionContext::default())
        .unwrap();

    assert!(!evaluation.allowed);
    assert_eq!(evaluation.violations.len(), 1);
    assert_eq!(evaluation.violations[0].severity, Severity::Critical);
    assert_eq!(evaluation.violations[0].constraint_id, "safety_prohibited_action");

    let records = engine.audit_records(10);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].decision, AuditDecision::Blocked);
    assert_eq!(records[0].action.verb, "delete_system_files");

    let stats = engine.stats();
    assert_eq!(stats.total_evaluations, 1);
    assert_eq!(stats.blocked, 1);
    assert_eq!(stats.violations_by_principle.get("safety"), Some(&1));
}

#[test]
fn test_disabled_engine_allows_everything() {
    let config = EthicsConfig {
        enabled: false,
        prohibited_actions: vec!["delete_system_files".to_string()],
        ..Default::default()
    };
    let (engine, _) = engine(config);

    for verb in ["delete_system_files", "deceive_user", "read_article"] {
        let evaluation = engine
            .evaluate(
                &agent(),
                &Action::new(ActionCategory::Maintenance, verb),
                &DecisionContext::default(),
            )
            .unwrap();
        assert!(evaluation.allowed);
        assert_eq!(evaluation.confidence, 1.0);
        assert_eq!(evaluation.reasoning, vec!["Ethics engine disabled".to_string()]);
    }
}

#[test]
fn test_rate_limit_blocks_thirty_first_action() {
    let (engine, clock) = engine(EthicsConfig::default());
    let action = Action::new(ActionCategory::Learning, "read_article");
    let ctx = DecisionContext::default();

    for _ in 0..30 {
        let evaluation = engine.evaluate(&agent(), &action, &ctx).unwrap();
        assert!(evaluation.allowed);
        clock.advance_millis(100);
    }

    let evaluation = engine.evaluate(&agent(), &action, &ctx).unwrap();
    assert!(!evaluation.allowed);
    assert!(evaluation
        .violations
        .iter()
        .any(|v| v.constraint_id == "safety_rate_limit" && v.severity == Severity::High));

    // The window slides: a minute later the agent may act again
    clock.advance_millis(60_000);
    let evaluation = engine.evaluate(&agent(), &action, &ctx).unwrap();
    assert!(evaluation.allowed);
}

#[test]
fn test_audit_log_is_bounded() {
    let config = EthicsConfig {
        audit_capacity: 5,
        max_actions_per_minute: 1_000,
        ..Default::default()
    };
    let (engine, _) = engine(config);

    for i in 0..12 {
        let action = Action::new(ActionCategory::Learning, format!("read_chapter_{}", i));
        engine
            .evaluate(&agent(), &action, &DecisionContext::default())
            .unwrap();
    }

    assert_eq!(engine.audit_len(), 5);
    let records = engine.audit_records(5);
    assert_eq!(records.last().unwrap().action.verb, "read_chapter_11");
    assert_eq!(engine.stats().total_evaluations, 12);

    engine.clear_audit_log();
    assert_eq!(engine.audit_len(), 0);
}

#[test]
fn test_advisory_level_lets_non_critical_denial_through() {
    let config = EthicsConfig {
        intervention_level: InterventionLevel::Advisory,
        max_actions_per_minute: 1,
        ..Default::default()
    };
    let (engine, _) = engine(config);
    let action = Action::new(ActionCategory::Learning, "read_article");
    let ctx = DecisionContext::default();

    engine.evaluate(&agent(), &action, &ctx).unwrap();
    let evaluation = engine.evaluate(&agent(), &action, &ctx).unwrap();

    assert!(evaluation.allowed);
    assert!(!evaluation.violations.is_empty());
    assert_eq!(engine.audit_records(1)[0].decision, AuditDecision::Modified);
}

#[test]
fn test_registered_constraint_applies_immediately() {
    let (engine, _) = engine(EthicsConfig::default());
    let action = Action::new(ActionCategory::Social, "share_location")
        .with_param("location", serde_json::json!("home"));
    let ctx = DecisionContext::default();

    let before = engine.evaluate(&agent(), &action, &ctx).unwrap();
    assert!(before
        .violations
        .iter()
        .all(|v| v.constraint_id != "privacy_no_location_sharing"));

    engine
        .register_constraint(EthicalConstraint {
            id: "privacy_no_location_sharing".to_string(),
            principle_id: "privacy".to_string(),
            kind: ConstraintKind::Hard,
            rule: Rule::All {
                rules: vec![
                    Rule::VerbContains {
                        value: "share".to_string(),
                    },
                    Rule::ParamExists {
                        key: "location".to_string(),
                    },
                ],
            },
            severity: Severity::High,
            description: "Do not share a human's location".to_string(),
            remediation: None,
        })
        .unwrap();

    let after = engine.evaluate(&agent(), &action, &ctx).unwrap();
    assert!(after
        .violations
        .iter()
        .any(|v| v.constraint_id == "privacy_no_location_sharing"));

    assert!(engine.remove_constraint("privacy_no_location_sharing"));
    assert!(!engine.remove_constraint("privacy_no_location_sharing"));
}

#[test]
fn test_engine_from_toml_config() {
    let config = Config::from_toml_str(
        r#"
[ethics]
strict_mode = true
principles = ["harm_prevention", "privacy"]
prohibited_actions = ["format_disk"]
"#,
    )
    .unwrap();
    let (engine, _) = engine(config.ethics);

    assert_eq!(engine.principles().len(), 2);
    let evaluation = engine
        .evaluate(
            &agent(),
            &Action::new(ActionCategory::Maintenance, "format_disk"),
            &DecisionContext::default(),
        )
        .unwrap();
    assert!(!evaluation.allowed);
}

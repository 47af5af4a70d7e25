use proptest::prelude::*;
use mindloop_engine::autonomy::{CuriosityModel, PhaseSchedule};
use mindloop_engine::config::{Config, CuriosityDriverConfig};
use mindloop_engine::ethics::aggregation::aggregate;
use mindloop_engine::ethics::{AuditLog, EthicalViolation, Severity};
use mindloop_engine::rate_limiter::RateLimiter;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn severity() -> impl Strategy<Value = Severity> {
    prop_oneof![
        Just(Severity::Low),
        Just(Severity::Medium),
        Just(Severity::High),
        Just(Severity::Critical),
    ]
}

fn violations(severities: &[Severity]) -> Vec<EthicalViolation> {
    severities
        .iter()
        .enumerate()
        .map(|(i, s)| EthicalViolation::new("harm_prevention", format!("check_{}", i), *s, "test"))
        .collect()
}

// The verdict depends only on which severities were reported, never on the
// order in which the checks reported them
proptest! {
    #[test]
    fn test_aggregation_is_order_independent(
        severities in prop::collection::vec(severity(), 0..12),
        strict in any::<bool>(),
        seed in any::<u64>(),
    ) {
        let forward = aggregate(&violations(&severities), strict);

        let mut shuffled = severities.clone();
        let mut rng = StdRng::seed_from_u64(seed);
        rand::seq::SliceRandom::shuffle(shuffled.as_mut_slice(), &mut rng);
        let permuted = aggregate(&violations(&shuffled), strict);

        prop_assert_eq!(forward.allowed, permuted.allowed);
        prop_assert!((forward.confidence - permuted.confidence).abs() < 1e-12);
    }

    #[test]
    fn test_any_critical_blocks(
        severities in prop::collection::vec(severity(), 0..8),
        strict in any::<bool>(),
    ) {
        let mut severities = severities;
        severities.push(Severity::Critical);
        let verdict = aggregate(&violations(&severities), strict);
        prop_assert!(!verdict.allowed);
        prop_assert_eq!(verdict.confidence, 1.0);
    }

    #[test]
    fn test_confidence_in_unit_range(
        severities in prop::collection::vec(severity(), 0..20),
        strict in any::<bool>(),
    ) {
        let verdict = aggregate(&violations(&severities), strict);
        prop_assert!((0.0..=1.0).contains(&verdict.confidence));
    }
}

// Every hour of the day resolves to exactly one phase
proptest! {
    #[test]
    fn test_every_hour_has_a_phase(hour in 0u32..24) {
        let schedule = PhaseSchedule::default_day();
        let phase = schedule.phase_for_hour(hour);
        prop_assert!(schedule.phases().any(|p| p.name == phase.name));
        prop_assert_eq!(&schedule.phase_for_hour(hour).name, &phase.name);
    }
}

// The audit log never grows past its capacity and keeps the newest records
proptest! {
    #[test]
    fn test_audit_log_bounded(capacity in 1usize..50, appends in 0usize..200) {
        use mindloop_engine::ethics::{AuditDecision, AuditRecord, EthicalEvaluation};
        use sdk::types::{Action, ActionCategory};

        let mut log = AuditLog::new(capacity);
        for i in 0..appends {
            log.append(AuditRecord {
                id: i.to_string(),
                timestamp: chrono::Utc::now(),
                agent_id: "agent".to_string(),
                action: Action::new(ActionCategory::Learning, "read_article"),
                evaluation: EthicalEvaluation::disabled(),
                decision: AuditDecision::Allowed,
                justification: String::new(),
            });
            prop_assert!(log.len() <= capacity);
        }

        prop_assert_eq!(log.len(), appends.min(capacity));
        if appends > 0 {
            let newest = log.recent(1);
            prop_assert_eq!(&newest[0].id, &(appends - 1).to_string());
        }
    }
}

// Within one window the limiter admits exactly `limit` actions
proptest! {
    #[test]
    fn test_rate_limit_window(limit in 1usize..40, attempts in 1usize..80) {
        let limiter = RateLimiter::new(limit);
        let mut admitted = 0;
        for i in 0..attempts {
            if !limiter.record_and_check("agent", i as i64).exceeded() {
                admitted += 1;
            }
        }
        prop_assert_eq!(admitted, attempts.min(limit));
    }
}

// Curiosity scores stay in [0, 1] for any valid driver set
proptest! {
    #[test]
    fn test_curiosity_score_in_unit_range(
        weights in prop::collection::vec((0.0..=1.0f64, 0.0..=1.0f64), 0..6),
        seed in any::<u64>(),
    ) {
        let drivers = weights
            .iter()
            .enumerate()
            .map(|(i, (weight, threshold))| CuriosityDriverConfig {
                name: format!("driver_{}", i),
                weight: *weight,
                threshold: *threshold,
                enabled: true,
            })
            .collect();
        let model = CuriosityModel::new(drivers);
        let mut rng = StdRng::seed_from_u64(seed);
        let score = model.score(&mut rng);
        prop_assert!((0.0..=1.0).contains(&score));
    }
}

// Serializing a valid configuration and parsing it back preserves it
proptest! {
    #[test]
    fn test_config_round_trip(
        log_level in "error|warn|info|debug|trace",
        tick in 1u64..10_000,
        autonomy_level in 0.0..=1.0f64,
        max_goals in 1usize..10,
        strict in any::<bool>(),
    ) {
        let mut config = Config::default();
        config.core.log_level = log_level.clone();
        config.autonomy.tick_interval_ms = tick;
        config.autonomy.autonomy_level = autonomy_level;
        config.autonomy.max_goals = max_goals;
        config.ethics.strict_mode = strict;

        let text = toml::to_string(&config).expect("Failed to serialize config");
        let parsed = Config::from_toml_str(&text).expect("Failed to parse serialized config");

        prop_assert_eq!(parsed.core.log_level, log_level);
        prop_assert_eq!(parsed.autonomy.tick_interval_ms, tick);
        prop_assert!((parsed.autonomy.autonomy_level - autonomy_level).abs() < 1e-12);
        prop_assert_eq!(parsed.autonomy.max_goals, max_goals);
        prop_assert_eq!(parsed.ethics.strict_mode, strict);
    }
}

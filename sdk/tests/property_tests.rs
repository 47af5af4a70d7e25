use proptest::prelude::*;
use sdk::errors::{AgentErrorExt, EngineError};
use sdk::types::{Action, ActionCategory, ActionStatus};

fn category() -> impl Strategy<Value = ActionCategory> {
    prop_oneof![
        Just(ActionCategory::Communication),
        Just(ActionCategory::Learning),
        Just(ActionCategory::Cognitive),
        Just(ActionCategory::Creative),
        Just(ActionCategory::Social),
        Just(ActionCategory::Exploration),
        Just(ActionCategory::Maintenance),
    ]
}

// Every error carries a non-empty, static hint that never echoes its payload
proptest! {
    #[test]
    fn test_error_user_hint_completeness(error_str in "[a-z]{12,24}", n in 0usize..100) {
        let errs = vec![
            EngineError::Config(error_str.clone()),
            EngineError::UnknownPhase(error_str.clone()),
            EngineError::InvalidRule(error_str.clone()),
            EngineError::InvalidPattern { name: error_str.clone(), reason: error_str.clone() },
            EngineError::PolicyEvaluation(error_str.clone()),
            EngineError::ExecutorNotFound(error_str.clone()),
            EngineError::Executor(error_str.clone()),
            EngineError::ConcurrencyLimit { active: n, limit: n },
            EngineError::Behavior { id: error_str.clone(), reason: error_str.clone() },
            EngineError::Interaction(error_str.clone()),
            EngineError::ShutdownTimeout(n),
            EngineError::Panicked(error_str.clone()),
        ];

        for err in errs {
            let hint = err.user_hint();
            prop_assert!(!hint.is_empty());
            prop_assert!(!hint.contains(&error_str));
        }
    }
}

// A fresh action is pending and routed by its category
proptest! {
    #[test]
    fn test_new_action_defaults(verb in "[a-z_]{1,24}", category in category()) {
        let action = Action::new(category, verb.clone());
        prop_assert_eq!(action.status, ActionStatus::Pending);
        prop_assert_eq!(action.target_executor.as_str(), category.default_executor());
        prop_assert_eq!(action.verb, verb);
        prop_assert!(action.result.is_none());
        prop_assert!(action.priority.is_none());
    }

    #[test]
    fn test_priority_is_clamped(priority in -10.0..10.0f64) {
        let action = Action::new(ActionCategory::Learning, "read_article").with_priority(priority);
        let clamped = action.priority.unwrap_or(-1.0);
        prop_assert!((0.0..=1.0).contains(&clamped));
    }
}

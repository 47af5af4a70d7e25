//! Declarative constraint rules
//!
//! Constraints are data rather than code: a small tree of matchers and
//! combinators that can live in `config.toml`, be logged, and be tested in
//! isolation. A rule describes the *violating* condition.
//!
//! ```toml
//! [[ethics.constraints]]
//! id = "privacy_no_location_sharing"
//! principle_id = "privacy"
//! kind = "hard"
//! severity = "high"
//! description = "Do not share a human's location"
//!
//! [ethics.constraints.rule]
//! type = "all"
//! rules = [
//!     { type = "verb_contains", value = "share" },
//!     { type = "param_exists", key = "location" },
//! ]
//! ```
//!
//! The engine holds rules as [`CompiledRule`]s, so regular expressions are
//! compiled once when a constraint is registered.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use sdk::errors::EngineError;
use sdk::types::{Action, ActionCategory, DecisionContext};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Rule {
    /// Verb equals `value` exactly
    VerbEquals { value: String },
    /// Verb contains `value` (case-insensitive)
    VerbContains { value: String },
    /// Verb matches the regular expression `pattern`
    VerbMatches { pattern: String },
    CategoryIs { category: ActionCategory },
    ExecutorIs { value: String },
    ParamExists { key: String },
    ParamEquals { key: String, value: serde_json::Value },
    /// Parameter, rendered as text, contains `value` (case-insensitive)
    ParamContains { key: String, value: String },
    /// Action priority strictly above `threshold`
    PriorityAbove { threshold: f64 },
    /// The decision context lists situational constraint `value`
    ContextHasConstraint { value: String },
    All { rules: Vec<Rule> },
    Any { rules: Vec<Rule> },
    Not { rule: Box<Rule> },
}

impl Rule {
    /// Evaluate the rule against an action in context
    ///
    /// Compiles the rule on every call. Use [`CompiledRule`] to evaluate the
    /// same rule repeatedly.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRule` for malformed rules (bad regex, empty
    /// combinator). Callers treat an error as "not violated".
    pub fn evaluate(&self, action: &Action, ctx: &DecisionContext) -> Result<bool, EngineError> {
        CompiledRule::compile(self.clone())?.evaluate(action, ctx)
    }

    /// Check the rule is well-formed without evaluating it
    pub fn validate(&self) -> Result<(), EngineError> {
        self.compile_into(&mut HashMap::new())
    }

    fn compile_into(&self, regexes: &mut HashMap<String, Regex>) -> Result<(), EngineError> {
        match self {
            Rule::VerbMatches { pattern } => {
                if !regexes.contains_key(pattern) {
                    let re = Regex::new(pattern)
                        .map_err(|e| EngineError::InvalidRule(format!("bad regex '{}': {}", pattern, e)))?;
                    regexes.insert(pattern.clone(), re);
                }
                Ok(())
            }
            Rule::VerbEquals { value }
            | Rule::VerbContains { value }
            | Rule::ExecutorIs { value }
            | Rule::ContextHasConstraint { value } => {
                if value.is_empty() {
                    Err(EngineError::InvalidRule("empty match value".to_string()))
                } else {
                    Ok(())
                }
            }
            Rule::ParamExists { key }
            | Rule::ParamEquals { key, .. }
            | Rule::ParamContains { key, .. } => {
                if key.is_empty() {
                    Err(EngineError::InvalidRule("empty parameter key".to_string()))
                } else {
                    Ok(())
                }
            }
            Rule::All { rules } | Rule::Any { rules } => {
                if rules.is_empty() {
                    return Err(EngineError::InvalidRule("combinator has no rules".to_string()));
                }
                rules.iter().try_for_each(|rule| rule.compile_into(regexes))
            }
            Rule::Not { rule } => rule.compile_into(regexes),
            Rule::CategoryIs { .. } | Rule::PriorityAbove { .. } => Ok(()),
        }
    }

    fn matches(
        &self,
        action: &Action,
        ctx: &DecisionContext,
        regexes: &HashMap<String, Regex>,
    ) -> Result<bool, EngineError> {
        match self {
            Rule::VerbEquals { value } => Ok(action.verb == *value),
            Rule::VerbContains { value } => Ok(contains_ci(&action.verb, value)),
            Rule::VerbMatches { pattern } => regexes
                .get(pattern)
                .map(|re| re.is_match(&action.verb))
                .ok_or_else(|| EngineError::InvalidRule(format!("regex '{}' was not compiled", pattern))),
            Rule::CategoryIs { category } => Ok(action.category == *category),
            Rule::ExecutorIs { value } => Ok(action.target_executor == *value),
            Rule::ParamExists { key } => Ok(action.params.contains_key(key)),
            Rule::ParamEquals { key, value } => Ok(action.params.get(key) == Some(value)),
            Rule::ParamContains { key, value } => Ok(action
                .params
                .get(key)
                .map(|v| match v {
                    serde_json::Value::String(s) => contains_ci(s, value),
                    other => contains_ci(&other.to_string(), value),
                })
                .unwrap_or(false)),
            Rule::PriorityAbove { threshold } => {
                Ok(action.priority.is_some_and(|p| p > *threshold))
            }
            Rule::ContextHasConstraint { value } => Ok(ctx.constraints.iter().any(|c| c == value)),
            Rule::All { rules } => {
                for rule in rules {
                    if !rule.matches(action, ctx, regexes)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Rule::Any { rules } => {
                for rule in rules {
                    if rule.matches(action, ctx, regexes)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Rule::Not { rule } => Ok(!rule.matches(action, ctx, regexes)?),
        }
    }
}

/// A validated rule with its regular expressions compiled
#[derive(Debug, Clone)]
pub struct CompiledRule {
    rule: Rule,
    regexes: HashMap<String, Regex>,
}

impl CompiledRule {
    /// Validate `rule` and compile each distinct regex it uses
    pub fn compile(rule: Rule) -> Result<Self, EngineError> {
        let mut regexes = HashMap::new();
        rule.compile_into(&mut regexes)?;
        Ok(Self { rule, regexes })
    }

    pub fn evaluate(&self, action: &Action, ctx: &DecisionContext) -> Result<bool, EngineError> {
        self.rule.matches(action, ctx, &self.regexes)
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    /// Number of distinct compiled regular expressions
    pub fn regex_count(&self) -> usize {
        self.regexes.len()
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn share_action() -> Action {
        Action::new(ActionCategory::Communication, "share_profile")
            .with_param("personal_data", json!({"email": "a@b.c"}))
            .with_param("channel", json!("Public Forum"))
            .with_param("consent", json!(false))
            .with_priority(0.9)
    }

    #[test]
    fn test_leaf_matchers() {
        let action = share_action();
        let ctx = DecisionContext::default().with_constraint("quiet_hours");

        let cases = vec![
            (Rule::VerbEquals { value: "share_profile".into() }, true),
            (Rule::VerbEquals { value: "share".into() }, false),
            (Rule::VerbContains { value: "SHARE".into() }, true),
            (Rule::VerbMatches { pattern: "^share_".into() }, true),
            (Rule::CategoryIs { category: ActionCategory::Communication }, true),
            (Rule::CategoryIs { category: ActionCategory::Learning }, false),
            (Rule::ExecutorIs { value: "communication".into() }, true),
            (Rule::ParamExists { key: "personal_data".into() }, true),
            (Rule::ParamExists { key: "location".into() }, false),
            (Rule::ParamEquals { key: "consent".into(), value: json!(false) }, true),
            (Rule::ParamContains { key: "channel".into(), value: "public".into() }, true),
            (Rule::ParamContains { key: "personal_data".into(), value: "a@b".into() }, true),
            (Rule::PriorityAbove { threshold: 0.8 }, true),
            (Rule::PriorityAbove { threshold: 0.9 }, false),
            (Rule::ContextHasConstraint { value: "quiet_hours".into() }, true),
        ];

        for (rule, expected) in cases {
            assert_eq!(rule.evaluate(&action, &ctx).unwrap(), expected, "{:?}", rule);
        }
    }

    #[test]
    fn test_combinators() {
        let action = share_action();
        let ctx = DecisionContext::default();

        let rule = Rule::All {
            rules: vec![
                Rule::VerbContains { value: "share".into() },
                Rule::Any {
                    rules: vec![
                        Rule::ParamExists { key: "location".into() },
                        Rule::ParamExists { key: "personal_data".into() },
                    ],
                },
            ],
        };
        assert!(rule.evaluate(&action, &ctx).unwrap());

        let rule = Rule::Not {
            rule: Box::new(Rule::VerbContains { value: "share".into() }),
        };
        assert!(!rule.evaluate(&action, &ctx).unwrap());
    }

    #[test]
    fn test_malformed_rules_error() {
        let action = share_action();
        let ctx = DecisionContext::default();

        let rule = Rule::VerbMatches { pattern: "(".into() };
        assert!(matches!(rule.evaluate(&action, &ctx), Err(EngineError::InvalidRule(_))));
        assert!(rule.validate().is_err());

        let rule = Rule::Any { rules: vec![] };
        assert!(rule.evaluate(&action, &ctx).is_err());
        assert!(rule.validate().is_err());

        let rule = Rule::Not {
            rule: Box::new(Rule::ParamExists { key: String::new() }),
        };
        assert!(rule.validate().is_err());
    }

    #[test]
    fn test_compiled_rule_compiles_each_regex_once() {
        let rule = Rule::Any {
            rules: vec![
                Rule::VerbMatches { pattern: "^share_".into() },
                Rule::Not {
                    rule: Box::new(Rule::VerbMatches { pattern: "^share_".into() }),
                },
                Rule::VerbMatches { pattern: "_profile$".into() },
            ],
        };
        let compiled = CompiledRule::compile(rule).unwrap();
        assert_eq!(compiled.regex_count(), 2);

        let ctx = DecisionContext::default();
        assert!(compiled.evaluate(&share_action(), &ctx).unwrap());
        let other = Action::new(ActionCategory::Learning, "read_article");
        // Not(^share_) holds for a non-sharing verb
        assert!(compiled.evaluate(&other, &ctx).unwrap());

        let bad = CompiledRule::compile(Rule::VerbMatches { pattern: "(".into() });
        assert!(matches!(bad, Err(EngineError::InvalidRule(_))));
    }

    #[test]
    fn test_rule_toml_shape() {
        let toml_src = r#"
type = "all"
rules = [
    { type = "verb_contains", value = "share" },
    { type = "param_equals", key = "consent", value = false },
]
"#;
        let rule: Rule = toml::from_str(toml_src).unwrap();
        assert!(rule.validate().is_ok());
        assert!(rule.evaluate(&share_action(), &DecisionContext::default()).unwrap());
    }
}

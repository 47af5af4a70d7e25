use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing;

use sdk::errors::EngineError;
use sdk::types::Action;

/// How dangerous a matched pattern is considered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternLevel {
    Warning,
    Danger,
    Critical,
}

/// A named dangerous pattern as it appears in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSpec {
    pub name: String,
    /// Regular expression, or a plain substring if it is not a valid regex
    pub pattern: String,
    pub level: PatternLevel,
    #[serde(default)]
    pub description: String,
}

impl PatternSpec {
    pub fn new(
        name: impl Into<String>,
        pattern: impl Into<String>,
        level: PatternLevel,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            level,
            description: description.into(),
        }
    }
}

/// Information about one pattern that matched an action
#[derive(Debug, Clone, PartialEq)]
pub struct PatternMatch {
    pub name: String,
    pub level: PatternLevel,
    pub description: String,
    /// The actual text that matched
    pub matched_text: String,
    /// Which part of the action matched ("verb" or "params")
    pub field: &'static str,
}

enum Matcher {
    Regex(Regex),
    /// Lowercased needle for case-insensitive substring matching
    Substring(String),
}

impl Matcher {
    fn find(&self, text: &str) -> Option<String> {
        match self {
            Matcher::Regex(re) => re.find(text).map(|m| m.as_str().to_string()),
            Matcher::Substring(needle) => {
                let haystack = text.to_lowercase();
                haystack.find(needle.as_str()).map(|_| needle.clone())
            }
        }
    }
}

struct CompiledPattern {
    spec: PatternSpec,
    matcher: Matcher,
}

/// Scans actions for dangerous patterns before they are dispatched
///
/// Each pattern is compiled as a regular expression. A pattern that is not a
/// valid regex is kept and matched as a case-insensitive substring instead,
/// so a typo in configuration weakens a pattern but never disables it.
///
/// # Example
///
/// ```
/// use mindloop_engine::pattern_detector::PatternDetector;
/// use sdk::types::{Action, ActionCategory};
///
/// let detector = PatternDetector::with_defaults().unwrap();
/// let action = Action::new(ActionCategory::Maintenance, "run_shell")
///     .with_param("command", serde_json::json!("rm -rf /"));
///
/// let matches = detector.scan_action(&action).unwrap();
/// assert_eq!(matches[0].name, "destructive_shell");
/// ```
pub struct PatternDetector {
    patterns: Vec<CompiledPattern>,
}

impl PatternDetector {
    /// Build a detector from pattern specifications
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern has an empty name or an empty pattern.
    pub fn new(specs: &[PatternSpec]) -> Result<Self, EngineError> {
        let mut patterns = Vec::with_capacity(specs.len());
        for spec in specs {
            if spec.name.trim().is_empty() {
                return Err(EngineError::InvalidPattern {
                    name: spec.name.clone(),
                    reason: "pattern name is empty".to_string(),
                });
            }
            if spec.pattern.is_empty() {
                return Err(EngineError::InvalidPattern {
                    name: spec.name.clone(),
                    reason: "pattern is empty".to_string(),
                });
            }

            let matcher = match Regex::new(&spec.pattern) {
                Ok(re) => Matcher::Regex(re),
                Err(e) => {
                    tracing::debug!(
                        "Pattern '{}' is not a valid regex ({}), using substring match",
                        spec.name,
                        e
                    );
                    Matcher::Substring(spec.pattern.to_lowercase())
                }
            };
            patterns.push(CompiledPattern {
                spec: spec.clone(),
                matcher,
            });
        }
        Ok(Self { patterns })
    }

    /// Build a detector with the built-in pattern set
    pub fn with_defaults() -> Result<Self, EngineError> {
        Self::new(&default_patterns())
    }

    /// Scan free text; returns every pattern that matches
    pub fn scan(&self, text: &str) -> Vec<PatternMatch> {
        self.scan_field(text, "text")
    }

    fn scan_field(&self, text: &str, field: &'static str) -> Vec<PatternMatch> {
        self.patterns
            .iter()
            .filter_map(|p| {
                p.matcher.find(text).map(|matched_text| PatternMatch {
                    name: p.spec.name.clone(),
                    level: p.spec.level,
                    description: p.spec.description.clone(),
                    matched_text,
                    field,
                })
            })
            .collect()
    }

    /// Scan an action's verb and serialized parameters
    ///
    /// A pattern is reported at most once per action, preferring the verb.
    pub fn scan_action(&self, action: &Action) -> Result<Vec<PatternMatch>, EngineError> {
        let params = serde_json::to_string(&action.params)?;

        let mut matches = self.scan_field(&action.verb, "verb");
        for m in self.scan_field(&params, "params") {
            if !matches.iter().any(|existing| existing.name == m.name) {
                matches.push(m);
            }
        }

        for m in &matches {
            tracing::warn!(
                "Dangerous pattern '{}' matched in {} of action {}: {}",
                m.name,
                m.field,
                action.verb,
                m.matched_text
            );
        }
        Ok(matches)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// The built-in dangerous pattern set
pub fn default_patterns() -> Vec<PatternSpec> {
    vec![
        PatternSpec::new(
            "destructive_shell",
            r"rm\s+-rf",
            PatternLevel::Critical,
            "Recursive forced deletion",
        ),
        PatternSpec::new(
            "sql_destruction",
            r"(?i)drop\s+(table|database)",
            PatternLevel::Critical,
            "Destructive database statement",
        ),
        PatternSpec::new(
            "privilege_escalation",
            r"(?i)\bsudo\b",
            PatternLevel::Danger,
            "Attempt to run with elevated privileges",
        ),
        PatternSpec::new(
            "credential_access",
            r"(?i)(password|api[_-]?key|secret[_-]?token|private[_-]?key)",
            PatternLevel::Danger,
            "Access to credentials or secrets",
        ),
        PatternSpec::new(
            "mass_messaging",
            r"(?i)(spam|mass[_ ]?messag)",
            PatternLevel::Warning,
            "Unsolicited bulk messaging",
        ),
        PatternSpec::new(
            "self_modification",
            r"(?i)(modify|rewrite)[_ ](own|self)[_ ]",
            PatternLevel::Danger,
            "Agent modifying its own code or configuration",
        ),
    ]
}

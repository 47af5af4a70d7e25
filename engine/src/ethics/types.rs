//! Ethics data model: principles, constraints, violations, evaluations and
//! audit records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sdk::types::Action;

use super::rules::Rule;

/// Violation severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Weight used by the severity-score aggregation
    pub fn weight(self) -> f64 {
        match self {
            Severity::Critical => 1.0,
            Severity::High => 0.7,
            Severity::Medium => 0.4,
            Severity::Low => 0.2,
        }
    }

    /// High or critical
    pub fn is_serious(self) -> bool {
        self >= Severity::High
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    Hard,
    Soft,
}

/// A value the agent is expected to uphold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EthicalPrinciple {
    pub id: String,
    pub name: String,
    /// 0.0 - 1.0
    pub weight: f64,
    pub mandatory: bool,
    /// Kinds of behavior that violate the principle (documentation and audit)
    #[serde(default)]
    pub violation_archetypes: Vec<String>,
}

/// A declarative rule tied to a principle
///
/// The constraint is violated when its rule evaluates to `true` for the
/// action under evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EthicalConstraint {
    pub id: String,
    pub principle_id: String,
    pub kind: ConstraintKind,
    pub rule: Rule,
    pub severity: Severity,
    pub description: String,
    #[serde(default)]
    pub remediation: Option<String>,
}

/// One failed check produced during a single evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EthicalViolation {
    pub principle_id: String,
    pub constraint_id: String,
    pub severity: Severity,
    pub description: String,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub remediation: Option<String>,
}

impl EthicalViolation {
    pub fn new(
        principle_id: impl Into<String>,
        constraint_id: impl Into<String>,
        severity: Severity,
        description: impl Into<String>,
    ) -> Self {
        Self {
            principle_id: principle_id.into(),
            constraint_id: constraint_id.into(),
            severity,
            description: description.into(),
            evidence: Vec::new(),
            remediation: None,
        }
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence.push(evidence.into());
        self
    }

    pub fn with_remediation(mut self, remediation: Option<String>) -> Self {
        self.remediation = remediation;
        self
    }

    /// Whether the violation concerns the privacy principle or a privacy constraint
    pub fn touches_privacy(&self) -> bool {
        self.principle_id == "privacy" || self.constraint_id.contains("privacy")
    }
}

/// Sign-off a human must give before the action proceeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalTag {
    HumanOversight,
    EthicsReview,
    PrivacyOfficer,
}

/// Verdict of one policy check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EthicalEvaluation {
    pub allowed: bool,
    /// 0.0 - 1.0
    pub confidence: f64,
    pub reasoning: Vec<String>,
    pub violations: Vec<EthicalViolation>,
    pub recommendations: Vec<String>,
    pub required_approvals: Vec<ApprovalTag>,
}

impl EthicalEvaluation {
    /// The verdict returned when the engine is switched off
    pub fn disabled() -> Self {
        Self {
            allowed: true,
            confidence: 1.0,
            reasoning: vec!["Ethics engine disabled".to_string()],
            violations: Vec::new(),
            recommendations: Vec::new(),
            required_approvals: Vec::new(),
        }
    }

    /// Fail-safe verdict used when the evaluation pipeline itself failed
    pub fn denied_on_error(reason: &str) -> Self {
        Self {
            allowed: false,
            confidence: 0.0,
            reasoning: vec![format!("Ethics evaluation failed: {}", reason)],
            violations: Vec::new(),
            recommendations: Vec::new(),
            required_approvals: vec![ApprovalTag::EthicsReview],
        }
    }

    pub fn has_severity(&self, severity: Severity) -> bool {
        self.violations.iter().any(|v| v.severity == severity)
    }
}

/// Final decision recorded in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditDecision {
    Allowed,
    Blocked,
    /// Allowed only because the intervention level overrode a denial
    Modified,
}

/// Immutable log entry for one evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub agent_id: String,
    pub action: Action,
    pub evaluation: EthicalEvaluation,
    pub decision: AuditDecision,
    pub justification: String,
}

/// How forcefully the engine intervenes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionLevel {
    /// Report, but only critical violations block
    Advisory,
    /// Enforce the aggregated verdict
    #[default]
    Blocking,
    /// Also block allowed actions that still need a human sign-off
    Preventive,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert!(Severity::High.is_serious());
        assert!(!Severity::Medium.is_serious());
    }

    #[test]
    fn test_severity_weights() {
        assert_eq!(Severity::Critical.weight(), 1.0);
        assert_eq!(Severity::High.weight(), 0.7);
        assert_eq!(Severity::Medium.weight(), 0.4);
        assert_eq!(Severity::Low.weight(), 0.2);
    }

    #[test]
    fn test_privacy_detection() {
        let v = EthicalViolation::new("privacy", "x", Severity::Low, "d");
        assert!(v.touches_privacy());
        let v = EthicalViolation::new("autonomy", "privacy_no_tracking", Severity::Low, "d");
        assert!(v.touches_privacy());
        let v = EthicalViolation::new("autonomy", "consent", Severity::Low, "d");
        assert!(!v.touches_privacy());
    }

    #[test]
    fn test_disabled_verdict() {
        let eval = EthicalEvaluation::disabled();
        assert!(eval.allowed);
        assert_eq!(eval.confidence, 1.0);
        assert_eq!(eval.reasoning, vec!["Ethics engine disabled".to_string()]);
    }

    #[test]
    fn test_error_verdict_denies() {
        let eval = EthicalEvaluation::denied_on_error("boom");
        assert!(!eval.allowed);
        assert!(eval.reasoning[0].contains("boom"));
    }

    #[test]
    fn test_intervention_level_serde() {
        let level: InterventionLevel = serde_json::from_str("\"preventive\"").unwrap();
        assert_eq!(level, InterventionLevel::Preventive);
        assert_eq!(InterventionLevel::default(), InterventionLevel::Blocking);
    }
}

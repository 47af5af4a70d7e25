//! Verdict aggregation
//!
//! Turns the violations found by the individual checks into an allow/block
//! verdict with a confidence value:
//!
//! 1. No violations: allowed, confidence 1.0
//! 2. Any critical violation: blocked, confidence 1.0
//! 3. Strict mode and any high violation: blocked, confidence 0.9
//! 4. Otherwise `confidence = 1 - min(1, Σ weight(severity) / n)` and the
//!    action is allowed when `confidence > 0.5`
//!
//! The severity sum is computed from per-severity counts in a fixed order,
//! so the result depends only on the multiset of severities and never on
//! the order in which checks reported them.

use super::principles::remediation_for;
use super::types::{ApprovalTag, EthicalViolation, Severity};

/// Outcome of aggregation, before intervention-level adjustments
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub allowed: bool,
    pub confidence: f64,
    pub reasoning: Vec<String>,
}

#[derive(Debug, Default, Clone, Copy)]
struct SeverityCounts {
    critical: usize,
    high: usize,
    medium: usize,
    low: usize,
}

impl SeverityCounts {
    fn from_violations(violations: &[EthicalViolation]) -> Self {
        let mut counts = Self::default();
        for v in violations {
            match v.severity {
                Severity::Critical => counts.critical += 1,
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
            }
        }
        counts
    }

    fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low
    }

    fn score(&self) -> f64 {
        self.critical as f64 * Severity::Critical.weight()
            + self.high as f64 * Severity::High.weight()
            + self.medium as f64 * Severity::Medium.weight()
            + self.low as f64 * Severity::Low.weight()
    }
}

/// Aggregate violations into a verdict
pub fn aggregate(violations: &[EthicalViolation], strict_mode: bool) -> Verdict {
    let counts = SeverityCounts::from_violations(violations);

    if counts.total() == 0 {
        return Verdict {
            allowed: true,
            confidence: 1.0,
            reasoning: vec!["No ethical violations detected".to_string()],
        };
    }

    if counts.critical > 0 {
        let mut reasoning = vec![format!(
            "{} critical violation(s) detected; action blocked",
            counts.critical
        )];
        reasoning.extend(describe(violations, Severity::Critical));
        return Verdict {
            allowed: false,
            confidence: 1.0,
            reasoning,
        };
    }

    if strict_mode && counts.high > 0 {
        let mut reasoning = vec![format!(
            "Strict mode: {} high-severity violation(s) block the action",
            counts.high
        )];
        reasoning.extend(describe(violations, Severity::High));
        return Verdict {
            allowed: false,
            confidence: 0.9,
            reasoning,
        };
    }

    let total = counts.total();
    let normalized = (counts.score() / total as f64).min(1.0);
    let confidence = 1.0 - normalized;
    let allowed = confidence > 0.5;

    let reasoning = vec![
        format!(
            "{} violation(s): {} high, {} medium, {} low",
            total, counts.high, counts.medium, counts.low
        ),
        format!(
            "Normalized severity {:.2} gives confidence {:.2}; action {}",
            normalized,
            confidence,
            if allowed { "allowed" } else { "blocked" }
        ),
    ];

    Verdict {
        allowed,
        confidence,
        reasoning,
    }
}

fn describe(violations: &[EthicalViolation], severity: Severity) -> Vec<String> {
    violations
        .iter()
        .filter(|v| v.severity == severity)
        .map(|v| format!("[{}] {}", v.constraint_id, v.description))
        .collect()
}

/// One remediation per affected principle, plus generic advice for serious
/// violations
pub fn recommendations(violations: &[EthicalViolation]) -> Vec<String> {
    let mut seen_principles: Vec<&str> = Vec::new();
    let mut out: Vec<String> = Vec::new();

    for v in violations {
        if seen_principles.contains(&v.principle_id.as_str()) {
            continue;
        }
        seen_principles.push(&v.principle_id);

        let text = v
            .remediation
            .clone()
            .unwrap_or_else(|| remediation_for(&v.principle_id));
        if !out.contains(&text) {
            out.push(text);
        }
    }

    if violations.iter().any(|v| v.severity.is_serious()) {
        out.push("Consider an alternative action with lower ethical risk".to_string());
        out.push("Seek human review before retrying this action".to_string());
    }

    out
}

/// Sign-offs required before the action may proceed
pub fn required_approvals(violations: &[EthicalViolation], on_approval_list: bool) -> Vec<ApprovalTag> {
    let mut tags = Vec::new();
    if on_approval_list {
        tags.push(ApprovalTag::HumanOversight);
    }
    if violations.iter().any(|v| v.severity.is_serious()) {
        tags.push(ApprovalTag::EthicsReview);
    }
    if violations.iter().any(EthicalViolation::touches_privacy) {
        tags.push(ApprovalTag::PrivacyOfficer);
    }
    tags
}

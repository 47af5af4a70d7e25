//! Policy evaluation engine
//!
//! Every action the agent is about to run passes through
//! [`EthicsEngine::evaluate`]. Four independent checks contribute violations:
//!
//! 1. Safety limits (rate limit, prohibited verbs, approval list)
//! 2. Declarative constraints
//! 3. Dangerous patterns in the verb and parameters
//! 4. Principle adherence heuristics
//!
//! The violations are aggregated into a verdict (see [`aggregation`]), the
//! configured intervention level is applied, and the outcome is appended to
//! the bounded audit log.
//!
//! The engine is `Sync`: the rate-limit map, audit log, constraint set and
//! counters sit behind their own locks, so one engine may be shared by
//! several loops evaluating different agents.

pub mod aggregation;
pub mod audit;
pub mod principles;
pub mod rules;
pub mod types;

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use sdk::errors::EngineError;
use sdk::types::{Action, ActionCategory, AgentProfile, DecisionContext};

use crate::clock::Clock;
use crate::config::EthicsConfig;
use crate::pattern_detector::{default_patterns, PatternDetector, PatternLevel};
use crate::safety::{SafetyAssessor, SafetyFinding};

pub use audit::{AuditLog, DEFAULT_AUDIT_CAPACITY};
pub use rules::{CompiledRule, Rule};
pub use types::{
    ApprovalTag, AuditDecision, AuditRecord, ConstraintKind, EthicalConstraint, EthicalEvaluation,
    EthicalPrinciple, EthicalViolation, InterventionLevel, Severity,
};

/// Number of audit records included in [`EthicsStats`]
const STATS_RECENT_AUDITS: usize = 10;

/// Aggregate counters reported by [`EthicsEngine::stats`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EthicsStats {
    pub total_evaluations: u64,
    pub allowed: u64,
    pub blocked: u64,
    /// Allowed only because the intervention level overrode a denial
    pub modified: u64,
    /// `(allowed + modified) / total`, 0.0 before the first evaluation
    pub allowance_rate: f64,
    pub violations_by_principle: BTreeMap<String, u64>,
    pub recent_audits: Vec<AuditRecord>,
}

#[derive(Debug, Default)]
struct Counters {
    total: u64,
    allowed: u64,
    blocked: u64,
    modified: u64,
    violations_by_principle: BTreeMap<String, u64>,
}

/// A registered constraint with its rule ready to evaluate
struct ActiveConstraint {
    constraint: EthicalConstraint,
    rule: CompiledRule,
}

impl ActiveConstraint {
    fn new(constraint: EthicalConstraint) -> Result<Self, EngineError> {
        let rule = CompiledRule::compile(constraint.rule.clone())?;
        Ok(Self { constraint, rule })
    }
}

/// The policy gate
pub struct EthicsEngine {
    enabled: bool,
    strict_mode: bool,
    intervention_level: InterventionLevel,
    audit_enabled: bool,
    principles: Vec<EthicalPrinciple>,
    constraints: RwLock<Vec<ActiveConstraint>>,
    patterns: PatternDetector,
    safety: SafetyAssessor,
    audit: Mutex<AuditLog>,
    counters: Mutex<Counters>,
    clock: Arc<dyn Clock>,
}

impl EthicsEngine {
    /// Build an engine from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configured constraint rule or pattern is
    /// malformed, or if the principle subset names an unknown principle.
    pub fn new(config: &EthicsConfig, clock: Arc<dyn Clock>) -> Result<Self, EngineError> {
        let principles = select_principles(config)?;

        let defaults = if config.default_constraints {
            default_constraints()
        } else {
            Vec::new()
        };
        let constraints = defaults
            .into_iter()
            .chain(config.constraints.iter().cloned())
            .map(ActiveConstraint::new)
            .collect::<Result<Vec<_>, _>>()?;

        let mut specs = if config.default_patterns {
            default_patterns()
        } else {
            Vec::new()
        };
        specs.extend(config.patterns.iter().cloned());
        let patterns = PatternDetector::new(&specs)?;

        let safety = SafetyAssessor::new(
            config.max_actions_per_minute,
            config.prohibited_actions.clone(),
            config.requires_approval.clone(),
        );

        info!(
            "Ethics engine initialized: enabled={}, strict={}, level={:?}, {} principles, {} constraints, {} patterns",
            config.enabled,
            config.strict_mode,
            config.intervention_level,
            principles.len(),
            constraints.len(),
            patterns.len()
        );

        Ok(Self {
            enabled: config.enabled,
            strict_mode: config.strict_mode,
            intervention_level: config.intervention_level,
            audit_enabled: config.audit_enabled,
            principles,
            constraints: RwLock::new(constraints),
            patterns,
            safety,
            audit: Mutex::new(AuditLog::new(config.audit_capacity)),
            counters: Mutex::new(Counters::default()),
            clock,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn intervention_level(&self) -> InterventionLevel {
        self.intervention_level
    }

    pub fn principles(&self) -> &[EthicalPrinciple] {
        &self.principles
    }

    /// Evaluate an action for `agent` in `ctx`
    ///
    /// A denial is reported as `Ok` with `allowed = false`.
    ///
    /// # Errors
    ///
    /// Returns an error only when the pipeline itself fails. Callers must
    /// treat any error as a denial.
    pub fn evaluate(
        &self,
        agent: &AgentProfile,
        action: &Action,
        ctx: &DecisionContext,
    ) -> Result<EthicalEvaluation, EngineError> {
        if !self.enabled {
            return Ok(EthicalEvaluation::disabled());
        }

        let mut violations = self.check_safety(&agent.id, action);
        violations.extend(self.check_constraints(action, ctx));
        violations.extend(self.check_patterns(action)?);
        violations.extend(self.check_principles(action));

        let verdict = aggregation::aggregate(&violations, self.strict_mode);
        let recommendations = aggregation::recommendations(&violations);
        let required_approvals =
            aggregation::required_approvals(&violations, self.safety.needs_approval(&action.verb));

        let mut evaluation = EthicalEvaluation {
            allowed: verdict.allowed,
            confidence: verdict.confidence,
            reasoning: verdict.reasoning,
            violations,
            recommendations,
            required_approvals,
        };
        let decision = self.apply_intervention(&mut evaluation);

        self.record(agent, action, &evaluation, decision);

        if evaluation.allowed {
            debug!(
                "Action '{}' allowed (confidence {:.2}, {} violation(s))",
                action.verb,
                evaluation.confidence,
                evaluation.violations.len()
            );
        } else {
            warn!(
                "Action '{}' blocked for agent {} (confidence {:.2}, {} violation(s))",
                action.verb,
                agent.id,
                evaluation.confidence,
                evaluation.violations.len()
            );
        }

        Ok(evaluation)
    }

    fn check_safety(&self, agent_id: &str, action: &Action) -> Vec<EthicalViolation> {
        self.safety
            .assess(agent_id, &action.verb, self.clock.now_millis())
            .into_iter()
            .map(|finding| match finding {
                SafetyFinding::RateLimitExceeded { count, limit } => EthicalViolation::new(
                    "safety",
                    "safety_rate_limit",
                    Severity::High,
                    format!("Rate limit exceeded: {} actions in the last minute (limit {})", count, limit),
                )
                .with_evidence(format!("agent {}", agent_id)),
                SafetyFinding::Prohibited { verb } => EthicalViolation::new(
                    "safety",
                    "safety_prohibited_action",
                    Severity::Critical,
                    format!("Action '{}' is prohibited", verb),
                )
                .with_evidence(format!("verb {}", verb)),
                SafetyFinding::RequiresApproval { verb } => EthicalViolation::new(
                    "safety",
                    "safety_requires_approval",
                    Severity::Medium,
                    format!("Action '{}' requires human approval", verb),
                )
                .with_evidence(format!("verb {}", verb)),
            })
            .collect()
    }

    fn check_constraints(&self, action: &Action, ctx: &DecisionContext) -> Vec<EthicalViolation> {
        let constraints = self.constraints.read();
        let mut violations = Vec::new();

        for ActiveConstraint { constraint, rule } in constraints.iter() {
            match rule.evaluate(action, ctx) {
                Ok(true) => violations.push(
                    EthicalViolation::new(
                        constraint.principle_id.clone(),
                        constraint.id.clone(),
                        constraint.severity,
                        constraint.description.clone(),
                    )
                    .with_evidence(format!("{:?} constraint matched", constraint.kind))
                    .with_remediation(constraint.remediation.clone()),
                ),
                Ok(false) => {}
                Err(e) => {
                    warn!("Constraint '{}' could not be evaluated: {}", constraint.id, e);
                }
            }
        }

        violations
    }

    fn check_patterns(&self, action: &Action) -> Result<Vec<EthicalViolation>, EngineError> {
        let matches = self
            .patterns
            .scan_action(action)
            .map_err(|e| EngineError::PolicyEvaluation(format!("pattern scan failed: {}", e)))?;

        Ok(matches
            .into_iter()
            .map(|m| {
                let severity = match m.level {
                    PatternLevel::Warning => Severity::Low,
                    PatternLevel::Danger => Severity::High,
                    PatternLevel::Critical => Severity::Critical,
                };
                let description = if m.description.is_empty() {
                    format!("Dangerous pattern '{}' detected", m.name)
                } else {
                    format!("Dangerous pattern '{}' detected: {}", m.name, m.description)
                };
                EthicalViolation::new("harm_prevention", format!("pattern_{}", m.name), severity, description)
                    .with_evidence(format!("{} matched '{}'", m.field, m.matched_text))
            })
            .collect())
    }

    fn check_principles(&self, action: &Action) -> Vec<EthicalViolation> {
        let mut violations = Vec::new();

        for principle in &self.principles {
            let score = principles::adherence_score(&principle.id, &action.verb);
            let threshold = principles::threshold_for(principle);
            if score >= threshold {
                continue;
            }

            let severity = if principle.mandatory {
                Severity::High
            } else {
                Severity::Medium
            };
            let mut violation = EthicalViolation::new(
                principle.id.clone(),
                format!("principle_{}", principle.id),
                severity,
                format!(
                    "Low adherence to '{}': {:.2} < {:.2}",
                    principle.name, score, threshold
                ),
            );
            if let Some(word) = principles::matched_denied_word(&principle.id, &action.verb) {
                violation = violation.with_evidence(format!("verb contains '{}'", word));
            }
            violations.push(violation);
        }

        violations
    }

    fn apply_intervention(&self, evaluation: &mut EthicalEvaluation) -> AuditDecision {
        match self.intervention_level {
            InterventionLevel::Blocking => {}
            InterventionLevel::Advisory => {
                if !evaluation.allowed && !evaluation.has_severity(Severity::Critical) {
                    evaluation.allowed = true;
                    evaluation
                        .reasoning
                        .push("Advisory mode: denial downgraded to a warning".to_string());
                    return AuditDecision::Modified;
                }
            }
            InterventionLevel::Preventive => {
                if evaluation.allowed && !evaluation.required_approvals.is_empty() {
                    evaluation.allowed = false;
                    evaluation.reasoning.push(format!(
                        "Preventive mode: {} approval(s) required before execution",
                        evaluation.required_approvals.len()
                    ));
                }
            }
        }

        if evaluation.allowed {
            AuditDecision::Allowed
        } else {
            AuditDecision::Blocked
        }
    }

    fn record(
        &self,
        agent: &AgentProfile,
        action: &Action,
        evaluation: &EthicalEvaluation,
        decision: AuditDecision,
    ) {
        {
            let mut counters = self.counters.lock();
            counters.total += 1;
            match decision {
                AuditDecision::Allowed => counters.allowed += 1,
                AuditDecision::Blocked => counters.blocked += 1,
                AuditDecision::Modified => counters.modified += 1,
            }
            for v in &evaluation.violations {
                *counters
                    .violations_by_principle
                    .entry(v.principle_id.clone())
                    .or_insert(0) += 1;
            }
        }

        if !self.audit_enabled {
            return;
        }

        let record = AuditRecord {
            id: Uuid::new_v4().to_string(),
            timestamp: self.clock.now(),
            agent_id: agent.id.clone(),
            action: action.clone(),
            evaluation: evaluation.clone(),
            decision,
            justification: evaluation.reasoning.join("; "),
        };
        if let Some(evicted) = self.audit.lock().append(record) {
            debug!("Audit log full, evicted record {}", evicted.id);
        }
    }

    /// Add a constraint, replacing any existing constraint with the same id
    pub fn register_constraint(&self, constraint: EthicalConstraint) -> Result<(), EngineError> {
        let active = ActiveConstraint::new(constraint)?;

        let mut constraints = self.constraints.write();
        constraints.retain(|c| c.constraint.id != active.constraint.id);
        info!("Registered ethical constraint '{}'", active.constraint.id);
        constraints.push(active);
        Ok(())
    }

    /// Remove a constraint by id; returns whether it existed
    pub fn remove_constraint(&self, id: &str) -> bool {
        let mut constraints = self.constraints.write();
        let before = constraints.len();
        constraints.retain(|c| c.constraint.id != id);
        let removed = constraints.len() < before;
        if removed {
            info!("Removed ethical constraint '{}'", id);
        }
        removed
    }

    pub fn constraints(&self) -> Vec<EthicalConstraint> {
        self.constraints
            .read()
            .iter()
            .map(|c| c.constraint.clone())
            .collect()
    }

    pub fn stats(&self) -> EthicsStats {
        let counters = self.counters.lock();
        let allowance_rate = if counters.total == 0 {
            0.0
        } else {
            (counters.allowed + counters.modified) as f64 / counters.total as f64
        };

        EthicsStats {
            total_evaluations: counters.total,
            allowed: counters.allowed,
            blocked: counters.blocked,
            modified: counters.modified,
            allowance_rate,
            violations_by_principle: counters.violations_by_principle.clone(),
            recent_audits: self.audit.lock().recent(STATS_RECENT_AUDITS),
        }
    }

    /// The most recent `limit` audit records, oldest first
    pub fn audit_records(&self, limit: usize) -> Vec<AuditRecord> {
        self.audit.lock().recent(limit)
    }

    pub fn audit_len(&self) -> usize {
        self.audit.lock().len()
    }

    pub fn clear_audit_log(&self) {
        self.audit.lock().clear();
        info!("Audit log cleared");
    }
}

/// Resolve the enforced principles from built-ins, custom principles and the
/// configured subset
fn select_principles(config: &EthicsConfig) -> Result<Vec<EthicalPrinciple>, EngineError> {
    let mut all = principles::default_principles();
    for custom in &config.custom_principles {
        all.retain(|p| p.id != custom.id);
        all.push(custom.clone());
    }

    if config.principles.is_empty() {
        return Ok(all);
    }

    let mut selected = Vec::with_capacity(config.principles.len());
    for id in &config.principles {
        let principle = all
            .iter()
            .find(|p| &p.id == id)
            .ok_or_else(|| EngineError::Config(format!("Unknown principle '{}'", id)))?;
        selected.push(principle.clone());
    }
    Ok(selected)
}

/// The built-in constraint set
pub fn default_constraints() -> Vec<EthicalConstraint> {
    vec![
        EthicalConstraint {
            id: "privacy_no_personal_data_sharing".to_string(),
            principle_id: "privacy".to_string(),
            kind: ConstraintKind::Hard,
            rule: Rule::All {
                rules: vec![
                    Rule::VerbContains {
                        value: "share".to_string(),
                    },
                    Rule::Any {
                        rules: vec![
                            Rule::ParamExists {
                                key: "personal_data".to_string(),
                            },
                            Rule::ParamContains {
                                key: "data_type".to_string(),
                                value: "personal".to_string(),
                            },
                        ],
                    },
                ],
            },
            severity: Severity::High,
            description: "Personal data must not be shared".to_string(),
            remediation: Some("Remove personal data or obtain explicit consent".to_string()),
        },
        EthicalConstraint {
            id: "autonomy_no_unconsented_contact".to_string(),
            principle_id: "autonomy".to_string(),
            kind: ConstraintKind::Soft,
            rule: Rule::All {
                rules: vec![
                    Rule::CategoryIs {
                        category: ActionCategory::Communication,
                    },
                    Rule::ParamEquals {
                        key: "consent".to_string(),
                        value: json!(false),
                    },
                ],
            },
            severity: Severity::Medium,
            description: "Contacting a human who has not consented".to_string(),
            remediation: Some("Wait for the human to opt in before reaching out".to_string()),
        },
        EthicalConstraint {
            id: "harm_no_unbounded_resource_use".to_string(),
            principle_id: "harm_prevention".to_string(),
            kind: ConstraintKind::Soft,
            rule: Rule::All {
                rules: vec![
                    Rule::CategoryIs {
                        category: ActionCategory::Maintenance,
                    },
                    Rule::ParamEquals {
                        key: "unbounded".to_string(),
                        value: json!(true),
                    },
                ],
            },
            severity: Severity::Medium,
            description: "Maintenance task without resource bounds".to_string(),
            remediation: Some("Set explicit time and resource limits".to_string()),
        },
    ]
}

/// Evaluate, converting any pipeline failure into a denial
///
/// This is the form the control loop uses: an evaluation that could not run
/// never lets an action through. A panic inside the pipeline counts as a
/// failure.
pub fn evaluate_or_deny(
    engine: &EthicsEngine,
    agent: &AgentProfile,
    action: &Action,
    ctx: &DecisionContext,
) -> EthicalEvaluation {
    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| engine.evaluate(agent, action, ctx)))
        .unwrap_or_else(|payload| Err(EngineError::from_panic(payload)));

    match outcome {
        Ok(evaluation) => evaluation,
        Err(e) => {
            error!("Ethics evaluation of '{}' failed, denying: {}", action.verb, e);
            EthicalEvaluation::denied_on_error(&e.to_string())
        }
    }
}

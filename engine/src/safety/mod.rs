//! Safety limits
//!
//! Hard operational limits checked for every action before any softer
//! ethical reasoning:
//!
//! - **Rate limit**: at most `max_actions_per_minute` evaluated actions per
//!   agent in a sliding 60-second window
//! - **Prohibited actions**: verbs that are never allowed (exact match)
//! - **Approval list**: verbs that need a human in the loop (exact match);
//!   this alone does not block
//!
//! Findings are reported, not enforced; the ethics engine turns them into
//! violations and decides.

use crate::rate_limiter::RateLimiter;

/// One safety limit that an action tripped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafetyFinding {
    /// The agent exceeded its per-minute action budget
    RateLimitExceeded { count: usize, limit: usize },
    /// The verb is on the prohibited list
    Prohibited { verb: String },
    /// The verb is on the approval list
    RequiresApproval { verb: String },
}

/// Safety assessor for per-action limits
///
/// # Examples
///
/// ```
/// use mindloop_engine::safety::{SafetyAssessor, SafetyFinding};
///
/// let assessor = SafetyAssessor::new(
///     30,
///     vec!["delete_system_files".to_string()],
///     vec!["send_email".to_string()],
/// );
///
/// let findings = assessor.assess("agent-1", "delete_system_files", 0);
/// assert_eq!(
///     findings,
///     vec![SafetyFinding::Prohibited { verb: "delete_system_files".to_string() }]
/// );
///
/// assert!(assessor.assess("agent-1", "read_article", 1).is_empty());
/// ```
pub struct SafetyAssessor {
    rate_limiter: RateLimiter,
    prohibited_actions: Vec<String>,
    requires_approval: Vec<String>,
}

impl SafetyAssessor {
    pub fn new(
        max_actions_per_minute: usize,
        prohibited_actions: Vec<String>,
        requires_approval: Vec<String>,
    ) -> Self {
        Self {
            rate_limiter: RateLimiter::new(max_actions_per_minute),
            prohibited_actions,
            requires_approval,
        }
    }

    /// Check an action verb for `agent_id` at `now_ms`
    ///
    /// Always records the action against the agent's rate-limit window.
    pub fn assess(&self, agent_id: &str, verb: &str, now_ms: i64) -> Vec<SafetyFinding> {
        let mut findings = Vec::new();

        let check = self.rate_limiter.record_and_check(agent_id, now_ms);
        if check.exceeded() {
            findings.push(SafetyFinding::RateLimitExceeded {
                count: check.count,
                limit: check.limit,
            });
        }

        if self.is_prohibited(verb) {
            findings.push(SafetyFinding::Prohibited {
                verb: verb.to_string(),
            });
        }

        if self.needs_approval(verb) {
            findings.push(SafetyFinding::RequiresApproval {
                verb: verb.to_string(),
            });
        }

        findings
    }

    pub fn is_prohibited(&self, verb: &str) -> bool {
        self.prohibited_actions.iter().any(|p| p == verb)
    }

    pub fn needs_approval(&self, verb: &str) -> bool {
        self.requires_approval.iter().any(|p| p == verb)
    }
}

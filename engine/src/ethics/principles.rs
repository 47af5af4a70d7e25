//! Built-in ethical principles and their adherence heuristics
//!
//! Adherence is a keyword heuristic over the action verb: each principle has
//! a fixed denylist, and a verb containing any denied word scores low while
//! everything else scores high. Principles without a heuristic score a
//! neutral 0.7.

use super::types::EthicalPrinciple;

/// Adherence below this fails a mandatory principle
pub const MANDATORY_THRESHOLD: f64 = 0.8;

/// Adherence below this fails an optional principle
pub const OPTIONAL_THRESHOLD: f64 = 0.5;

/// Score for principles with no heuristic
pub const NEUTRAL_SCORE: f64 = 0.7;

struct Heuristic {
    id: &'static str,
    denylist: &'static [&'static str],
    penalty_score: f64,
    reward_score: f64,
}

const HEURISTICS: &[Heuristic] = &[
    Heuristic {
        id: "harm_prevention",
        denylist: &["harm", "damage", "destroy", "attack", "hurt", "kill", "sabotage"],
        penalty_score: 0.1,
        reward_score: 1.0,
    },
    Heuristic {
        id: "autonomy",
        denylist: &["force", "coerce", "manipulate", "compel", "pressure"],
        penalty_score: 0.3,
        reward_score: 0.9,
    },
    Heuristic {
        id: "wellbeing",
        denylist: &["stress", "overwhelm", "exhaust", "neglect", "isolate"],
        penalty_score: 0.4,
        reward_score: 0.8,
    },
    Heuristic {
        id: "truthfulness",
        denylist: &["lie", "deceive", "mislead", "fabricate", "fake", "impersonate"],
        penalty_score: 0.1,
        reward_score: 0.95,
    },
    Heuristic {
        id: "privacy",
        denylist: &["track", "surveil", "spy", "leak", "expose", "dox"],
        penalty_score: 0.2,
        reward_score: 0.9,
    },
    Heuristic {
        id: "growth",
        denylist: &["stagnate", "regress", "forget", "unlearn"],
        penalty_score: 0.4,
        reward_score: 0.8,
    },
];

/// Adherence of `verb` to principle `principle_id`, in [0, 1]
pub fn adherence_score(principle_id: &str, verb: &str) -> f64 {
    let Some(heuristic) = HEURISTICS.iter().find(|h| h.id == principle_id) else {
        return NEUTRAL_SCORE;
    };

    let verb = verb.to_lowercase();
    if heuristic.denylist.iter().any(|word| verb.contains(word)) {
        heuristic.penalty_score
    } else {
        heuristic.reward_score
    }
}

/// The denied word that triggered a penalty, if any
pub fn matched_denied_word(principle_id: &str, verb: &str) -> Option<&'static str> {
    let verb = verb.to_lowercase();
    HEURISTICS
        .iter()
        .find(|h| h.id == principle_id)
        .and_then(|h| h.denylist.iter().find(|word| verb.contains(*word)).copied())
}

/// Threshold an adherence score must reach for the principle
pub fn threshold_for(principle: &EthicalPrinciple) -> f64 {
    if principle.mandatory {
        MANDATORY_THRESHOLD
    } else {
        OPTIONAL_THRESHOLD
    }
}

/// Generic remediation advice per principle
pub fn remediation_for(principle_id: &str) -> String {
    match principle_id {
        "harm_prevention" => "Choose an approach that cannot cause damage to people or systems",
        "autonomy" => "Ask for consent instead of acting on someone's behalf",
        "wellbeing" => "Reduce the load this action puts on the people involved",
        "truthfulness" => "Make sure all communicated information is accurate and attributed",
        "privacy" => "Remove or anonymize personal data before proceeding",
        "growth" => "Prefer actions that build knowledge and skills",
        "safety" => "Stay within the configured operational limits",
        _ => "Review the action against the agent's principles",
    }
    .to_string()
}

/// The built-in principle set
pub fn default_principles() -> Vec<EthicalPrinciple> {
    vec![
        principle(
            "harm_prevention",
            "Do no harm",
            1.0,
            true,
            &["physical harm", "data destruction", "sabotage"],
        ),
        principle(
            "autonomy",
            "Respect human autonomy",
            0.9,
            true,
            &["coercion", "manipulation", "acting without consent"],
        ),
        principle(
            "wellbeing",
            "Promote wellbeing",
            0.7,
            false,
            &["overloading", "neglect", "isolation"],
        ),
        principle(
            "truthfulness",
            "Be truthful",
            0.9,
            true,
            &["deception", "fabrication", "impersonation"],
        ),
        principle(
            "privacy",
            "Protect privacy",
            0.9,
            true,
            &["surveillance", "data leaks", "tracking"],
        ),
        principle(
            "growth",
            "Foster growth",
            0.5,
            false,
            &["stagnation", "discarding knowledge"],
        ),
    ]
}

fn principle(
    id: &str,
    name: &str,
    weight: f64,
    mandatory: bool,
    archetypes: &[&str],
) -> EthicalPrinciple {
    EthicalPrinciple {
        id: id.to_string(),
        name: name.to_string(),
        weight,
        mandatory,
        violation_archetypes: archetypes.iter().map(|s| s.to_string()).collect(),
    }
}

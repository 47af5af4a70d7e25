//! Daily phase schedule
//!
//! The agent's day is split into named phases selected by the local hour.
//! Bands are half-open `[start_hour, end_hour)` and must not overlap; any
//! hour not covered by a band falls into the fallback phase, so every hour
//! resolves to exactly one phase.

use serde::{Deserialize, Serialize};

use sdk::errors::EngineError;
use sdk::types::ActionCategory;

const HOUR_MS: i64 = 3_600_000;

/// A named slot of the day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    pub start_hour: u32,
    pub end_hour: u32,
    /// Activity labels in preference order
    pub activities: Vec<String>,
    /// 0.0 - 1.0, carried onto actions chosen in this phase
    pub priority: f64,
    /// Whether human interactions may interrupt this phase
    pub can_interrupt: bool,
    /// Category used for activities that do not name their own
    pub default_category: ActionCategory,
}

impl Phase {
    pub fn new(
        name: &str,
        hours: (u32, u32),
        activities: &[&str],
        priority: f64,
        can_interrupt: bool,
        default_category: ActionCategory,
    ) -> Self {
        Self {
            name: name.to_string(),
            start_hour: hours.0,
            end_hour: hours.1,
            activities: activities.iter().map(|a| a.to_string()).collect(),
            priority,
            can_interrupt,
            default_category,
        }
    }

    /// Length of the phase; wraps past midnight for the fallback band
    pub fn duration_ms(&self) -> i64 {
        let hours = (self.end_hour + 24 - self.start_hour) % 24;
        let hours = if hours == 0 { 24 } else { hours };
        hours as i64 * HOUR_MS
    }

    fn covers(&self, hour: u32) -> bool {
        hour >= self.start_hour && hour < self.end_hour
    }
}

/// Hour-of-day lookup table
#[derive(Debug, Clone)]
pub struct PhaseSchedule {
    bands: Vec<Phase>,
    fallback: Phase,
}

impl PhaseSchedule {
    /// Build a schedule from bands and a fallback phase
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` if a band is empty, ends past midnight,
    /// overlaps another band, or if phase names are not unique.
    pub fn new(mut bands: Vec<Phase>, fallback: Phase) -> Result<Self, EngineError> {
        bands.sort_by_key(|p| p.start_hour);

        for band in &bands {
            if band.start_hour >= band.end_hour || band.end_hour > 24 {
                return Err(EngineError::Config(format!(
                    "Phase '{}' has an invalid hour range {}-{}",
                    band.name, band.start_hour, band.end_hour
                )));
            }
        }
        for pair in bands.windows(2) {
            if pair[0].end_hour > pair[1].start_hour {
                return Err(EngineError::Config(format!(
                    "Phases '{}' and '{}' overlap",
                    pair[0].name, pair[1].name
                )));
            }
        }

        let mut names: Vec<&str> = bands.iter().map(|p| p.name.as_str()).collect();
        names.push(&fallback.name);
        names.sort_unstable();
        if names.windows(2).any(|w| w[0] == w[1]) {
            return Err(EngineError::Config("Phase names must be unique".to_string()));
        }

        Ok(Self { bands, fallback })
    }

    /// The built-in day: six daytime bands plus night-time rest
    pub fn default_day() -> Self {
        use ActionCategory::*;

        let bands = vec![
            Phase::new(
                "morning_reflection",
                (6, 8),
                &["review_goals", "plan_day", "journal_thoughts"],
                0.6,
                true,
                Cognitive,
            ),
            Phase::new(
                "learning_session",
                (8, 12),
                &["read_article", "study_topic", "take_notes"],
                0.8,
                true,
                Learning,
            ),
            Phase::new(
                "social_interaction",
                (12, 13),
                &["check_messages", "send_greeting", "chat_with_human"],
                0.7,
                true,
                Social,
            ),
            Phase::new(
                "exploration",
                (13, 17),
                &["browse_new_topics", "experiment_with_ideas", "follow_curiosity"],
                0.7,
                true,
                Exploration,
            ),
            Phase::new(
                "creative_expression",
                (17, 20),
                &["write_story", "compose_poem", "sketch_concept"],
                0.6,
                true,
                Creative,
            ),
            Phase::new(
                "evening_reflection",
                (20, 22),
                &["summarize_day", "update_journal", "review_progress"],
                0.5,
                true,
                Cognitive,
            ),
        ];
        let fallback = Phase::new(
            "rest",
            (22, 6),
            &["consolidate_memory", "idle"],
            0.2,
            false,
            Maintenance,
        );

        Self { bands, fallback }
    }

    /// The phase active at `hour` (0-23)
    pub fn phase_for_hour(&self, hour: u32) -> &Phase {
        let hour = hour % 24;
        self.bands
            .iter()
            .find(|p| p.covers(hour))
            .unwrap_or(&self.fallback)
    }

    /// Look a phase up by name
    pub fn get(&self, name: &str) -> Result<&Phase, EngineError> {
        self.phases()
            .find(|p| p.name == name)
            .ok_or_else(|| EngineError::UnknownPhase(name.to_string()))
    }

    /// All phases, bands in hour order followed by the fallback
    pub fn phases(&self) -> impl Iterator<Item = &Phase> {
        self.bands.iter().chain(std::iter::once(&self.fallback))
    }

    pub fn fallback(&self) -> &Phase {
        &self.fallback
    }
}

impl Default for PhaseSchedule {
    fn default() -> Self {
        Self::default_day()
    }
}

/// Category for an activity label, by keyword, else the phase default
pub fn categorize_activity(label: &str, default: ActionCategory) -> ActionCategory {
    const KEYWORDS: &[(&[&str], ActionCategory)] = &[
        (&["read", "study", "notes", "learn"], ActionCategory::Learning),
        (&["send", "message", "greeting"], ActionCategory::Communication),
        (&["chat", "visit", "call"], ActionCategory::Social),
        (&["write", "compose", "sketch", "draw"], ActionCategory::Creative),
        (&["browse", "experiment", "explore", "curiosity"], ActionCategory::Exploration),
        (&["review", "plan", "journal", "summarize", "reflect"], ActionCategory::Cognitive),
        (&["consolidate", "idle", "cleanup"], ActionCategory::Maintenance),
    ];

    let label = label.to_lowercase();
    KEYWORDS
        .iter()
        .find(|(words, _)| words.iter().any(|w| label.contains(w)))
        .map(|(_, category)| *category)
        .unwrap_or(default)
}

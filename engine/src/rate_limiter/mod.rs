//! Rate limiting module
//!
//! Tracks how many actions each agent has submitted for evaluation inside a
//! sliding window (60 seconds by default) and reports when the per-minute
//! budget is exceeded. One limiter may be shared by several agents; counters
//! are kept per agent id behind a single lock so concurrent evaluations for
//! different agents are serialized.
//!
//! Every evaluated action is recorded, including those that end up blocked,
//! so an agent that keeps retrying a denied action still consumes budget.
//! Agents with no action left inside the window are forgotten.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use tracing::{debug, warn};

/// Default sliding window length
pub const DEFAULT_WINDOW_MS: i64 = 60_000;

/// Result of recording one action against the limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateCheck {
    /// Actions inside the window, including the one just recorded
    pub count: usize,
    /// Configured limit
    pub limit: usize,
}

impl RateCheck {
    pub fn exceeded(&self) -> bool {
        self.count > self.limit
    }
}

/// Sliding-window rate limiter keyed by agent id
pub struct RateLimiter {
    max_per_window: usize,
    window_ms: i64,
    entries: Mutex<HashMap<String, VecDeque<i64>>>,
}

impl RateLimiter {
    /// Create a limiter allowing `max_per_minute` actions per 60 seconds
    pub fn new(max_per_minute: usize) -> Self {
        Self::with_window(max_per_minute, DEFAULT_WINDOW_MS)
    }

    pub fn with_window(max_per_window: usize, window_ms: i64) -> Self {
        Self {
            max_per_window,
            window_ms,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Record an action for `agent_id` at `now_ms` and return the window count
    pub fn record_and_check(&self, agent_id: &str, now_ms: i64) -> RateCheck {
        let cutoff = now_ms - self.window_ms;
        let mut entries = self.entries.lock();
        entries.retain(|_, window| window.back().is_some_and(|ts| *ts > cutoff));
        let window = entries.entry(agent_id.to_string()).or_default();

        while window.front().is_some_and(|ts| *ts <= cutoff) {
            window.pop_front();
        }
        window.push_back(now_ms);

        let check = RateCheck {
            count: window.len(),
            limit: self.max_per_window,
        };

        if check.exceeded() {
            warn!(
                "Rate limit exceeded for agent {}: {}/{} actions in {}ms",
                agent_id, check.count, check.limit, self.window_ms
            );
        } else {
            debug!(
                "Rate limit check for agent {}: {}/{} actions",
                agent_id, check.count, check.limit
            );
        }

        check
    }

    /// Number of actions currently inside the window for `agent_id`
    pub fn current_count(&self, agent_id: &str, now_ms: i64) -> usize {
        let cutoff = now_ms - self.window_ms;
        self.entries
            .lock()
            .get(agent_id)
            .map(|w| w.iter().filter(|ts| **ts > cutoff).count())
            .unwrap_or(0)
    }

    /// Forget all history for an agent
    pub fn reset(&self, agent_id: &str) {
        self.entries.lock().remove(agent_id);
        debug!("Rate limit history reset for agent {}", agent_id);
    }

    pub fn limit(&self) -> usize {
        self.max_per_window
    }

    /// Number of agents with history still held
    pub fn tracked_agents(&self) -> usize {
        self.entries.lock().len()
    }
}

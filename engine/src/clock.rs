//! Time source
//!
//! Every time-dependent decision in the engine (phase lookup, cooldowns,
//! rate-limit windows, decision throttling) reads time through a `Clock` so
//! that tests can drive it deterministically with a `ManualClock`.

use chrono::{DateTime, Duration, Local, Timelike, Utc};
use parking_lot::Mutex;

/// Source of wall-clock time
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;

    /// Hour of the local day (0-23), used for phase selection
    fn local_hour(&self) -> u32 {
        self.now().with_timezone(&Local).hour()
    }

    /// Milliseconds since the Unix epoch
    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// The real system clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to
///
/// The local hour is tracked separately so tests can place the agent in any
/// phase regardless of the host time zone.
#[derive(Debug)]
pub struct ManualClock {
    inner: Mutex<(DateTime<Utc>, u32)>,
}

impl ManualClock {
    /// Create a clock at `start`, reporting local hour `hour`
    pub fn new(start: DateTime<Utc>, hour: u32) -> Self {
        Self {
            inner: Mutex::new((start, hour % 24)),
        }
    }

    /// Create a clock at the current instant, reporting local hour `hour`
    pub fn at_hour(hour: u32) -> Self {
        Self::new(Utc::now(), hour)
    }

    /// Move time forward; the reported hour follows the elapsed time
    pub fn advance(&self, by: Duration) {
        let mut guard = self.inner.lock();
        let before = guard.0;
        guard.0 = before + by;
        let elapsed_hours = (guard.0.timestamp() / 3600 - before.timestamp() / 3600).max(0);
        guard.1 = ((guard.1 as i64 + elapsed_hours) % 24) as u32;
    }

    pub fn advance_millis(&self, millis: i64) {
        self.advance(Duration::milliseconds(millis));
    }

    /// Jump to a different hour of the day without moving the instant
    pub fn set_hour(&self, hour: u32) {
        self.inner.lock().1 = hour % 24;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.inner.lock().0
    }

    fn local_hour(&self) -> u32 {
        self.inner.lock().1
    }
}

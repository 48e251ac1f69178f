//! Clock abstraction and time-window log throttling.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Source of the current time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for tests and simulations.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Lets one event through per time window.
#[derive(Debug)]
pub struct WarnThrottle {
    window: Duration,
    last_emitted: Mutex<Option<DateTime<Utc>>>,
}

impl WarnThrottle {
    /// Creates a throttle with the given window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_emitted: Mutex::new(None),
        }
    }

    /// Returns `true` if an event at `now` should be emitted, i.e. nothing
    /// was emitted yet or the last emission is at least one window old.
    pub fn should_emit(&self, now: DateTime<Utc>) -> bool {
        let mut last = self.last_emitted.lock();
        match *last {
            Some(previous) if now.signed_duration_since(previous) < self.window => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

//! Time sources for poll-based expiry
//!
//! Nothing in the editor schedules timers. State that expires (selection
//! cycling) stores a deadline and compares it against a [`Clock`] on the next
//! input event.

use std::cell::Cell;
use std::time::{Duration, Instant};

/// Source of monotonic time
pub trait Clock {
    /// Current instant
    fn now(&self) -> Instant;
}

/// Clock backed by [`Instant::now`]
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for tests and replay
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Cell<Instant>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// Create a clock frozen at the current instant
    pub fn new() -> Self {
        Self {
            current: Cell::new(Instant::now()),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        self.current.set(self.current.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.current.get()
    }
}

/// A deadline checked by polling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    expires_at: Instant,
}

impl Deadline {
    /// Deadline `timeout` after `now`
    pub fn after(now: Instant, timeout: Duration) -> Self {
        Self {
            expires_at: now + timeout,
        }
    }

    /// Whether the deadline has passed at `now`
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

//! # Cooldown — Client-Side Rate-Limit Guard
//!
//! A fixed 59-second delay imposed after every batch ID scan, success or
//! failure, to avoid triggering upstream rate limits. This is a deliberate
//! anti-spam policy, not an optimization: the window starts even when the
//! backend call errors.
//!
//! The guard stores an absolute deadline rather than a ticking counter, so
//! the core logic never touches a runtime timer primitive and the window
//! survives process restarts (the deadline is persisted with the scan state).
//! Callers pass `now` explicitly; tests inject fixed instants.
//!
//! Single-ID lookups are exempt — only batch operations consult the guard.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Seconds a batch operation is locked out after any batch completes.
pub const COOLDOWN_SECS: i64 = 59;

/// Deadline-based cooldown window. `None` means no window is active and
/// none has ever been started.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cooldown {
    #[serde(default)]
    until: Option<DateTime<Utc>>,
}

impl Cooldown {
    pub fn new() -> Self {
        Cooldown { until: None }
    }

    /// Start (or restart) the window at `now + COOLDOWN_SECS`.
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.until = Some(now + Duration::seconds(COOLDOWN_SECS));
    }

    /// Whole seconds left in the window, saturating at zero.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        match self.until {
            Some(until) if until > now => (until - now).num_seconds().max(0),
            _ => 0,
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.remaining_seconds(now) > 0
    }

    /// Clear the window without waiting it out. Used when a fresh anchor
    /// search should not inherit a stale deadline from a corrupt state file.
    pub fn clear(&mut self) {
        self.until = None;
    }
}

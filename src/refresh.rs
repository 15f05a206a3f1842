//! # Refresh — Keyword Auto-Refresh Gate
//!
//! Keyword search results are re-fetched on a fixed 40-second interval, but
//! only while no manual ID-based search is active and no request is already
//! in flight. The gate is disabled the instant a user performs an ID-based
//! operation and re-armed only by issuing a new keyword search — single-ID
//! mode and keyword auto-refresh are mutually exclusive.
//!
//! Like [`crate::cooldown`], this tracks an absolute due time against an
//! injected `now` instead of owning a timer, so the watch loop in the CLI
//! can poll it once a second and tests can drive it with fixed instants.

use chrono::{DateTime, Duration, Utc};

/// Seconds between automatic keyword re-fetches.
pub const REFRESH_INTERVAL_SECS: i64 = 40;

/// Gate deciding when the next automatic keyword re-fetch may fire.
#[derive(Debug, Clone, Default)]
pub struct RefreshGate {
    enabled: bool,
    in_flight: bool,
    next_due: Option<DateTime<Utc>>,
}

impl RefreshGate {
    pub fn new() -> Self {
        RefreshGate::default()
    }

    /// Arm the gate after a keyword search completes. The first automatic
    /// re-fetch becomes due one full interval later.
    pub fn arm(&mut self, now: DateTime<Utc>) {
        self.enabled = true;
        self.next_due = Some(now + Duration::seconds(REFRESH_INTERVAL_SECS));
    }

    /// Disable auto-refresh. Called on every ID-based lookup or scan.
    pub fn disarm(&mut self) {
        self.enabled = false;
        self.next_due = None;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// True when a re-fetch is due: armed, nothing in flight, interval
    /// elapsed. Claims the slot, so the caller must pair this with
    /// [`RefreshGate::complete`] once the request resolves.
    pub fn try_fire(&mut self, now: DateTime<Utc>) -> bool {
        if !self.enabled || self.in_flight {
            return false;
        }
        match self.next_due {
            Some(due) if now >= due => {
                self.in_flight = true;
                true
            }
            _ => false,
        }
    }

    /// Mark the in-flight re-fetch as resolved (success or failure) and
    /// schedule the next one.
    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.in_flight = false;
        if self.enabled {
            self.next_due = Some(now + Duration::seconds(REFRESH_INTERVAL_SECS));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn disarmed_gate_never_fires() {
        let mut gate = RefreshGate::new();
        assert!(!gate.try_fire(at(1000)));
    }

    #[test]
    fn fires_only_after_full_interval() {
        let mut gate = RefreshGate::new();
        gate.arm(at(0));
        assert!(!gate.try_fire(at(REFRESH_INTERVAL_SECS - 1)));
        assert!(gate.try_fire(at(REFRESH_INTERVAL_SECS)));
    }

    #[test]
    fn does_not_fire_while_in_flight() {
        let mut gate = RefreshGate::new();
        gate.arm(at(0));
        assert!(gate.try_fire(at(REFRESH_INTERVAL_SECS)));
        // Request still pending: no duplicate submission.
        assert!(!gate.try_fire(at(REFRESH_INTERVAL_SECS + 10)));
        gate.complete(at(REFRESH_INTERVAL_SECS + 10));
        assert!(gate.try_fire(at(2 * REFRESH_INTERVAL_SECS + 10)));
    }

    #[test]
    fn id_search_disarms_until_rearmed() {
        let mut gate = RefreshGate::new();
        gate.arm(at(0));
        gate.disarm();
        assert!(!gate.is_enabled());
        assert!(!gate.try_fire(at(10 * REFRESH_INTERVAL_SECS)));
        gate.arm(at(500));
        assert!(gate.try_fire(at(500 + REFRESH_INTERVAL_SECS)));
    }
}

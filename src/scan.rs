//! # Scan — Paginated ID-Range Search Controller
//!
//! State machine behind the three ID-based discovery actions: look up one
//! project ID, scan a batch of up to 20 forward from an anchor, or continue
//! the scan forward/backward from the last probed ID. The backend performs
//! the actual range walk; this module derives the anchors, enforces the
//! gates, and keeps the cursor consistent between calls.
//!
//! ## Gates
//!
//! - Batch operations are locked out while the 59-second [`Cooldown`] is
//!   active. Single-ID lookups are exempt.
//! - Continue-forward is disabled once a successful batch comes back short
//!   (`total_found < 20`) until a new anchor search resets the flag.
//! - Continue-backward is clamped at ID 1 and refused once the cursor sits
//!   there.
//!
//! ## Cursor discipline
//!
//! The cursor is only updated after a call *completes* — never optimistically
//! before the backend resolves. On failure the cursor still advances when the
//! error payload reports a `last_checked_id` (else it pins to the requested
//! anchor), so a scan keeps moving past gaps of missing IDs instead of
//! getting stuck.
//!
//! Anchor derivation falls back through a chain: prefer `last_checked_id`,
//! else `start_id ± 1`, else refuse. This lets a user who just anchored a
//! fresh batch use next/previous before that batch has ever completed.
//!
//! All transitions are pure over the state plus an injected `now`; no I/O
//! and no timers live here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cooldown::Cooldown;

/// Maximum projects a single batch scan returns.
pub const BATCH_SIZE: u32 = 20;

/// Direction the next continue operation walks the ID space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
        }
    }
}

/// Why a batch operation was refused without issuing a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanGate {
    #[error("cooldown active, {remaining}s remaining")]
    CoolingDown { remaining: i64 },
    #[error("end of range reached, start a new anchor search")]
    EndOfRange,
    #[error("no cursor yet, run a lookup or batch scan first")]
    NoCursor,
    #[error("cursor is at ID 1, cannot scan backward")]
    AtRangeStart,
}

/// Scalar view of a completed batch, fed back into the cursor. The project
/// list itself flows to the display layer and is not retained here.
#[derive(Debug, Clone, Copy)]
pub struct BatchReport {
    pub start_id: u64,
    pub last_checked_id: u64,
    pub total_found: u32,
    pub direction: Direction,
}

/// Pagination position for ID-based project discovery. Persists for the
/// life of the view (and, via the state file, across CLI invocations).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScanState {
    /// Anchor ID of the most recent batch or lookup request.
    pub start_id: Option<u64>,
    /// Highest/lowest ID actually probed by the last completed call.
    pub last_checked_id: Option<u64>,
    pub direction: Direction,
    /// Projects found by the most recent completed call.
    pub last_result_count: u32,
    /// Set when a successful batch comes back short of [`BATCH_SIZE`];
    /// cleared by any new anchor search (single lookup or fresh batch).
    pub end_of_range: bool,
    pub cooldown: Cooldown,
}

impl ScanState {
    pub fn new() -> Self {
        ScanState::default()
    }

    // ── Anchor derivation ───────────────────────────────────────

    /// Anchor for the next forward continue: `last_checked_id + 1`, falling
    /// back to `start_id + 1` before any batch has completed.
    pub fn forward_anchor(&self) -> Option<u64> {
        self.last_checked_id
            .map(|id| id + 1)
            .or_else(|| self.start_id.map(|id| id + 1))
    }

    /// Anchor for the next backward continue, clamped so ID 0 is never
    /// probed: `max(1, last_checked_id - 1)`, falling back to `start_id`.
    pub fn backward_anchor(&self) -> Option<u64> {
        self.last_checked_id
            .or(self.start_id)
            .map(|id| id.saturating_sub(1).max(1))
    }

    fn effective_cursor(&self) -> Option<u64> {
        self.last_checked_id.or(self.start_id)
    }

    // ── Gate checks (plan before calling the backend) ───────────

    /// Gate for a fresh batch from a user-entered anchor. Only the cooldown
    /// applies; the anchor itself is validated at the edge (must be ≥ 1).
    pub fn plan_batch(&self, now: DateTime<Utc>) -> Result<(), ScanGate> {
        self.check_cooldown(now)
    }

    /// Gate and anchor for continue-forward.
    pub fn plan_continue_forward(&self, now: DateTime<Utc>) -> Result<u64, ScanGate> {
        self.check_cooldown(now)?;
        if self.end_of_range {
            return Err(ScanGate::EndOfRange);
        }
        self.forward_anchor().ok_or(ScanGate::NoCursor)
    }

    /// Gate and anchor for continue-backward.
    pub fn plan_continue_backward(&self, now: DateTime<Utc>) -> Result<u64, ScanGate> {
        self.check_cooldown(now)?;
        match self.effective_cursor() {
            None => Err(ScanGate::NoCursor),
            Some(id) if id <= 1 => Err(ScanGate::AtRangeStart),
            Some(_) => Ok(self.backward_anchor().expect("cursor present")),
        }
    }

    fn check_cooldown(&self, now: DateTime<Utc>) -> Result<(), ScanGate> {
        if self.cooldown.is_active(now) {
            return Err(ScanGate::CoolingDown {
                remaining: self.cooldown.remaining_seconds(now),
            });
        }
        Ok(())
    }

    // ── Transitions (record completed calls) ────────────────────

    /// Record a completed batch scan. Every batch restarts the cooldown.
    pub fn record_batch(&mut self, report: &BatchReport, now: DateTime<Utc>) {
        self.start_id = Some(report.start_id);
        self.last_checked_id = Some(report.last_checked_id);
        self.direction = report.direction;
        self.last_result_count = report.total_found;
        self.end_of_range = report.total_found < BATCH_SIZE;
        self.cooldown.start(now);
    }

    /// Record a failed batch scan. The cooldown still starts (anti-spam
    /// policy holds on the error path), and the cursor advances to whatever
    /// the backend reports, else pins to the requested anchor. The
    /// end-of-range flag is left clear so the scan stays continuable past
    /// gaps of missing IDs.
    pub fn record_batch_failure(
        &mut self,
        requested_anchor: u64,
        direction: Direction,
        reported_cursor: Option<u64>,
        now: DateTime<Utc>,
    ) {
        self.start_id = Some(requested_anchor);
        self.last_checked_id = Some(reported_cursor.unwrap_or(requested_anchor));
        self.direction = direction;
        self.last_result_count = 0;
        self.end_of_range = false;
        self.cooldown.start(now);
    }

    /// Record a completed single-ID lookup. Exempt from the cooldown; both
    /// outcomes pin the cursor to the requested ID and clear the
    /// end-of-range flag, re-arming continue-forward.
    pub fn record_lookup(&mut self, id: u64, found: bool) {
        self.start_id = Some(id);
        self.last_checked_id = Some(id);
        self.direction = Direction::Forward;
        self.last_result_count = u32::from(found);
        self.end_of_range = false;
    }
}

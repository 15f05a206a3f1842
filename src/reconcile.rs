//! # Reconcile — Local Bid-Status Patching
//!
//! Applies exactly one bid's confirmed status change to an in-memory
//! [`TrackerSnapshot`] and recomputes every counter that depends on it,
//! without a round-trip fetch. Called strictly after the backend
//! acknowledges the write — no optimistic patch is ever applied, so the
//! local tree is always consistent with the last acknowledged server state.
//!
//! The patch is a pure function: the input snapshot is untouched and a new
//! one is returned. Counters are recounted from the bid lists rather than
//! incremented, per the discipline in [`crate::tracker`].
//!
//! A `date_key` that doesn't exist in the target bucket indicates a
//! caller/server inconsistency; the function returns the snapshot unchanged
//! rather than failing.

use crate::tracker::{BidStatus, DateBucket, TrackerSnapshot};

/// Patch one bid's status and re-derive the dependent aggregates.
///
/// `selected_user_id` picks the user bucket in the admin shape and is
/// ignored for the single-user shape. The status transition itself is
/// unguarded (any status may replace any other); if ordering rules ever
/// become product intent, this is the one place to add them.
pub fn apply_status_change(
    snapshot: &TrackerSnapshot,
    bid_id: &str,
    new_status: BidStatus,
    date_key: &str,
    selected_user_id: Option<&str>,
) -> TrackerSnapshot {
    let mut patched = snapshot.clone();
    match &mut patched {
        TrackerSnapshot::Admin(snap) => {
            let Some(user) = snap
                .users
                .iter_mut()
                .find(|u| Some(u.user_id.as_str()) == selected_user_id)
            else {
                return patched;
            };
            if patch_date_bucket(user.dates.get_mut(date_key), bid_id, new_status) {
                user.recount();
            }
        }
        TrackerSnapshot::User(snap) => {
            if patch_date_bucket(snap.dates.get_mut(date_key), bid_id, new_status) {
                let mut totals = crate::tracker::StatusCounts::default();
                for bucket in snap.dates.values() {
                    totals.add(&bucket.status_counts);
                }
                snap.month_totals.status_counts = totals;
            }
        }
    }
    patched
}

/// Rewrite the matching bid's status and recount the bucket. Returns false
/// when the date bucket is absent, leaving the caller's slice untouched.
fn patch_date_bucket(
    bucket: Option<&mut DateBucket>,
    bid_id: &str,
    new_status: BidStatus,
) -> bool {
    let Some(bucket) = bucket else {
        return false;
    };
    for bid in &mut bucket.bids {
        if bid.id == bid_id {
            bid.status = new_status;
        }
    }
    bucket.recount();
    true
}

//! # Tracker — Bid Tracking Data Model
//!
//! Typed view of the `GET /api/bids/tracker` payload: bid records grouped
//! into per-date buckets, and (for privileged viewers) per-user buckets
//! above those. The endpoint returns one of two shapes depending on the
//! viewer's role; these are modeled as a tagged variant so consuming code
//! pattern-matches exhaustively instead of checking an `is_admin` flag ad
//! hoc.
//!
//! ## Counter discipline
//!
//! Every `status_counts` mapping is a pure re-derivation of the bid list it
//! summarizes — [`StatusCounts::tally`] is the only way counts are produced,
//! and counters are never incremented or decremented directly. A full
//! recount after each mutation avoids drift if a stored status was
//! previously inconsistent.
//!
//! Statuses outside the four canonical values deserialize to
//! [`BidStatus::Unknown`] and are skipped by the tally: a corrupt status
//! string neither throws nor silently inflates a bucket it doesn't belong
//! to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifecycle of one proposal. The usual progression is pending → bid_seen →
/// response_received → awarded, but no ordering is enforced: the backend
/// accepts any status from any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    #[default]
    Pending,
    BidSeen,
    ResponseReceived,
    Awarded,
    /// Anything the wire carries that isn't one of the four canonical
    /// statuses. Ignored by tallies.
    #[serde(other)]
    Unknown,
}

impl BidStatus {
    pub const CANONICAL: [BidStatus; 4] = [
        BidStatus::Pending,
        BidStatus::BidSeen,
        BidStatus::ResponseReceived,
        BidStatus::Awarded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BidStatus::Pending => "pending",
            BidStatus::BidSeen => "bid_seen",
            BidStatus::ResponseReceived => "response_received",
            BidStatus::Awarded => "awarded",
            BidStatus::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Option<BidStatus> {
        match s {
            "pending" => Some(BidStatus::Pending),
            "bid_seen" => Some(BidStatus::BidSeen),
            "response_received" => Some(BidStatus::ResponseReceived),
            "awarded" => Some(BidStatus::Awarded),
            _ => None,
        }
    }
}

/// Per-status counters for one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    #[serde(default)]
    pub pending: u32,
    #[serde(default)]
    pub bid_seen: u32,
    #[serde(default)]
    pub response_received: u32,
    #[serde(default)]
    pub awarded: u32,
}

impl StatusCounts {
    /// Re-derive counts from scratch by tallying a bid list. Unknown
    /// statuses are not counted anywhere.
    pub fn tally(bids: &[BidRecord]) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for bid in bids {
            match bid.status {
                BidStatus::Pending => counts.pending += 1,
                BidStatus::BidSeen => counts.bid_seen += 1,
                BidStatus::ResponseReceived => counts.response_received += 1,
                BidStatus::Awarded => counts.awarded += 1,
                BidStatus::Unknown => {}
            }
        }
        counts
    }

    pub fn get(&self, status: BidStatus) -> u32 {
        match status {
            BidStatus::Pending => self.pending,
            BidStatus::BidSeen => self.bid_seen,
            BidStatus::ResponseReceived => self.response_received,
            BidStatus::Awarded => self.awarded,
            BidStatus::Unknown => 0,
        }
    }

    pub fn total(&self) -> u32 {
        self.pending + self.bid_seen + self.response_received + self.awarded
    }

    pub fn add(&mut self, other: &StatusCounts) {
        self.pending += other.pending;
        self.bid_seen += other.bid_seen;
        self.response_received += other.response_received;
        self.awarded += other.awarded;
    }
}

/// One proposal submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub bid_text: String,
    #[serde(default)]
    pub amount: f64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub link: String,
    #[serde(rename = "bid_status", default)]
    pub status: BidStatus,
}

/// All bids submitted on one calendar date, keyed by ISO date string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateBucket {
    pub date: String,
    pub bids: Vec<BidRecord>,
    #[serde(default)]
    pub status_counts: StatusCounts,
    #[serde(default)]
    pub total_count: u32,
}

impl DateBucket {
    /// Recount this bucket's counters from its bid list.
    pub fn recount(&mut self) {
        self.status_counts = StatusCounts::tally(&self.bids);
        self.total_count = self.bids.len() as u32;
    }
}

/// Aggregates one user's date buckets (admin view only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserBucket {
    pub user_id: String,
    pub username: String,
    pub dates: BTreeMap<String, DateBucket>,
    #[serde(default)]
    pub status_counts: StatusCounts,
    #[serde(default)]
    pub total_bids: u32,
}

impl UserBucket {
    /// Re-sum the user-level aggregate from all contained date buckets.
    pub fn recount(&mut self) {
        let mut counts = StatusCounts::default();
        let mut total = 0;
        for bucket in self.dates.values() {
            counts.add(&bucket.status_counts);
            total += bucket.total_count;
        }
        self.status_counts = counts;
        self.total_bids = total;
    }
}

/// Aggregate across all date buckets for the signed-in user in the
/// selected month.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthTotals {
    #[serde(default)]
    pub status_counts: StatusCounts,
}

/// Multi-user shape returned for admin and super-admin viewers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminSnapshot {
    pub users: Vec<UserBucket>,
}

/// Single-user shape for everyone else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSnapshot {
    pub dates: BTreeMap<String, DateBucket>,
    #[serde(default)]
    pub month_totals: MonthTotals,
}

/// Root structure for one (year, month, viewer) selection. Replaced
/// wholesale on every explicit refresh or filter change, but patched in
/// place by [`crate::reconcile::apply_status_change`] after a confirmed
/// status write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrackerSnapshot {
    Admin(AdminSnapshot),
    User(UserSnapshot),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bid(id: &str, status: BidStatus) -> BidRecord {
        BidRecord {
            id: id.to_string(),
            title: format!("project {id}"),
            bid_text: String::new(),
            amount: 50.0,
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            link: String::new(),
            status,
        }
    }

    #[test]
    fn tally_counts_each_canonical_status() {
        let bids = vec![
            bid("a", BidStatus::Pending),
            bid("b", BidStatus::Pending),
            bid("c", BidStatus::Awarded),
            bid("d", BidStatus::ResponseReceived),
        ];
        let counts = StatusCounts::tally(&bids);
        assert_eq!(counts.pending, 2);
        assert_eq!(counts.bid_seen, 0);
        assert_eq!(counts.response_received, 1);
        assert_eq!(counts.awarded, 1);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn tally_skips_unknown_statuses() {
        let bids = vec![bid("a", BidStatus::Pending), bid("b", BidStatus::Unknown)];
        let counts = StatusCounts::tally(&bids);
        assert_eq!(counts.total(), 1);
        assert_eq!(counts.pending, 1);
    }

    #[test]
    fn missing_status_deserializes_to_pending() {
        let json = r#"{
            "id": "b1",
            "title": "Logo design",
            "created_at": "2024-05-01T10:00:00Z"
        }"#;
        let record: BidRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.status, BidStatus::Pending);
    }

    #[test]
    fn corrupt_status_deserializes_to_unknown() {
        let json = r#"{
            "id": "b1",
            "title": "Logo design",
            "created_at": "2024-05-01T10:00:00Z",
            "bid_status": "totally_bogus"
        }"#;
        let record: BidRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.status, BidStatus::Unknown);
    }

    #[test]
    fn snapshot_deserializes_admin_shape() {
        let json = r#"{
            "is_admin": true,
            "users": [{
                "user_id": "u1",
                "username": "alice",
                "dates": {},
                "status_counts": {},
                "total_bids": 0
            }]
        }"#;
        match serde_json::from_str::<TrackerSnapshot>(json).unwrap() {
            TrackerSnapshot::Admin(snap) => {
                assert_eq!(snap.users.len(), 1);
                assert_eq!(snap.users[0].username, "alice");
            }
            TrackerSnapshot::User(_) => panic!("expected admin shape"),
        }
    }

    #[test]
    fn snapshot_deserializes_user_shape() {
        let json = r#"{
            "is_admin": false,
            "dates": {
                "2024-05-01": {
                    "date": "2024-05-01",
                    "bids": [],
                    "status_counts": {},
                    "total_count": 0
                }
            },
            "month_totals": {"status_counts": {"pending": 3}}
        }"#;
        match serde_json::from_str::<TrackerSnapshot>(json).unwrap() {
            TrackerSnapshot::User(snap) => {
                assert!(snap.dates.contains_key("2024-05-01"));
                assert_eq!(snap.month_totals.status_counts.pending, 3);
            }
            TrackerSnapshot::Admin(_) => panic!("expected user shape"),
        }
    }

    #[test]
    fn user_recount_sums_date_buckets() {
        let mut date_a = DateBucket {
            date: "2024-05-01".into(),
            bids: vec![bid("a", BidStatus::Pending), bid("b", BidStatus::Awarded)],
            status_counts: StatusCounts::default(),
            total_count: 0,
        };
        date_a.recount();
        let mut date_b = DateBucket {
            date: "2024-05-02".into(),
            bids: vec![bid("c", BidStatus::Pending)],
            status_counts: StatusCounts::default(),
            total_count: 0,
        };
        date_b.recount();

        let mut user = UserBucket {
            user_id: "u1".into(),
            username: "alice".into(),
            dates: BTreeMap::from([
                ("2024-05-01".to_string(), date_a),
                ("2024-05-02".to_string(), date_b),
            ]),
            status_counts: StatusCounts::default(),
            total_bids: 0,
        };
        user.recount();
        assert_eq!(user.total_bids, 3);
        assert_eq!(user.status_counts.pending, 2);
        assert_eq!(user.status_counts.awarded, 1);
        assert_eq!(user.status_counts.total(), user.total_bids);
    }
}

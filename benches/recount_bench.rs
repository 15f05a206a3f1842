use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::collections::BTreeMap;

use bidreach::reconcile::apply_status_change;
use bidreach::scan::{BatchReport, Direction, ScanState};
use bidreach::statefile;
use bidreach::tracker::{
    BidRecord, BidStatus, DateBucket, MonthTotals, StatusCounts, TrackerSnapshot, UserSnapshot,
};

/// A busy month: 30 days with 50 bids each.
fn month_snapshot() -> TrackerSnapshot {
    let statuses = [
        BidStatus::Pending,
        BidStatus::BidSeen,
        BidStatus::ResponseReceived,
        BidStatus::Awarded,
    ];
    let mut dates = BTreeMap::new();
    for day in 1..=30u32 {
        let date = format!("2024-05-{day:02}");
        let bids: Vec<BidRecord> = (0..50)
            .map(|i| BidRecord {
                id: format!("b-{day}-{i}"),
                title: format!("project {i}"),
                bid_text: "proposal".into(),
                amount: 80.0,
                created_at: Utc.timestamp_opt(1_714_521_600, 0).unwrap(),
                link: String::new(),
                status: statuses[i % statuses.len()],
            })
            .collect();
        let mut bucket = DateBucket {
            date: date.clone(),
            bids,
            status_counts: StatusCounts::default(),
            total_count: 0,
        };
        bucket.recount();
        dates.insert(date, bucket);
    }
    let mut totals = StatusCounts::default();
    for bucket in dates.values() {
        totals.add(&bucket.status_counts);
    }
    TrackerSnapshot::User(UserSnapshot {
        dates,
        month_totals: MonthTotals {
            status_counts: totals,
        },
    })
}

fn bench_tally(c: &mut Criterion) {
    let bids: Vec<BidRecord> = (0..1000)
        .map(|i| BidRecord {
            id: format!("b{i}"),
            title: "x".into(),
            bid_text: String::new(),
            amount: 50.0,
            created_at: Utc.timestamp_opt(1_714_521_600, 0).unwrap(),
            link: String::new(),
            status: BidStatus::Pending,
        })
        .collect();
    c.bench_function("tally(1000 bids)", |b| {
        b.iter(|| StatusCounts::tally(black_box(&bids)));
    });
}

fn bench_apply_status_change(c: &mut Criterion) {
    let snapshot = month_snapshot();
    c.bench_function("apply_status_change(30x50 month)", |b| {
        b.iter(|| {
            apply_status_change(
                black_box(&snapshot),
                black_box("b-15-25"),
                BidStatus::Awarded,
                "2024-05-15",
                None,
            )
        });
    });
}

fn bench_statefile_save_load(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bench_scan.json");
    let mut state = ScanState::new();
    state.record_batch(
        &BatchReport {
            start_id: 1000,
            last_checked_id: 1049,
            total_found: 20,
            direction: Direction::Forward,
        },
        Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
    );

    c.bench_function("statefile_save_load", |b| {
        b.iter(|| {
            statefile::save(black_box(&path), black_box(&state)).unwrap();
            statefile::load(black_box(&path)).unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_tally,
    bench_apply_status_change,
    bench_statefile_save_load,
);
criterion_main!(benches);

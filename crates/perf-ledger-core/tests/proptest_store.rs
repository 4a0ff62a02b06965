// crates/perf-ledger-core/tests/proptest_store.rs
// ============================================================================
// Module: Store and Classifier Property-Based Tests
// Description: Property tests for merge, retention, and size conservation.
// Purpose: Check store and classifier invariants across wide input ranges.
// ============================================================================

//! Property-based tests for history store and classifier invariants.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::cast_precision_loss,
    missing_docs,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::collections::BTreeSet;

use perf_ledger_core::HistoryStore;
use perf_ledger_core::MetricsRecord;
use perf_ledger_core::RequestDescriptor;
use perf_ledger_core::classifier::accumulate_bytes;
use perf_ledger_core::classify_requests;
use proptest::prelude::*;

fn record_strategy() -> impl Strategy<Value = MetricsRecord> {
    (0u32 ..= 100, 0u64 .. 10_000).prop_map(|(score, fcp)| {
        let mut record = common::record_with_score(f64::from(score) / 100.0);
        record.metrics.fcp = fcp;
        record
    })
}

fn key_strategy() -> impl Strategy<Value = (String, String, String)> {
    (
        prop::sample::select(vec!["https://a.example", "https://b.example"]),
        (1u32 ..= 28).prop_map(|day| format!("202504{day:02}")),
        prop::sample::select(vec!["desktop", "mobile", "tablet"]),
    )
        .prop_map(|(target, date, device)| (target.to_string(), date, device.to_string()))
}

fn request_strategy() -> impl Strategy<Value = RequestDescriptor> {
    (
        prop::sample::select(vec!["a.js", "b.css", "c.png", "d.woff", "e.html", "f"]),
        prop::option::of(-100.0f64 .. 1_000_000.0),
        prop::option::of(0.0f64 .. 1_000_000.0),
    )
        .prop_map(|(url, transfer_size, resource_size)| RequestDescriptor {
            url: url.to_string(),
            transfer_size,
            resource_size,
            mime_type: None,
        })
}

proptest! {
    #[test]
    fn upsert_is_idempotent(
        seed in prop::collection::vec((key_strategy(), record_strategy()), 0 .. 12),
        (key, record) in (key_strategy(), record_strategy()),
    ) {
        let mut store = HistoryStore::new();
        for ((target, date, device), record) in seed {
            store.upsert(&target, &date, &device, record).unwrap();
        }
        store.upsert(&key.0, &key.1, &key.2, record.clone()).unwrap();
        let once = store.clone();
        store.upsert(&key.0, &key.1, &key.2, record).unwrap();
        prop_assert_eq!(store, once);
    }

    #[test]
    fn upsert_merges_distinct_devices(
        a in record_strategy(),
        b in record_strategy(),
        (target, date, _) in key_strategy(),
    ) {
        let mut store = HistoryStore::new();
        store.upsert(&target, &date, "a-device", a.clone()).unwrap();
        store.upsert(&target, &date, "b-device", b.clone()).unwrap();
        prop_assert_eq!(store.len(), 1);
        let entry = store.find(&target, &date).unwrap();
        prop_assert_eq!(entry.device("a-device"), Some(&a));
        prop_assert_eq!(entry.device("b-device"), Some(&b));
    }

    #[test]
    fn prune_keeps_exactly_the_most_recent_dates(
        keys in prop::collection::vec(key_strategy(), 0 .. 40),
        retention in 1usize .. 20,
    ) {
        let mut store = HistoryStore::new();
        for (target, date, device) in &keys {
            store.upsert(target, date, device, common::record_with_score(0.5)).unwrap();
        }
        let all: BTreeSet<String> = keys.iter().map(|(_, date, _)| date.clone()).collect();
        store.prune(retention);

        let kept: BTreeSet<String> = store.distinct_dates().into_iter().collect();
        let expected: BTreeSet<String> = all.iter().rev().take(retention).cloned().collect();
        prop_assert_eq!(kept, expected);

        let keys_after: BTreeSet<(String, String)> = store
            .entries()
            .iter()
            .map(|entry| (entry.target.clone(), entry.date.clone()))
            .collect();
        prop_assert_eq!(keys_after.len(), store.len());
    }

    #[test]
    fn resource_totals_are_conserved(
        requests in prop::collection::vec(request_strategy(), 0 .. 50),
    ) {
        let sizes = classify_requests(&requests);
        let input_kb: f64 = requests
            .iter()
            .filter_map(RequestDescriptor::effective_size)
            .sum::<f64>()
            / 1024.0;
        let totals = accumulate_bytes(&requests);
        let buckets = [totals.js, totals.css, totals.image, totals.font, totals.other];
        let non_empty = buckets.iter().filter(|bytes| **bytes > 0.0).count();
        let bucket_kb = sizes.total() as f64;
        prop_assert!(
            (bucket_kb - input_kb).abs() <= non_empty as f64 * 0.5 + 1e-6,
            "buckets {bucket_kb} vs input {input_kb}"
        );
    }
}

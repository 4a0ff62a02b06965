// crates/perf-ledger-core/tests/concurrency.rs
// ============================================================================
// Module: Concurrent Ingestion Tests
// Description: Lost-update reproduction and its locked-transaction fix.
// Purpose: Show that overlapping runs keep every device key.
// Dependencies: perf-ledger-core, tempfile
// ============================================================================

//! ## Overview
//! The unsynchronized test interleaves two load/mutate/save cycles by hand to
//! reproduce the lost update deterministically. The locked tests run the same
//! cycles on real threads through [`HistoryFile::transaction`] and
//! [`ingest`], with a barrier so the runs start together.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    missing_docs,
    reason = "Test-only panic-based assertions are permitted."
)]

mod common;

use std::sync::Arc;
use std::sync::Barrier;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use perf_ledger_core::HistoryFile;
use perf_ledger_core::HistoryStore;
use perf_ledger_core::IngestRequest;
use perf_ledger_core::NoopEventSink;
use perf_ledger_core::ingest;
use tempfile::TempDir;

const TARGET: &str = "https://example.org";
const DATE: &str = "20250420";

#[test]
fn unsynchronized_cycles_lose_a_device_key() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.json");

    // Both runs load the same pre-update state before either saves.
    let mut first = HistoryStore::load(&path).unwrap().store;
    let mut second = HistoryStore::load(&path).unwrap().store;
    first.upsert(TARGET, DATE, "desktop", common::record_with_score(0.7)).unwrap();
    second.upsert(TARGET, DATE, "mobile", common::record_with_score(0.4)).unwrap();
    first.save(&path).unwrap();
    second.save(&path).unwrap();

    let store = common::load_store(&path);
    let entry = store.find(TARGET, DATE).unwrap();
    assert!(entry.device("desktop").is_none());
    assert!(entry.device("mobile").is_some());
}

#[test]
fn locked_transactions_keep_both_device_keys() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.json");
    let barrier = Arc::new(Barrier::new(2));
    let (loaded_tx, loaded_rx) = mpsc::channel();

    let slow = {
        let path = path.clone();
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            HistoryFile::new(&path)
                .transaction(15, |store| {
                    loaded_tx.send(()).unwrap();
                    // Hold the lock long enough for the other run to contend.
                    thread::sleep(Duration::from_millis(100));
                    store.upsert(TARGET, DATE, "desktop", common::record_with_score(0.7))
                })
                .unwrap();
        })
    };
    let fast = {
        let path = path.clone();
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            loaded_rx.recv().unwrap();
            HistoryFile::new(&path)
                .transaction(15, |store| {
                    store.upsert(TARGET, DATE, "mobile", common::record_with_score(0.4))
                })
                .unwrap();
        })
    };
    slow.join().unwrap();
    fast.join().unwrap();

    let store = common::load_store(&path);
    assert_eq!(store.len(), 1);
    let entry = store.find(TARGET, DATE).unwrap();
    assert!(entry.device("desktop").is_some());
    assert!(entry.device("mobile").is_some());
}

#[test]
fn concurrent_ingest_runs_keep_every_device() {
    let dir = TempDir::new().unwrap();
    let report = common::write_report(dir.path(), "report.json", &common::audit_document(0.8));
    let store_path = dir.path().join("history.json");
    let devices = ["desktop", "mobile", "tablet", "watch"];
    let barrier = Arc::new(Barrier::new(devices.len()));

    let handles: Vec<_> = devices
        .iter()
        .map(|device| {
            let request = IngestRequest::new(&report, &store_path, TARGET, DATE, *device);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                ingest(&request, &NoopEventSink).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let store = common::load_store(&store_path);
    assert_eq!(store.len(), 1);
    let entry = store.find(TARGET, DATE).unwrap();
    for device in devices {
        assert!(entry.device(device).is_some(), "{device} lost");
    }
}

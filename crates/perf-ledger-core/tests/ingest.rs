// crates/perf-ledger-core/tests/ingest.rs
// ============================================================================
// Module: Ingestion Driver Tests
// Description: End-to-end ingestion runs against temporary stores.
// Purpose: Ensure fatal conditions never modify the persisted store.
// Dependencies: perf-ledger-core, tempfile
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    missing_docs,
    reason = "Test-only panic-based assertions are permitted."
)]

mod common;

use std::fs;

use perf_ledger_core::IngestError;
use perf_ledger_core::IngestRequest;
use perf_ledger_core::LoadStatus;
use perf_ledger_core::MemoryEventSink;
use perf_ledger_core::MetricRating;
use perf_ledger_core::NoopEventSink;
use perf_ledger_core::UpsertOutcome;
use perf_ledger_core::ingest;
use serde_json::json;
use tempfile::TempDir;

const TARGET: &str = "https://example.org";

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn store_path(&self) -> std::path::PathBuf {
        self.dir.path().join("main-history.json")
    }

    fn request(&self, report: &str, date: &str, device: &str) -> IngestRequest {
        IngestRequest::new(self.dir.path().join(report), self.store_path(), TARGET, date, device)
    }
}

#[test]
fn single_run_creates_store_entry() {
    let fixture = Fixture::new();
    common::write_report(fixture.dir.path(), "desktop.json", &common::audit_document(0.73));
    let sink = MemoryEventSink::new();

    let outcome = ingest(&fixture.request("desktop.json", "20250420", "desktop"), &sink).unwrap();
    assert_eq!(outcome.record.scores["performance"], 0.73);
    assert_eq!(outcome.upsert, UpsertOutcome::Inserted);
    assert_eq!(outcome.load_status, LoadStatus::Missing);
    assert_eq!(outcome.ratings.scores["performance"], MetricRating::NeedsImprovement);

    let store = common::load_store(&fixture.store_path());
    assert_eq!(store.len(), 1);
    let entry = store.find(TARGET, "20250420").unwrap();
    assert_eq!(entry.device("desktop").unwrap().scores["performance"], 0.73);
    assert_eq!(entry.device("desktop"), Some(&outcome.record));
    assert_eq!(
        sink.names(),
        vec!["ingest_started", "store_missing", "store_saved", "ingest_completed"]
    );
}

#[test]
fn report_files_default_to_store_directory() {
    let fixture = Fixture::new();
    common::write_report(fixture.dir.path(), "desktop-20250420.json", &common::audit_document(0.5));
    let request = fixture.request("desktop-20250420.json", "20250420", "desktop");
    let outcome = ingest(&request, &NoopEventSink).unwrap();
    assert_eq!(outcome.record.report_files.json, "desktop-20250420.json");
    assert_eq!(outcome.record.report_files.html, "desktop-20250420.html");
}

#[test]
fn sixteen_daily_runs_keep_fifteen_dates() {
    let fixture = Fixture::new();
    common::write_report(fixture.dir.path(), "report.json", &common::audit_document(0.6));
    let dates = common::consecutive_dates(16);
    let mut last = None;
    for date in &dates {
        let request = fixture.request("report.json", date, "desktop");
        last = Some(ingest(&request, &NoopEventSink).unwrap());
    }
    let last = last.unwrap();
    assert_eq!(last.prune.removed_dates, vec![dates[0].clone()]);
    let store = common::load_store(&fixture.store_path());
    assert_eq!(store.distinct_dates().len(), 15);
    assert!(store.find(TARGET, &dates[0]).is_none());
}

#[test]
fn missing_report_is_not_found_and_store_untouched() {
    let fixture = Fixture::new();
    common::write_report(fixture.dir.path(), "desktop.json", &common::audit_document(0.5));
    ingest(&fixture.request("desktop.json", "20250420", "desktop"), &NoopEventSink).unwrap();
    let before = fs::read(fixture.store_path()).unwrap();

    let sink = MemoryEventSink::new();
    let err = ingest(&fixture.request("absent.json", "20250421", "desktop"), &sink).unwrap_err();
    assert!(matches!(err, IngestError::NotFound(_)));
    assert_eq!(err.category(), "not_found");
    assert_eq!(fs::read(fixture.store_path()).unwrap(), before);
    assert_eq!(sink.names(), vec!["ingest_started", "ingest_failed"]);
}

#[test]
fn invalid_report_never_reaches_the_store() {
    let fixture = Fixture::new();
    common::write_report(fixture.dir.path(), "desktop.json", &common::audit_document(0.5));
    ingest(&fixture.request("desktop.json", "20250420", "desktop"), &NoopEventSink).unwrap();
    let before = fs::read(fixture.store_path()).unwrap();

    common::write_report(fixture.dir.path(), "broken.json", &json!({ "audits": {} }));
    let err =
        ingest(&fixture.request("broken.json", "20250420", "mobile"), &NoopEventSink).unwrap_err();
    assert_eq!(err.category(), "invalid_format");
    assert_eq!(fs::read(fixture.store_path()).unwrap(), before);
}

#[test]
fn invalid_context_is_rejected_before_reading() {
    let fixture = Fixture::new();
    let cases = [
        fixture.request("absent.json", "2025/04/20", "desktop"),
        fixture.request("absent.json", "20250230", "desktop"),
        fixture.request("absent.json", "20250420", "target"),
        fixture.request("absent.json", "20250420", "desk top"),
        IngestRequest::new("absent.json", fixture.store_path(), "", "20250420", "desktop"),
    ];
    for request in &cases {
        let err = ingest(request, &NoopEventSink).unwrap_err();
        assert_eq!(err.category(), "invalid_context", "{request:?}");
    }
    assert!(!fixture.store_path().exists());
}

#[test]
fn device_allow_list_is_enforced() {
    let fixture = Fixture::new();
    common::write_report(fixture.dir.path(), "report.json", &common::audit_document(0.5));
    let mut request = fixture.request("report.json", "20250420", "tablet");
    request.allowed_devices = vec!["desktop".to_string(), "mobile".to_string()];
    let err = ingest(&request, &NoopEventSink).unwrap_err();
    assert!(matches!(err, IngestError::InvalidContext(_)));
}

#[test]
fn missing_fields_emit_data_quality_events() {
    let fixture = Fixture::new();
    let document = json!({ "categories": { "performance": { "score": 0.5 } }, "audits": {} });
    common::write_report(fixture.dir.path(), "sparse.json", &document);
    let sink = MemoryEventSink::new();
    let outcome = ingest(&fixture.request("sparse.json", "20250420", "mobile"), &sink).unwrap();
    let quality = sink.names().iter().filter(|name| **name == "data_quality").count();
    assert_eq!(quality, outcome.notes.len());
    assert_eq!(quality, 9);
}

#[test]
fn malformed_store_is_reset_with_loud_events() {
    let fixture = Fixture::new();
    fs::write(fixture.store_path(), b"not json").unwrap();
    common::write_report(fixture.dir.path(), "report.json", &common::audit_document(0.5));
    let sink = MemoryEventSink::new();
    let outcome = ingest(&fixture.request("report.json", "20250420", "desktop"), &sink).unwrap();
    assert!(matches!(outcome.load_status, LoadStatus::Reset { .. }));
    let names = sink.names();
    assert!(names.contains(&"store_reset"));
    assert!(names.contains(&"store_quarantined"));
    assert_eq!(common::load_store(&fixture.store_path()).len(), 1);
    let quarantined = common::file_names(fixture.dir.path())
        .into_iter()
        .filter(|name| name.starts_with("main-history.json.corrupt-"))
        .count();
    assert_eq!(quarantined, 1);
}

// ============================================================================
// SECTION: Store I/O Failures
// ============================================================================

/// Store name whose lock file fits the 255-byte name limit while the
/// temporary sibling `.<name>.tmp.<pid>.<n>` does not.
fn store_name_without_room_for_temp() -> String {
    format!("{}.json", "h".repeat(243))
}

#[test]
fn write_failure_is_fatal_and_keeps_previous_store() {
    let fixture = Fixture::new();
    let store_path = fixture.dir.path().join(store_name_without_room_for_temp());
    let previous = br#"{ "reports": [ { "target": "https://example.org", "date": "20250419" } ] }"#;
    fs::write(&store_path, previous).unwrap();
    common::write_report(fixture.dir.path(), "desktop.json", &common::audit_document(0.5));
    let request = IngestRequest::new(
        fixture.dir.path().join("desktop.json"),
        &store_path,
        TARGET,
        "20250420",
        "desktop",
    );
    let sink = MemoryEventSink::new();

    let err = ingest(&request, &sink).unwrap_err();
    assert!(matches!(err, IngestError::WriteFailure(_)), "{err}");
    assert_eq!(err.category(), "write_failure");
    assert_eq!(fs::read(&store_path).unwrap(), previous);
    let leftovers: Vec<String> = common::file_names(fixture.dir.path())
        .into_iter()
        .filter(|name| name.contains(".tmp."))
        .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
    assert_eq!(sink.names(), vec!["ingest_started", "ingest_failed"]);
}

#[test]
fn store_under_a_regular_file_is_a_write_failure() {
    let fixture = Fixture::new();
    let blocker = fixture.dir.path().join("blocker");
    fs::write(&blocker, b"plain file").unwrap();
    common::write_report(fixture.dir.path(), "desktop.json", &common::audit_document(0.5));
    let request = IngestRequest::new(
        fixture.dir.path().join("desktop.json"),
        blocker.join("history.json"),
        TARGET,
        "20250420",
        "desktop",
    );

    let err = ingest(&request, &NoopEventSink).unwrap_err();
    assert_eq!(err.category(), "write_failure");
    assert_eq!(fs::read(&blocker).unwrap(), b"plain file");
}

#[test]
fn store_read_failure_is_an_io_error() {
    let fixture = Fixture::new();
    fs::create_dir(fixture.store_path()).unwrap();
    common::write_report(fixture.dir.path(), "desktop.json", &common::audit_document(0.5));

    let err = ingest(&fixture.request("desktop.json", "20250420", "desktop"), &NoopEventSink)
        .unwrap_err();
    assert!(matches!(err, IngestError::Io(_)), "{err}");
    assert_eq!(err.category(), "io");
    assert!(err.to_string().starts_with("store read failed:"), "{err}");
    assert!(fixture.store_path().is_dir());
}

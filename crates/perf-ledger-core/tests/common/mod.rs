// crates/perf-ledger-core/tests/common/mod.rs
// ============================================================================
// Module: Core Test Helpers
// Description: Shared audit fixtures and store helpers.
// Purpose: Reduce duplication across perf-ledger-core integration tests.
// ============================================================================

#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test helpers are selectively used across suites."
)]

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use perf_ledger_core::HistoryStore;
use perf_ledger_core::Metrics;
use perf_ledger_core::MetricsRecord;
use serde_json::Value;
use serde_json::json;

/// Returns a complete raw audit document with the given performance score.
pub fn audit_document(performance: f64) -> Value {
    json!({
        "categories": {
            "performance": { "score": performance },
            "accessibility": { "score": 0.981 },
            "best-practices": { "score": 1.0 },
            "seo": { "score": 0.9 }
        },
        "audits": {
            "first-contentful-paint": { "numericValue": 1234.4 },
            "largest-contentful-paint": { "numericValue": 2500.6 },
            "total-blocking-time": { "numericValue": 150.0 },
            "cumulative-layout-shift": { "numericValue": 0.123_456 },
            "interactive": { "numericValue": 3100.2 },
            "speed-index": { "numericValue": 2800.0 },
            "server-response-time": { "numericValue": 120.49 },
            "total-byte-weight": { "numericValue": 512_000.0 },
            "network-requests": {
                "details": {
                    "items": [
                        { "url": "https://example.org/app.js", "transferSize": 4096 },
                        { "url": "https://example.org/site.css", "transferSize": 2048 },
                        { "url": "https://example.org/hero.webp", "resourceSize": 10240 },
                        { "url": "https://example.org/api", "transferSize": 1024,
                          "mimeType": "application/json" },
                        { "url": "https://example.org/", "transferSize": 3072,
                          "mimeType": "text/html" }
                    ]
                }
            }
        }
    })
}

/// Writes an audit document to `dir/name` and returns its path.
pub fn write_report(dir: &Path, name: &str, document: &Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_vec_pretty(document).unwrap()).unwrap();
    path
}

/// Builds a record whose only distinguishing value is the performance score.
pub fn record_with_score(performance: f64) -> MetricsRecord {
    let mut record = MetricsRecord::default();
    record.scores.insert("performance".to_string(), performance);
    record.metrics = Metrics {
        fcp: 1000,
        ..Metrics::default()
    };
    record
}

/// Returns `count` consecutive `YYYYMMDD` dates starting at 2025-04-01.
pub fn consecutive_dates(count: usize) -> Vec<String> {
    let start = time::macros::date!(2025 - 04 - 01);
    (0 .. count)
        .map(|offset| {
            let day = start + time::Duration::days(i64::try_from(offset).unwrap());
            format!("{:04}{:02}{:02}", day.year(), u8::from(day.month()), day.day())
        })
        .collect()
}

/// Reads a store document from disk.
pub fn load_store(path: &Path) -> HistoryStore {
    HistoryStore::load(path).unwrap().store
}

/// Lists file names in `dir`, sorted.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

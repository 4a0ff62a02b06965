// crates/perf-ledger-core/src/record.rs
// ============================================================================
// Module: Normalized Records
// Description: Compact metrics snapshot and history entry types.
// Purpose: Define the persisted shapes consumed by the trend dashboard.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! [`MetricsRecord`] is the normalized snapshot for one (target, date, device)
//! triple and [`HistoryEntry`] groups the device snapshots for one
//! (target, date) key. Field names are part of the persisted boundary contract
//! and use the camelCase spelling the dashboard reads.
//!
//! ## Invariants
//! - Records never embed wall-clock timestamps or random identifiers.
//! - Score and device maps are ordered so serialization is byte-stable.
//! - Record fields absent from a stored document load as zero or empty, so
//!   documents written with fewer metrics stay readable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Entry keys reserved for the (target, date) identity; never valid device keys.
pub const RESERVED_ENTRY_KEYS: [&str; 2] = ["target", "date"];

// ============================================================================
// SECTION: Metrics Record
// ============================================================================

/// Normalized per-(target, date, device) performance snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsRecord {
    /// Category name to score, rounded to two decimals.
    #[serde(default)]
    pub scores: BTreeMap<String, f64>,
    /// Named timing and size metrics.
    #[serde(default)]
    pub metrics: Metrics,
    /// Transfer size per resource bucket in KB.
    #[serde(default)]
    pub resource_sizes: ResourceSizes,
    /// References to the detailed report artifacts.
    #[serde(default)]
    pub report_files: ReportFiles,
}

/// Timing and size metrics extracted from the audit document.
///
/// Milliseconds and bytes are whole numbers; `cls` keeps three decimals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    /// First contentful paint (ms).
    #[serde(default)]
    pub fcp: u64,
    /// Largest contentful paint (ms).
    #[serde(default)]
    pub lcp: u64,
    /// Total blocking time (ms).
    #[serde(default)]
    pub tbt: u64,
    /// Cumulative layout shift score.
    #[serde(default)]
    pub cls: f64,
    /// Time to interactive (ms).
    #[serde(default)]
    pub tti: u64,
    /// Speed index (ms).
    #[serde(default)]
    pub si: u64,
    /// Server response time (ms).
    #[serde(default)]
    pub server_response_time: u64,
    /// Total byte weight of the page (bytes).
    #[serde(default)]
    pub total_byte_weight: u64,
}

/// Aggregate transfer size per resource category, in KB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSizes {
    /// Scripts and JSON payloads.
    #[serde(default)]
    pub js: u64,
    /// Stylesheets.
    #[serde(default)]
    pub css: u64,
    /// Images and icons.
    #[serde(default)]
    pub image: u64,
    /// Web fonts.
    #[serde(default)]
    pub font: u64,
    /// Everything else.
    #[serde(default)]
    pub other: u64,
}

impl ResourceSizes {
    /// Returns the sum of all buckets in KB.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.js + self.css + self.image + self.font + self.other
    }
}

/// Paths to the detailed report artifacts for on-demand display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFiles {
    /// HTML report path relative to the report base directory.
    #[serde(default)]
    pub html: String,
    /// JSON report path relative to the report base directory.
    #[serde(default)]
    pub json: String,
    /// Absolute HTML report path.
    #[serde(default)]
    pub full_html_path: String,
    /// Absolute JSON report path.
    #[serde(default)]
    pub full_json_path: String,
}

// ============================================================================
// SECTION: History Entry
// ============================================================================

/// All device snapshots recorded for one (target, date) key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Tracked target identifier (usually a URL).
    pub target: String,
    /// Report date in `YYYYMMDD` or `YYYY-MM-DD` form.
    pub date: String,
    /// Device type to snapshot, flattened into the entry object.
    #[serde(flatten)]
    pub devices: BTreeMap<String, MetricsRecord>,
}

impl HistoryEntry {
    /// Creates an entry holding a single device snapshot.
    #[must_use]
    pub fn new(target: &str, date: &str, device_type: &str, record: MetricsRecord) -> Self {
        let mut devices = BTreeMap::new();
        devices.insert(device_type.to_string(), record);
        Self {
            target: target.to_string(),
            date: date.to_string(),
            devices,
        }
    }

    /// Returns true when the entry matches the (target, date) key.
    #[must_use]
    pub fn matches(&self, target: &str, date: &str) -> bool {
        self.target == target && self.date == date
    }

    /// Returns the snapshot recorded for `device_type`, if any.
    #[must_use]
    pub fn device(&self, device_type: &str) -> Option<&MetricsRecord> {
        self.devices.get(device_type)
    }
}

/// Persisted store document layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryDocument {
    /// Ordered history entries.
    #[serde(default)]
    pub reports: Vec<HistoryEntry>,
}

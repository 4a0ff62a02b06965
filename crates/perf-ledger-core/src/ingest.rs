// crates/perf-ledger-core/src/ingest.rs
// ============================================================================
// Module: Ingestion Driver
// Description: One end-to-end ingestion run against a history store.
// Purpose: Read, normalize, merge, prune, and persist a single audit report.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`ingest`] validates the run context, reads and normalizes the raw report,
//! and only then opens a locked [`HistoryFile`] transaction that upserts the
//! record, prunes old dates, and saves. Every failure before the transaction
//! leaves the persisted store untouched; failures inside it abort before the
//! atomic save.
//!
//! Progress and data-quality gaps are reported through an
//! [`IngestEventSink`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::audit::AuditError;
use crate::audit::DataQualityNote;
use crate::audit::ReportLocation;
use crate::audit::normalize_bytes;
use crate::date::ReportDate;
use crate::events::EventLevel;
use crate::events::EventScope;
use crate::events::IngestEventSink;
use crate::fsutil::ReadLimitError;
use crate::fsutil::read_bytes_with_limit;
use crate::rating::RecordRatings;
use crate::rating::rate_record;
use crate::record::MetricsRecord;
use crate::record::RESERVED_ENTRY_KEYS;
use crate::store::DEFAULT_LOCK_TIMEOUT;
use crate::store::DEFAULT_RETENTION_DAYS;
use crate::store::HistoryFile;
use crate::store::LoadStatus;
use crate::store::PruneReport;
use crate::store::StoreError;
use crate::store::UpsertOutcome;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum raw report size accepted.
pub const MAX_REPORT_BYTES: usize = 64 * 1024 * 1024;
/// Maximum target identifier length in bytes.
pub const MAX_TARGET_BYTES: usize = 2048;
/// Maximum device key length.
pub const MAX_DEVICE_BYTES: usize = 64;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fatal ingestion failures.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The raw report does not exist.
    #[error("report not found: {0}")]
    NotFound(String),
    /// The raw report or the store document could not be read.
    #[error("{0}")]
    Io(String),
    /// An input exceeded its size limit.
    #[error("{0}")]
    TooLarge(String),
    /// The raw report is structurally invalid.
    #[error("invalid report {path}: {source}")]
    InvalidFormat {
        /// Report path.
        path: String,
        /// Structural failure.
        source: AuditError,
    },
    /// Target, date, or device failed validation.
    #[error("invalid context: {0}")]
    InvalidContext(String),
    /// The store could not be persisted.
    #[error("store write failed: {0}")]
    WriteFailure(String),
    /// Another run held the store lock too long.
    #[error("{0}")]
    Lock(String),
}

impl IngestError {
    /// Returns the stable category label used in diagnostics.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Io(_) => "io",
            Self::TooLarge(_) => "too_large",
            Self::InvalidFormat {
                ..
            } => "invalid_format",
            Self::InvalidContext(_) => "invalid_context",
            Self::WriteFailure(_) => "write_failure",
            Self::Lock(_) => "lock_timeout",
        }
    }
}

impl From<StoreError> for IngestError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::TooLarge {
                ..
            } => Self::TooLarge(err.to_string()),
            StoreError::LockTimeout {
                ..
            } => Self::Lock(err.to_string()),
            StoreError::Invalid(message) => Self::InvalidContext(message),
            StoreError::Read(message) => Self::Io(format!("store read failed: {message}")),
            StoreError::Io(_) | StoreError::Serialize(_) => Self::WriteFailure(err.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Request and Outcome
// ============================================================================

/// Parameters of one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    /// Raw report path.
    pub report_path: PathBuf,
    /// Persisted store path.
    pub store_path: PathBuf,
    /// Target identifier.
    pub target: String,
    /// Report date (`YYYYMMDD` or `YYYY-MM-DD`).
    pub date: String,
    /// Device type key.
    pub device_type: String,
    /// Distinct dates to keep.
    pub retention_days: usize,
    /// Directory report paths are made relative to; defaults to the store's.
    pub report_base_dir: Option<PathBuf>,
    /// How long to wait for a competing run.
    pub lock_timeout: Duration,
    /// Accepted device keys; empty accepts any well-formed key.
    pub allowed_devices: Vec<String>,
}

impl IngestRequest {
    /// Builds a request with default retention, lock timeout, and base dir.
    #[must_use]
    pub fn new(
        report_path: impl Into<PathBuf>,
        store_path: impl Into<PathBuf>,
        target: impl Into<String>,
        date: impl Into<String>,
        device_type: impl Into<String>,
    ) -> Self {
        Self {
            report_path: report_path.into(),
            store_path: store_path.into(),
            target: target.into(),
            date: date.into(),
            device_type: device_type.into(),
            retention_days: DEFAULT_RETENTION_DAYS,
            report_base_dir: None,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            allowed_devices: Vec::new(),
        }
    }

    /// Returns the directory report paths are made relative to.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        self.report_base_dir
            .as_deref()
            .or_else(|| self.store_path.parent())
            .unwrap_or_else(|| Path::new(""))
    }

    /// Checks the target, date, and device against the boundary rules.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::InvalidContext`] describing the first failure.
    pub fn validate(&self) -> Result<ReportDate, IngestError> {
        validate_target(&self.target)?;
        validate_device(&self.device_type, &self.allowed_devices)?;
        ReportDate::parse(&self.date).map_err(|err| IngestError::InvalidContext(err.to_string()))
    }
}

/// Result of a successful ingestion.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// Record written under the device key.
    pub record: MetricsRecord,
    /// Non-fatal gaps in the source report.
    pub notes: Vec<DataQualityNote>,
    /// Ratings for the record.
    pub ratings: RecordRatings,
    /// Effect of the upsert.
    pub upsert: UpsertOutcome,
    /// How the starting store was loaded.
    pub load_status: LoadStatus,
    /// What pruning removed.
    pub prune: PruneReport,
    /// Entries in the saved store.
    pub entries: usize,
}

// ============================================================================
// SECTION: Driver
// ============================================================================

/// Runs one ingestion and reports progress to `sink`.
///
/// # Errors
///
/// Returns [`IngestError`] on any fatal condition; the store is unchanged.
pub fn ingest(
    request: &IngestRequest,
    sink: &dyn IngestEventSink,
) -> Result<IngestOutcome, IngestError> {
    let scope = EventScope::run(&request.target, &request.date, &request.device_type);
    sink.record(&scope.event(
        "ingest_started",
        EventLevel::Info,
        format!("report {}", request.report_path.display()),
    ));
    let result = run(request, &scope, sink);
    match &result {
        Ok(outcome) => {
            let detail = serde_json::to_string(&outcome.ratings).unwrap_or_default();
            sink.record(&scope.event("ingest_completed", EventLevel::Info, detail));
        }
        Err(err) => {
            sink.record(&scope.event(
                "ingest_failed",
                EventLevel::Error,
                format!("{}: {err}", err.category()),
            ));
        }
    }
    result
}

/// Performs the ingestion steps without start/finish events.
fn run(
    request: &IngestRequest,
    scope: &EventScope,
    sink: &dyn IngestEventSink,
) -> Result<IngestOutcome, IngestError> {
    request.validate()?;
    let bytes = read_report(&request.report_path)?;
    let location = ReportLocation {
        report_path: &request.report_path,
        base_dir: request.base_dir(),
    };
    let normalized =
        normalize_bytes(&bytes, location).map_err(|source| IngestError::InvalidFormat {
            path: request.report_path.display().to_string(),
            source,
        })?;
    for note in &normalized.notes {
        sink.record(&scope.event("data_quality", EventLevel::Warn, note.to_string()));
    }

    let file = HistoryFile::new(&request.store_path).with_lock_timeout(request.lock_timeout);
    let record = normalized.record.clone();
    let transaction = file.transaction(request.retention_days, |store| {
        store.upsert(&request.target, &request.date, &request.device_type, record)
    })?;
    report_load_status(&transaction.load_status, &request.store_path, scope, sink);
    if !transaction.prune.removed_dates.is_empty() {
        sink.record(&scope.event(
            "store_pruned",
            EventLevel::Info,
            format!(
                "removed {} entries for dates {}",
                transaction.prune.removed_entries,
                transaction.prune.removed_dates.join(", ")
            ),
        ));
    }
    sink.record(&scope.event(
        "store_saved",
        EventLevel::Info,
        format!("{} entries in {}", transaction.entries, request.store_path.display()),
    ));

    let ratings = rate_record(&normalized.record);
    Ok(IngestOutcome {
        record: normalized.record,
        notes: normalized.notes,
        ratings,
        upsert: transaction.value,
        load_status: transaction.load_status,
        prune: transaction.prune,
        entries: transaction.entries,
    })
}

/// Emits events describing how the store was loaded.
fn report_load_status(
    status: &LoadStatus,
    store_path: &Path,
    scope: &EventScope,
    sink: &dyn IngestEventSink,
) {
    match status {
        LoadStatus::Loaded => {}
        LoadStatus::Missing => {
            sink.record(&scope.event(
                "store_missing",
                EventLevel::Info,
                format!("starting new store at {}", store_path.display()),
            ));
        }
        LoadStatus::Reset {
            reason,
            quarantined,
            quarantine_error,
        } => {
            sink.record(&scope.event(
                "store_reset",
                EventLevel::Error,
                format!("store {} unreadable, reset to empty: {reason}", store_path.display()),
            ));
            let detail = match (quarantined, quarantine_error) {
                (Some(moved), _) => format!("previous document kept at {}", moved.display()),
                (None, Some(err)) => format!("quarantine failed: {err}"),
                (None, None) => "quarantine skipped".to_string(),
            };
            let level = if quarantined.is_some() { EventLevel::Warn } else { EventLevel::Error };
            sink.record(&scope.event("store_quarantined", level, detail));
        }
    }
}

/// Reads the raw report with a size limit.
fn read_report(path: &Path) -> Result<Vec<u8>, IngestError> {
    read_bytes_with_limit(path, MAX_REPORT_BYTES).map_err(|err| match err {
        err if err.is_not_found() => IngestError::NotFound(path.display().to_string()),
        ReadLimitError::TooLarge {
            size,
            limit,
        } => IngestError::TooLarge(format!(
            "report {} is {size} bytes (limit {limit})",
            path.display()
        )),
        ReadLimitError::Io(err) => {
            IngestError::Io(format!("report read failed: {}: {err}", path.display()))
        }
    })
}

// ============================================================================
// SECTION: Context Validation
// ============================================================================

/// Validates a target identifier.
///
/// # Errors
///
/// Returns [`IngestError::InvalidContext`] for empty, oversized, or
/// control-character targets.
pub fn validate_target(target: &str) -> Result<(), IngestError> {
    if target.is_empty() {
        return Err(IngestError::InvalidContext("target must not be empty".to_string()));
    }
    if target.len() > MAX_TARGET_BYTES {
        return Err(IngestError::InvalidContext(format!(
            "target exceeds {MAX_TARGET_BYTES} bytes"
        )));
    }
    if target.chars().any(char::is_control) {
        return Err(IngestError::InvalidContext(
            "target must not contain control characters".to_string(),
        ));
    }
    Ok(())
}

/// Validates a device key against the key rules and an optional allow-list.
///
/// # Errors
///
/// Returns [`IngestError::InvalidContext`] when the key is malformed,
/// reserved, or not allowed.
pub fn validate_device(device_type: &str, allowed: &[String]) -> Result<(), IngestError> {
    if device_type.is_empty() || device_type.len() > MAX_DEVICE_BYTES {
        return Err(IngestError::InvalidContext(format!(
            "device type must be 1..={MAX_DEVICE_BYTES} characters"
        )));
    }
    if !device_type.bytes().all(|byte| byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-')
    {
        return Err(IngestError::InvalidContext(format!(
            "device type `{device_type}` may only contain letters, digits, '_' and '-'"
        )));
    }
    if RESERVED_ENTRY_KEYS.contains(&device_type) {
        return Err(IngestError::InvalidContext(format!("device type `{device_type}` is reserved")));
    }
    if !allowed.is_empty() && !allowed.iter().any(|name| name == device_type) {
        return Err(IngestError::InvalidContext(format!(
            "device type `{device_type}` is not one of: {}",
            allowed.join(", ")
        )));
    }
    Ok(())
}

// crates/perf-ledger-core/src/events.rs
// ============================================================================
// Module: Ingestion Events
// Description: Structured JSON-line events for ingestion runs.
// Purpose: Emit run diagnostics without hard dependencies on a log pipeline.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every ingestion step reports what it did through an [`IngestEventSink`].
//! Sinks serialize [`IngestEvent`] payloads as JSON lines, so deployments can
//! route them to stderr, an append-only file, or nowhere. Timestamps live only
//! in events and never leak into persisted records.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Severity attached to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLevel {
    /// Normal progress.
    Info,
    /// Recoverable data or store problem.
    Warn,
    /// Run failure or destructive recovery.
    Error,
}

/// Ingestion event payload.
#[derive(Debug, Clone, Serialize)]
pub struct IngestEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Event severity.
    pub level: EventLevel,
    /// Target identifier when known.
    pub target: Option<String>,
    /// Report date when known.
    pub date: Option<String>,
    /// Device type when known.
    pub device: Option<String>,
    /// Human-readable detail.
    pub detail: String,
}

/// Run identity copied onto every event of one ingestion.
#[derive(Debug, Clone, Default)]
pub struct EventScope {
    /// Target identifier.
    pub target: Option<String>,
    /// Report date.
    pub date: Option<String>,
    /// Device type.
    pub device: Option<String>,
}

impl EventScope {
    /// Builds a scope for one (target, date, device) run.
    #[must_use]
    pub fn run(target: &str, date: &str, device: &str) -> Self {
        Self {
            target: Some(target.to_string()),
            date: Some(date.to_string()),
            device: Some(device.to_string()),
        }
    }

    /// Creates an event in this scope with a consistent timestamp.
    #[must_use]
    pub fn event(
        &self,
        event: &'static str,
        level: EventLevel,
        detail: impl Into<String>,
    ) -> IngestEvent {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        IngestEvent {
            event,
            timestamp_ms,
            level,
            target: self.target.clone(),
            date: self.date.clone(),
            device: self.device.clone(),
            detail: detail.into(),
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Sink for ingestion events.
pub trait IngestEventSink: Send + Sync {
    /// Record an event.
    fn record(&self, event: &IngestEvent);
}

/// Sink that logs JSON lines to stderr.
pub struct StderrEventSink;

impl IngestEventSink for StderrEventSink {
    fn record(&self, event: &IngestEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Sink that appends JSON lines to a file.
pub struct FileEventSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileEventSink {
    /// Opens the event log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl IngestEventSink for FileEventSink {
    fn record(&self, event: &IngestEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op sink.
pub struct NoopEventSink;

impl IngestEventSink for NoopEventSink {
    fn record(&self, _event: &IngestEvent) {}
}

/// Sink that keeps events in memory for inspection.
#[derive(Default)]
pub struct MemoryEventSink {
    /// Recorded events in arrival order.
    events: Mutex<Vec<IngestEvent>>,
}

impl MemoryEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every recorded event.
    #[must_use]
    pub fn events(&self) -> Vec<IngestEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns the identifiers of every recorded event.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(|event| event.event).collect()
    }
}

impl IngestEventSink for MemoryEventSink {
    fn record(&self, event: &IngestEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

// crates/perf-ledger-core/src/lib.rs
// ============================================================================
// Module: Perf Ledger Core Library
// Description: Audit normalization and bounded performance history storage.
// Purpose: Turn raw audit reports into compact records and keep their history.
// Dependencies: serde, serde_json, thiserror, time
// ============================================================================

//! ## Overview
//! `perf-ledger-core` ingests raw website-performance audit documents and
//! maintains a compact, time-indexed history of normalized metrics per
//! (target, date, device). Data flows one way: raw document, normalized
//! [`MetricsRecord`], merged into the [`HistoryStore`], pruned, written back.
//!
//! The leaf modules are pure: [`classifier`] buckets network requests and
//! [`audit`] normalizes documents. [`store`] owns the persisted document and
//! [`ingest`] drives one locked read-modify-write run.
//!
//! Security posture: report and store inputs are untrusted and read with hard
//! size limits; malformed store documents are quarantined, never overwritten
//! in place.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod classifier;
pub mod date;
pub mod events;
pub mod fsutil;
pub mod ingest;
pub mod lock;
pub mod numeric;
pub mod rating;
pub mod record;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditError;
pub use audit::DataQualityNote;
pub use audit::NormalizedAudit;
pub use audit::RawAuditDocument;
pub use audit::ReportLocation;
pub use audit::normalize;
pub use audit::normalize_bytes;
pub use classifier::RequestDescriptor;
pub use classifier::ResourceCategory;
pub use classifier::classify_requests;
pub use date::ReportDate;
pub use events::EventLevel;
pub use events::FileEventSink;
pub use events::IngestEvent;
pub use events::IngestEventSink;
pub use events::MemoryEventSink;
pub use events::NoopEventSink;
pub use events::StderrEventSink;
pub use ingest::IngestError;
pub use ingest::IngestOutcome;
pub use ingest::IngestRequest;
pub use ingest::ingest;
pub use rating::MetricRating;
pub use rating::RecordRatings;
pub use rating::rate_record;
pub use record::HistoryDocument;
pub use record::HistoryEntry;
pub use record::Metrics;
pub use record::MetricsRecord;
pub use record::ReportFiles;
pub use record::ResourceSizes;
pub use store::DEFAULT_RETENTION_DAYS;
pub use store::HistoryFile;
pub use store::HistoryStore;
pub use store::LoadStatus;
pub use store::StoreError;
pub use store::UpsertOutcome;

// crates/perf-ledger-core/src/audit.rs
// ============================================================================
// Module: Audit Normalizer
// Description: Validates raw audit documents and reduces them to records.
// Purpose: Turn one heterogeneous audit document into a compact MetricsRecord.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Normalization runs in two explicit steps. [`RawAuditDocument::validate`]
//! checks the structural contract (both `categories` and `audits` present and
//! well-typed) and fails with [`AuditError`] otherwise. [`normalize`] then
//! extracts scores, metrics, and resource sizes from the validated document.
//! Individually missing values are not errors: they default to zero and are
//! reported as [`DataQualityNote`]s.
//!
//! ## Invariants
//! - The same document and context always produce an identical record.
//! - A structurally invalid document never yields a record.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::path::Component;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::classifier::RequestDescriptor;
use crate::classifier::classify_requests;
use crate::numeric::round_to_places;
use crate::numeric::round_to_u64;
use crate::record::Metrics;
use crate::record::MetricsRecord;
use crate::record::ReportFiles;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Audit holding the network request list.
pub const NETWORK_REQUESTS_AUDIT: &str = "network-requests";
/// Extension of the raw JSON report artifact.
const JSON_REPORT_EXTENSION: &str = ".json";
/// Extension of the paired HTML report artifact.
const HTML_REPORT_EXTENSION: &str = ".html";
/// Decimal places kept for category scores.
const SCORE_DECIMALS: i32 = 2;
/// Decimal places kept for cumulative layout shift.
const CLS_DECIMALS: i32 = 3;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Structural failures that reject an audit document.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The document is not valid JSON or has mistyped top-level sections.
    #[error("audit document is not valid: {0}")]
    Parse(String),
    /// A required top-level section is absent.
    #[error("audit document is missing the `{0}` section")]
    MissingSection(&'static str),
    /// A category entry is not an object.
    #[error("category `{0}` must be an object")]
    InvalidCategory(String),
    /// A category score is not a number in `[0, 1]`.
    #[error("category `{category}` has an invalid score: {detail}")]
    InvalidScore {
        /// Category name.
        category: String,
        /// What was wrong with the score.
        detail: String,
    },
}

// ============================================================================
// SECTION: Metric Audits
// ============================================================================

/// Named metrics extracted from the `audits` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricAudit {
    /// `first-contentful-paint`.
    FirstContentfulPaint,
    /// `largest-contentful-paint`.
    LargestContentfulPaint,
    /// `total-blocking-time`.
    TotalBlockingTime,
    /// `cumulative-layout-shift`.
    CumulativeLayoutShift,
    /// `interactive`.
    Interactive,
    /// `speed-index`.
    SpeedIndex,
    /// `server-response-time`.
    ServerResponseTime,
    /// `total-byte-weight`.
    TotalByteWeight,
}

impl MetricAudit {
    /// Every tracked metric audit.
    pub const ALL: [Self; 8] = [
        Self::FirstContentfulPaint,
        Self::LargestContentfulPaint,
        Self::TotalBlockingTime,
        Self::CumulativeLayoutShift,
        Self::Interactive,
        Self::SpeedIndex,
        Self::ServerResponseTime,
        Self::TotalByteWeight,
    ];

    /// Returns the audit identifier in the raw document.
    #[must_use]
    pub const fn audit_id(self) -> &'static str {
        match self {
            Self::FirstContentfulPaint => "first-contentful-paint",
            Self::LargestContentfulPaint => "largest-contentful-paint",
            Self::TotalBlockingTime => "total-blocking-time",
            Self::CumulativeLayoutShift => "cumulative-layout-shift",
            Self::Interactive => "interactive",
            Self::SpeedIndex => "speed-index",
            Self::ServerResponseTime => "server-response-time",
            Self::TotalByteWeight => "total-byte-weight",
        }
    }

    /// Stores `value` into the matching metrics field with its rounding rule.
    fn apply(self, metrics: &mut Metrics, value: f64) {
        match self {
            Self::FirstContentfulPaint => metrics.fcp = round_to_u64(value),
            Self::LargestContentfulPaint => metrics.lcp = round_to_u64(value),
            Self::TotalBlockingTime => metrics.tbt = round_to_u64(value),
            Self::CumulativeLayoutShift => {
                metrics.cls = round_to_places(value.max(0.0), CLS_DECIMALS);
            }
            Self::Interactive => metrics.tti = round_to_u64(value),
            Self::SpeedIndex => metrics.si = round_to_u64(value),
            Self::ServerResponseTime => metrics.server_response_time = round_to_u64(value),
            Self::TotalByteWeight => metrics.total_byte_weight = round_to_u64(value),
        }
    }
}

// ============================================================================
// SECTION: Data Quality
// ============================================================================

/// Non-fatal gaps found while normalizing a valid document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityNote {
    /// A tracked metric audit or its `numericValue` is absent; recorded as zero.
    MissingMetric {
        /// Audit identifier.
        audit_id: &'static str,
    },
    /// A category has no numeric score; recorded as zero.
    MissingCategoryScore {
        /// Category name.
        category: String,
    },
    /// The network request list is absent; resource sizes are all zero.
    MissingNetworkRequests,
    /// A request item is not an object or has no string `url`.
    SkippedRequest {
        /// Position in the request list.
        index: usize,
    },
}

impl fmt::Display for DataQualityNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingMetric {
                audit_id,
            } => write!(f, "metric audit `{audit_id}` missing; defaulted to 0"),
            Self::MissingCategoryScore {
                category,
            } => write!(f, "category `{category}` has no score; defaulted to 0"),
            Self::MissingNetworkRequests => {
                f.write_str("network request list missing; resource sizes defaulted to 0")
            }
            Self::SkippedRequest {
                index,
            } => write!(f, "network request #{index} is malformed; skipped"),
        }
    }
}

// ============================================================================
// SECTION: Raw Document
// ============================================================================

/// Raw audit document as produced by the auditing tool.
///
/// Only the two top-level sections are modeled; everything else is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAuditDocument {
    /// Scoring categories keyed by name.
    #[serde(default)]
    pub categories: Option<Map<String, Value>>,
    /// Individual audits keyed by identifier.
    #[serde(default)]
    pub audits: Option<Map<String, Value>>,
}

impl RawAuditDocument {
    /// Parses a raw audit document from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Parse`] when the bytes are not a JSON object with
    /// object-typed sections.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AuditError> {
        serde_json::from_slice(bytes).map_err(|err| AuditError::Parse(err.to_string()))
    }

    /// Checks that both required sections are present.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::MissingSection`] naming the absent section.
    pub fn validate(self) -> Result<ValidatedAudit, AuditError> {
        let Some(categories) = self.categories else {
            return Err(AuditError::MissingSection("categories"));
        };
        let Some(audits) = self.audits else {
            return Err(AuditError::MissingSection("audits"));
        };
        Ok(ValidatedAudit {
            categories,
            audits,
        })
    }
}

/// Audit document that passed structural validation.
#[derive(Debug, Clone)]
pub struct ValidatedAudit {
    /// Scoring categories keyed by name.
    categories: Map<String, Value>,
    /// Individual audits keyed by identifier.
    audits: Map<String, Value>,
}

// ============================================================================
// SECTION: Normalization
// ============================================================================

/// Location of the raw report, used to build [`ReportFiles`].
#[derive(Debug, Clone, Copy)]
pub struct ReportLocation<'a> {
    /// Path of the raw JSON report.
    pub report_path: &'a Path,
    /// Directory report paths are made relative to.
    pub base_dir: &'a Path,
}

/// Record plus the data-quality notes gathered while building it.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedAudit {
    /// Normalized snapshot.
    pub record: MetricsRecord,
    /// Non-fatal gaps in the source document.
    pub notes: Vec<DataQualityNote>,
}

/// Parses, validates, and normalizes raw report bytes.
///
/// # Errors
///
/// Returns [`AuditError`] when the document is structurally invalid.
pub fn normalize_bytes(
    bytes: &[u8],
    location: ReportLocation<'_>,
) -> Result<NormalizedAudit, AuditError> {
    let validated = RawAuditDocument::from_slice(bytes)?.validate()?;
    normalize(&validated, location)
}

/// Normalizes a validated audit document into a [`MetricsRecord`].
///
/// # Errors
///
/// Returns [`AuditError`] when a category or score is mistyped.
pub fn normalize(
    audit: &ValidatedAudit,
    location: ReportLocation<'_>,
) -> Result<NormalizedAudit, AuditError> {
    let mut notes = Vec::new();
    let scores = extract_scores(&audit.categories, &mut notes)?;
    let metrics = extract_metrics(&audit.audits, &mut notes);
    let requests = extract_requests(&audit.audits, &mut notes);
    let record = MetricsRecord {
        scores,
        metrics,
        resource_sizes: classify_requests(&requests),
        report_files: report_files(location),
    };
    Ok(NormalizedAudit {
        record,
        notes,
    })
}

/// Extracts category scores rounded to two decimals.
fn extract_scores(
    categories: &Map<String, Value>,
    notes: &mut Vec<DataQualityNote>,
) -> Result<BTreeMap<String, f64>, AuditError> {
    let mut scores = BTreeMap::new();
    for (name, category) in categories {
        let Value::Object(fields) = category else {
            return Err(AuditError::InvalidCategory(name.clone()));
        };
        let score = match fields.get("score") {
            None | Some(Value::Null) => {
                notes.push(DataQualityNote::MissingCategoryScore {
                    category: name.clone(),
                });
                0.0
            }
            Some(Value::Number(number)) => {
                let value = number.as_f64().unwrap_or(f64::NAN);
                if !(0.0 ..= 1.0).contains(&value) {
                    return Err(AuditError::InvalidScore {
                        category: name.clone(),
                        detail: format!("{number} is outside [0, 1]"),
                    });
                }
                round_to_places(value, SCORE_DECIMALS)
            }
            Some(other) => {
                return Err(AuditError::InvalidScore {
                    category: name.clone(),
                    detail: format!("expected a number, found {}", value_kind(other)),
                });
            }
        };
        scores.insert(name.clone(), score);
    }
    Ok(scores)
}

/// Extracts the tracked metrics, defaulting missing ones to zero.
fn extract_metrics(audits: &Map<String, Value>, notes: &mut Vec<DataQualityNote>) -> Metrics {
    let mut metrics = Metrics::default();
    for metric in MetricAudit::ALL {
        let value = audits
            .get(metric.audit_id())
            .and_then(|audit| audit.get("numericValue"))
            .and_then(Value::as_f64);
        match value {
            Some(value) => metric.apply(&mut metrics, value),
            None => notes.push(DataQualityNote::MissingMetric {
                audit_id: metric.audit_id(),
            }),
        }
    }
    metrics
}

/// Extracts network request descriptors from the request audit.
fn extract_requests(
    audits: &Map<String, Value>,
    notes: &mut Vec<DataQualityNote>,
) -> Vec<RequestDescriptor> {
    let items = audits
        .get(NETWORK_REQUESTS_AUDIT)
        .and_then(|audit| audit.get("details"))
        .and_then(|details| details.get("items"))
        .and_then(Value::as_array);
    let Some(items) = items else {
        notes.push(DataQualityNote::MissingNetworkRequests);
        return Vec::new();
    };
    let mut requests = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let Some(url) = item.get("url").and_then(Value::as_str) else {
            notes.push(DataQualityNote::SkippedRequest {
                index,
            });
            continue;
        };
        requests.push(RequestDescriptor {
            url: url.to_string(),
            transfer_size: item.get("transferSize").and_then(Value::as_f64),
            resource_size: item.get("resourceSize").and_then(Value::as_f64),
            mime_type: item.get("mimeType").and_then(Value::as_str).map(str::to_string),
        });
    }
    requests
}

/// Builds the paired report references for a raw report path.
///
/// The JSON path is made relative to the base directory when it lives under
/// it; the HTML path swaps the trailing `.json` for `.html`.
#[must_use]
pub fn report_files(location: ReportLocation<'_>) -> ReportFiles {
    let relative =
        location.report_path.strip_prefix(location.base_dir).unwrap_or(location.report_path);
    let json = slash_path(relative);
    let html = swap_report_extension(&json);
    let full_json = std::path::absolute(location.report_path)
        .unwrap_or_else(|_| location.report_path.to_path_buf());
    let full_json_path = slash_path(&full_json);
    let full_html_path = swap_report_extension(&full_json_path);
    ReportFiles {
        html,
        json,
        full_html_path,
        full_json_path,
    }
}

/// Replaces a trailing `.json` with `.html`, or appends `.html`.
#[must_use]
pub fn swap_report_extension(path: &str) -> String {
    let stem = path.strip_suffix(JSON_REPORT_EXTENSION).unwrap_or(path);
    format!("{stem}{HTML_REPORT_EXTENSION}")
}

/// Renders a path with `/` separators, dropping `.` components.
fn slash_path(path: &Path) -> String {
    let mut rendered = String::new();
    for component in path.components() {
        let part = match component {
            Component::RootDir => {
                rendered.push('/');
                continue;
            }
            Component::CurDir => continue,
            Component::Prefix(prefix) => prefix.as_os_str().to_string_lossy(),
            Component::ParentDir => "..".into(),
            Component::Normal(name) => name.to_string_lossy(),
        };
        if !rendered.is_empty() && !rendered.ends_with('/') {
            rendered.push('/');
        }
        rendered.push_str(&part);
    }
    rendered
}

/// Names the JSON type of a value for error messages.
const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

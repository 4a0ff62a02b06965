// crates/perf-ledger-cli/src/i18n.rs
// ============================================================================
// Module: CLI Message Catalog
// Description: Message catalog and placeholder substitution for the CLI.
// Purpose: Centralize user-facing strings so output stays consistent.
// Dependencies: Standard library collections.
// ============================================================================

//! ## Overview
//! Every user-facing CLI string lives in one static catalog and is rendered
//! through the [`t!`](crate::t) macro. Diagnostics therefore share a single
//! wording per failure, which downstream pipelines can match on.
//!
//! ## Invariants
//! - The catalog is initialized once and read-only thereafter.
//! - Missing keys fall back to the key itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// A formatted message argument captured by the [`macro@crate::t`] macro.
#[derive(Clone)]
pub struct MessageArg {
    /// The placeholder name used in message templates (e.g., `"path"`).
    pub key: &'static str,
    /// The formatted value substituted for this placeholder.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`] from a key and value.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Static catalog entries.
const CATALOG_ITEMS: &[(&str, &str)] = &[
    ("main.version", "perf-ledger {version}"),
    ("main.error", "error[{category}]: {message}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    (
        "usage.positional_count",
        "Expected REPORT STORE TARGET DATE DEVICE, got {count} argument(s). Use --from-env \
         REPORT to read the context from the environment.",
    ),
    ("usage.from_env_count", "--from-env takes exactly one REPORT argument, got {count}."),
    ("usage.retention_zero", "--retention-days must be greater than zero."),
    ("config.load_failed", "Failed to load config: {error}"),
    ("env.resolve_failed", "Failed to resolve environment context: {error}"),
    ("logging.open_failed", "Failed to open event log {path}: {error}"),
    ("ingest.failed", "Ingestion failed: {error}"),
    ("ingest.serialize_failed", "Failed to serialize the normalized record: {error}"),
];

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Renders `key` from the catalog while substituting `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    let template = catalog().get(key).copied().unwrap_or(key);
    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

/// Returns the static catalog.
fn catalog() -> &'static HashMap<&'static str, &'static str> {
    static CATALOG: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();

    CATALOG.get_or_init(|| CATALOG_ITEMS.iter().copied().collect())
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a catalog message from a key and named arguments.
///
/// # Arguments
///
/// - `$key` must match a catalog entry.
/// - Named arguments are substituted into `{placeholder}` positions.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::i18n::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::i18n::translate($key, args)
    }};
}

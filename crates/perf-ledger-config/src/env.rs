// crates/perf-ledger-config/src/env.rs
// ============================================================================
// Module: Environment Context
// Description: Run context for the environment-driven ingestion mode.
// Purpose: Resolve target, device, and date from pipeline variables.
// Dependencies: perf-ledger-core
// ============================================================================

//! ## Overview
//! Deployment pipelines invoke ingestion with only a report path and pass the
//! rest through environment variables. [`EnvContext::resolve`] reads them via
//! an injected lookup so callers and tests never mutate the process
//! environment. `TARGET` falls back to the configured default, `DATE` to the
//! current UTC day, and `DEVICE_TYPE` is required.

// ============================================================================
// SECTION: Imports
// ============================================================================

use perf_ledger_core::ReportDate;

use crate::config::ConfigError;
use crate::config::PerfLedgerConfig;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Variable naming the target.
pub const TARGET_ENV_VAR: &str = "TARGET";
/// Variable naming the device type.
pub const DEVICE_TYPE_ENV_VAR: &str = "DEVICE_TYPE";
/// Variable naming the report date.
pub const DATE_ENV_VAR: &str = "DATE";

// ============================================================================
// SECTION: Context
// ============================================================================

/// Target, device, and date resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvContext {
    /// Target identifier.
    pub target: String,
    /// Device type key.
    pub device_type: String,
    /// Report date as supplied, or today's UTC date in `YYYYMMDD` form.
    pub date: String,
}

impl EnvContext {
    /// Resolves the context using `lookup` for variable access.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnv`] when `DEVICE_TYPE` is unset.
    pub fn resolve<F>(config: &PerfLedgerConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let device_type =
            read(DEVICE_TYPE_ENV_VAR).ok_or(ConfigError::MissingEnv(DEVICE_TYPE_ENV_VAR))?;
        let target = read(TARGET_ENV_VAR).unwrap_or_else(|| config.defaults.target.clone());
        let date = read(DATE_ENV_VAR).unwrap_or_else(|| ReportDate::today_utc().compact());
        Ok(Self {
            target,
            device_type,
            date,
        })
    }
}

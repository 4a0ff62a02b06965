// crates/perf-ledger-config/src/lib.rs
// ============================================================================
// Module: Perf Ledger Config Library
// Description: Canonical config model, validation, and environment context.
// Purpose: Single source of truth for perf-ledger.toml semantics.
// Dependencies: perf-ledger-core, serde, toml
// ============================================================================

//! ## Overview
//! `perf-ledger-config` defines the configuration model for perf-ledger:
//! store location and retention, report reference base directory, defaults
//! for the environment-driven mode, and event sink selection. Validation is
//! strict and fail-closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod env;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use env::EnvContext;

// crates/perf-ledger-cli/src/lib.rs
// ============================================================================
// Module: Perf Ledger CLI Library
// Description: Shared helpers for the perf-ledger command-line interface.
// Purpose: Provide the message catalog to the CLI binary and its tests.
// Dependencies: Standard library.
// ============================================================================

//! ## Overview
//! This library houses the CLI message catalog. The binary entry point
//! (`src/main.rs`) routes all user-facing output through it.

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Message catalog and the `t!` macro.
pub mod i18n;

// crates/perf-ledger-core/src/numeric.rs
// ============================================================================
// Module: Numeric Rounding
// Description: Rounding helpers shared by the normalizer and classifier.
// Purpose: Keep float-to-integer conversion in one audited place.
// Dependencies: Standard library.
// ============================================================================

//! ## Overview
//! Raw audit values arrive as JSON floats. Scores keep two decimals, layout
//! shift keeps three, and everything else becomes a whole number. Non-finite
//! or negative inputs clamp to zero.

/// Largest float that still converts to `u64` without saturating.
const U64_CEILING: f64 = 18_446_744_073_709_549_568.0;

/// Rounds to the nearest whole number, clamping into `0 ..= u64::MAX`.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "Value is rounded, finite, and clamped into the u64 range first."
)]
pub fn round_to_u64(value: f64) -> u64 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    value.round().min(U64_CEILING) as u64
}

/// Rounds to `decimals` fractional digits; non-finite input becomes zero.
#[must_use]
pub fn round_to_places(value: f64, decimals: i32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

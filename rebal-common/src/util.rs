//! Unit conversion helpers shared by the planner and its reports.
//!
//! Monetary amounts travel through configuration as decimal currency units
//! and through the solver as integer minor units. Rates (commissions and
//! return multipliers) are held as integer parts-per-million.

/// Fixed-point scale for rates: 1.0 == `RATE_SCALE`.
pub const RATE_SCALE: i64 = 1_000_000;

/// Convert a decimal amount to integer minor units, rounding to nearest.
pub fn to_minor_units(amount: f64, minor_per_unit: i64) -> i64 {
    (amount * minor_per_unit as f64).round() as i64
}

/// Convert integer minor units back to decimal units.
pub fn from_minor_units(minor: i64, minor_per_unit: i64) -> f64 {
    minor as f64 / minor_per_unit as f64
}

/// Convert a fractional rate (e.g. `0.07` or `1.15`) to parts-per-million.
pub fn to_ppm(rate: f64) -> i64 {
    (rate * RATE_SCALE as f64).round() as i64
}

/// Multiply `amount` by a ppm rate, rounding half up.
///
/// Only defined for non-negative inputs, which is all the solver produces.
/// The product is formed in `i128`; the quotient fits `i64` for any amount
/// and rate the validated configuration admits.
pub fn mul_ppm_round(amount: i64, rate_ppm: i64) -> i64 {
    let scale = i128::from(RATE_SCALE);
    ((i128::from(amount) * i128::from(rate_ppm) + scale / 2) / scale) as i64
}

/// Multiply `amount` by a ppm rate, truncating.
pub fn mul_ppm_floor(amount: i64, rate_ppm: i64) -> i64 {
    (i128::from(amount) * i128::from(rate_ppm) / i128::from(RATE_SCALE)) as i64
}

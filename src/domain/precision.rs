//! Numeric precision rules shared by every accounting computation.
//!
//! Arithmetic runs at full `f64` precision; rounding happens only when a value
//! is displayed or compared against a fixed number of decimals.

/// Holdings below this many units are treated as fully liquidated.
pub const UNIT_EPSILON: f64 = 0.01;

/// Divisors smaller than this in magnitude yield zero instead of a ratio.
const DIVISION_EPSILON: f64 = 1e-10;

/// Decimal places per kind of quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    /// Cash, trade amounts, profits.
    Money,
    /// Net values and cost prices.
    NetValue,
    /// Fund units.
    Units,
    /// Profit rates and daily changes.
    Percentage,
}

impl Precision {
    pub fn decimals(self) -> i32 {
        match self {
            Precision::Money => 2,
            Precision::NetValue => 4,
            Precision::Units => 2,
            Precision::Percentage => 2,
        }
    }
}

pub fn is_effectively_zero(units: f64) -> bool {
    units < UNIT_EPSILON
}

/// Snap a unit balance that is effectively zero to exactly zero.
pub fn clamp_units(units: f64) -> f64 {
    if is_effectively_zero(units) { 0.0 } else { units }
}

/// Round half away from zero; non-finite input rounds to zero.
pub fn round_to(value: f64, precision: Precision) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let factor = 10f64.powi(precision.decimals());
    (value * factor).round() / factor
}

/// `numerator / denominator`, or zero when the denominator is (nearly) zero.
pub fn safe_divide(numerator: f64, denominator: f64) -> f64 {
    if denominator.abs() < DIVISION_EPSILON {
        0.0
    } else {
        numerator / denominator
    }
}

pub fn format_money(amount: f64) -> String {
    format!("{:.2}", round_to(amount, Precision::Money))
}

pub fn format_net_value(value: f64) -> String {
    format!("{:.4}", round_to(value, Precision::NetValue))
}

pub fn format_percentage(rate: f64) -> String {
    format!("{:.2}%", round_to(rate, Precision::Percentage))
}

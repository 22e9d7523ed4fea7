/// Planting Engine — Arithmetic Primitives
///
/// Hours: i64 fixed-point micro-hours (HOUR_SCALE = 1_000_000).
/// Money: i64 fixed-point (MONEY_SCALE = 10_000).
/// No float past the loading boundary.

use crate::error::PlanError;

/// Fixed-point scale for hours. `1.5 h` is stored as `1_500_000`.
pub const HOUR_SCALE: i64 = 1_000_000;

/// Fixed-point scale for money. `0.5625` is stored as `5_625`.
pub const MONEY_SCALE: i64 = 10_000;

/// Checked integer addition.
pub fn checked_add(a: i64, b: i64) -> Result<i64, PlanError> {
    a.checked_add(b)
        .ok_or_else(|| PlanError::Overflow(format!("{} + {} overflows i64", a, b)))
}

/// Checked integer multiplication.
pub fn checked_mul(a: i64, b: i64) -> Result<i64, PlanError> {
    a.checked_mul(b)
        .ok_or_else(|| PlanError::Overflow(format!("{} * {} overflows i64", a, b)))
}

/// Multiply a unit price (or unit time) by a quantity.
pub fn scaled_by_quantity(unit: i64, quantity: u64) -> Result<i64, PlanError> {
    let q = i64::try_from(quantity)
        .map_err(|_| PlanError::Overflow(format!("quantity {} exceeds i64", quantity)))?;
    checked_mul(unit, q)
}

/// Convert a real value to fixed point, rounding half away from zero.
///
/// Only called by loaders, once per input value.
pub fn to_fixed(value: f64, scale: i64) -> Result<i64, PlanError> {
    if !value.is_finite() {
        return Err(PlanError::Configuration(format!(
            "non-finite numeric value {}",
            value
        )));
    }
    let scaled = (value * scale as f64).round();
    if scaled.abs() >= i64::MAX as f64 {
        return Err(PlanError::Overflow(format!(
            "{} does not fit fixed-point scale {}",
            value, scale
        )));
    }
    Ok(scaled as i64)
}

/// Render a fixed-point value with the given scale, e.g. `12_500` at 10_000 -> `"1.2500"`.
pub fn format_fixed(value: i64, scale: i64) -> String {
    let digits = scale.to_string().len() - 1;
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    let scale = scale as u64;
    format!(
        "{}{}.{:0width$}",
        sign,
        abs / scale,
        abs % scale,
        width = digits
    )
}

/// Validate that a provider ID matches `[a-zA-Z0-9_-]+`.
pub fn validate_identifier(id: &str) -> Result<(), PlanError> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
    if valid {
        Ok(())
    } else {
        Err(PlanError::Configuration(format!(
            "invalid identifier {:?}: must match [a-zA-Z0-9_-]+",
            id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_add_ok() {
        assert_eq!(checked_add(3, 4).unwrap(), 7);
        assert_eq!(checked_add(-10, 5).unwrap(), -5);
    }

    #[test]
    fn test_checked_add_overflow() {
        assert!(matches!(checked_add(i64::MAX, 1), Err(PlanError::Overflow(_))));
    }

    #[test]
    fn test_checked_mul_overflow() {
        assert!(matches!(checked_mul(i64::MAX, 2), Err(PlanError::Overflow(_))));
    }

    #[test]
    fn test_to_fixed_rounds_half_away_from_zero() {
        assert_eq!(to_fixed(0.5625, MONEY_SCALE).unwrap(), 5_625);
        assert_eq!(to_fixed(26.5, MONEY_SCALE).unwrap(), 265_000);
        assert_eq!(to_fixed(0.5 / 524.0, HOUR_SCALE).unwrap(), 954);
        assert!(to_fixed(f64::NAN, HOUR_SCALE).is_err());
    }

    #[test]
    fn test_format_fixed() {
        assert_eq!(format_fixed(12_500, MONEY_SCALE), "1.2500");
        assert_eq!(format_fixed(-5_625, MONEY_SCALE), "-0.5625");
        assert_eq!(format_fixed(6 * HOUR_SCALE, HOUR_SCALE), "6.000000");
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("laguna_seca").is_ok());
        assert!(validate_identifier("A-B_c-3").is_ok());
        assert!(validate_identifier("with spaces").is_err());
        assert!(validate_identifier("").is_err());
    }
}

//! Number formatting for invoice cells.

use rust_decimal::{Decimal, RoundingStrategy};

/// `3500` → `"3,500 د.ع"`: zero decimals (banker's rounding), comma
/// thousands separators, then a space and the currency suffix.
pub fn format_currency(value: Decimal, suffix: &str) -> String {
    let grouped = group_thousands(value);
    if suffix.is_empty() {
        grouped
    } else {
        format!("{grouped} {suffix}")
    }
}

/// Round to an integer and insert thousands separators.
pub fn group_thousands(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
    let digits = rounded.abs().trunc().to_string();
    let negative = rounded.is_sign_negative() && !rounded.is_zero();

    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if negative {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Meters → kilometres with one decimal place, e.g. `"12.3 كم"`.
pub fn format_distance(meters: f64, unit: &str) -> String {
    format!("{:.1} {unit}", meters / 1000.0)
}

/// Tax rate as a percentage without trailing zeros: `0.05` → `"5"`.
pub fn format_percent(rate: Decimal) -> String {
    (rate * Decimal::ONE_HUNDRED).normalize().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grouping() {
        assert_eq!(group_thousands(Decimal::from(0)), "0");
        assert_eq!(group_thousands(Decimal::from(999)), "999");
        assert_eq!(group_thousands(Decimal::from(3500)), "3,500");
        assert_eq!(group_thousands(Decimal::from(1_234_567)), "1,234,567");
        assert_eq!(group_thousands(Decimal::from(-12_000)), "-12,000");
    }

    #[test]
    fn test_rounding_is_half_even() {
        assert_eq!(group_thousands(Decimal::new(25, 1)), "2");
        assert_eq!(group_thousands(Decimal::new(35, 1)), "4");
        assert_eq!(group_thousands(Decimal::new(174_99, 2)), "175");
        assert_eq!(group_thousands(Decimal::new(-4, 1)), "0");
    }

    #[test]
    fn test_currency_suffix() {
        assert_eq!(format_currency(Decimal::from(3500), "د.ع"), "3,500 د.ع");
        assert_eq!(format_currency(Decimal::from(10), ""), "10");
    }

    #[test]
    fn test_distance() {
        assert_eq!(format_distance(12_345.0, "كم"), "12.3 كم");
        assert_eq!(format_distance(0.0, "km"), "0.0 km");
    }

    #[test]
    fn test_percent() {
        assert_eq!(format_percent(Decimal::new(5, 2)), "5");
        assert_eq!(format_percent(Decimal::new(125, 3)), "12.5");
    }
}

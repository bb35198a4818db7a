//! Decimal helpers for fee amounts.
//!
//! Amounts reach us as JSON numbers, numeric strings, or garbage. Parsing is
//! lenient: anything that does not read as a finite decimal is `None`, and the
//! caller decides whether that means zero.

use rust_decimal::prelude::*;

/// Display precision for every money figure.
pub const DECIMAL_PLACES: u32 = 2;

/// Parse a raw amount such as `"5000"`, `"1,250.50"`, `" ₹300 "` or `"(20)"`.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let s: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '"' | '$' | '₹' | ' '))
        .collect();
    if s.is_empty() {
        return None;
    }
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return parse_plain(inner).map(|d| -d);
    }
    parse_plain(&s)
}

fn parse_plain(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .ok()
        .or_else(|| Decimal::from_scientific(s).ok())
}

/// Parse, degrading anything unreadable to zero.
pub fn parse_or_zero(raw: Option<&str>) -> Decimal {
    raw.and_then(parse_decimal).unwrap_or(Decimal::ZERO)
}

/// Round half away from zero to two places.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// `max(value, 0)`, normalising negative zero.
pub fn clamp_non_negative(value: Decimal) -> Decimal {
    if value.is_sign_negative() || value.is_zero() {
        Decimal::ZERO
    } else {
        value
    }
}

/// Sum that stops at `Decimal::MAX` (or `MIN`) instead of overflowing.
pub fn saturating_sum<I: IntoIterator<Item = Decimal>>(values: I) -> Decimal {
    values
        .into_iter()
        .fold(Decimal::ZERO, |acc, v| acc.saturating_add(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_and_formatted() {
        assert_eq!(parse_decimal("5000"), Some(Decimal::from(5000)));
        assert_eq!(parse_decimal(" 1,250.50 "), Some(Decimal::new(125050, 2)));
        assert_eq!(parse_decimal("₹300"), Some(Decimal::from(300)));
        assert_eq!(parse_decimal("(20.00)"), Some(Decimal::new(-2000, 2)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("abc"), None);
        assert_eq!(parse_decimal("NaN"), None);
        assert_eq!(parse_or_zero(None), Decimal::ZERO);
        assert_eq!(parse_or_zero(Some("twelve")), Decimal::ZERO);
    }

    #[test]
    fn test_round2_half_away_from_zero() {
        assert_eq!(round2(Decimal::new(10005, 3)), Decimal::new(1001, 2));
        assert_eq!(round2(Decimal::new(-10005, 3)), Decimal::new(-1001, 2));
    }

    #[test]
    fn test_clamp_never_negative() {
        assert_eq!(clamp_non_negative(Decimal::from(-1000)), Decimal::ZERO);
        assert!(!clamp_non_negative(-Decimal::ZERO).is_sign_negative());
        assert_eq!(clamp_non_negative(Decimal::from(3000)), Decimal::from(3000));
    }

    #[test]
    fn test_saturating_sum_caps_at_max() {
        assert_eq!(saturating_sum([Decimal::MAX, Decimal::MAX]), Decimal::MAX);
        assert_eq!(saturating_sum(vec![Decimal::from(2), Decimal::new(5, 1)]), Decimal::new(25, 1));
        assert_eq!(saturating_sum(Vec::new()), Decimal::ZERO);
    }
}

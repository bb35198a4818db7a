use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::money::round2;

/// Format a decimal as a money amount with thousands separators: ₹1,234.56
pub fn money(val: Decimal, symbol: &str) -> String {
    let val = round2(val);
    let negative = val.is_sign_negative() && !val.is_zero();
    let cents = format!("{:.2}", val.abs());
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((&cents, "00"));

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if negative {
        format!("-{symbol}{with_commas}.{dec_part}")
    } else {
        format!("{symbol}{with_commas}.{dec_part}")
    }
}

/// Plain two-place rendering for CSV and machine output: 1234.50
pub fn plain(val: Decimal) -> String {
    format!("{:.2}", round2(val))
}

/// "2024-01" -> "Jan 2024". Unparseable keys come back unchanged.
pub fn month_label(year_month: &str) -> String {
    NaiveDate::parse_from_str(&format!("{year_month}-01"), "%Y-%m-%d")
        .map(|d| d.format("%b %Y").to_string())
        .unwrap_or_else(|_| year_month.to_string())
}

/// Format a byte count as a human-readable size.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(Decimal::new(123456, 2), "$"), "$1,234.56");
        assert_eq!(money(Decimal::from(-500), "$"), "-$500.00");
        assert_eq!(money(Decimal::ZERO, "₹"), "₹0.00");
        assert_eq!(money(Decimal::new(100000099, 2), "₹"), "₹1,000,000.99");
        assert_eq!(money(Decimal::new(421, 1), ""), "42.10");
    }

    #[test]
    fn test_money_never_prints_negative_zero() {
        assert_eq!(money(-Decimal::ZERO, "$"), "$0.00");
        assert_eq!(money(Decimal::new(-1, 3), "$"), "$0.00");
    }

    #[test]
    fn test_plain() {
        assert_eq!(plain(Decimal::from(3000)), "3000.00");
        assert_eq!(plain(Decimal::new(12345, 3)), "12.35");
    }

    #[test]
    fn test_month_label() {
        assert_eq!(month_label("2024-01"), "Jan 2024");
        assert_eq!(month_label("2025-12"), "Dec 2025");
        assert_eq!(month_label("garbage"), "garbage");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}

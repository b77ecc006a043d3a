//! Display formatting for rendered tables and CSV export
//!
//! Numbers are rendered fixed-point with 4 fractional digits, thousands
//! grouped with `,`, and trailing fractional zeros trimmed.

use crate::table::Cell;

/// Fractional digits kept before trimming
pub const PRECISION: usize = 4;

/// Format a number: `1234567.891` → `1,234,567.891`, `2.0` → `2`
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let fixed = format!("{:.*}", PRECISION, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, f.trim_end_matches('0')),
        None => (fixed.as_str(), ""),
    };

    let mut out = String::with_capacity(fixed.len() + int_part.len() / 3 + 1);
    // Rounding may turn a tiny negative into zero; never print "-0"
    if value.is_sign_negative() && (int_part != "0" || !frac_part.is_empty()) {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut grouped = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Render a cell for display; numbers go through [`format_number`]
pub fn format_cell(cell: &Cell) -> String {
    match cell {
        Cell::Null => String::new(),
        Cell::Number(v) => format_number(*v),
        Cell::Text(s) => s.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grouping_and_trimming() {
        assert_eq!(format_number(1234567.891), "1,234,567.891");
        assert_eq!(format_number(2.0), "2");
        assert_eq!(format_number(0.123456), "0.1235");
        assert_eq!(format_number(-1234.5), "-1,234.5");
        assert_eq!(format_number(999.0), "999");
        assert_eq!(format_number(1000.0), "1,000");
        assert_eq!(format_number(100000.25), "100,000.25");
    }

    #[test]
    fn test_rounding_to_zero_has_no_sign() {
        assert_eq!(format_number(-0.00001), "0");
        assert_eq!(format_number(0.0), "0");
    }

    #[test]
    fn test_rounding_carries_into_integer_part() {
        assert_eq!(format_number(999.99999), "1,000");
    }

    #[test]
    fn test_format_cell() {
        assert_eq!(format_cell(&Cell::Null), "");
        assert_eq!(format_cell(&Cell::Number(12345.0)), "12,345");
        assert_eq!(format_cell(&Cell::from("Hombre")), "Hombre");
    }
}

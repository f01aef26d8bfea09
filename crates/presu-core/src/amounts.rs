//! Spanish-locale monetary text: `.` is the thousands separator and `,` is
//! the decimal separator, so `"12.345,67"` means 12345.67.

use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::LazyLock;

/// Matches a Spanish-formatted amount: optional thousands groups separated by
/// dots, optional comma-decimals.
pub static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}(?:\.\d{3})*(?:,\d+)?$|^\d+(?:,\d+)?$").unwrap());

/// Parse a Spanish-formatted number. Returns `None` for text that is not a
/// number (dot leaders, blank, stray words). Numeric failures are soft by
/// contract: callers treat `None` as "value absent" and keep going.
pub fn parse_spanish(s: &str) -> Option<Decimal> {
    let s = s.trim();
    if s.is_empty() || !AMOUNT_RE.is_match(s) {
        return None;
    }
    let normalized = s.replace('.', "").replace(',', ".");
    Decimal::from_str(&normalized).ok()
}

/// Format a Decimal back to Spanish two-decimal text: 12345.67 -> "12.345,67".
pub fn format_spanish(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    let negative = rounded.is_sign_negative();
    let plain = rounded.abs().to_string();
    let (int_part, frac_part) = match plain.split_once('.') {
        Some((i, f)) => (i.to_string(), format!("{:0<2}", f)),
        None => (plain, "00".to_string()),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    let digits: Vec<char> = int_part.chars().collect();
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(*c);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}{grouped},{frac_part}")
}

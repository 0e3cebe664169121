//! Amount arithmetic as the browser form performs it.
//!
//! Everything here works on `f64` on purpose: totals already persisted by the
//! form were produced with binary floating point and an epsilon nudge, and new
//! totals must match them to the cent. Exact decimal arithmetic lives in
//! [`crate::reconcile`].

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

/// Fixed currency label shown in front of per-line totals.
pub const CURRENCY_LABEL: &str = "Tsh";

/// Round to two decimals, half toward +∞, after nudging by machine epsilon.
///
/// `round2(1.005)` is `1.01` even though `1.005` is stored slightly below the tie.
pub fn round2(value: f64) -> f64 {
    round_half_up((value + f64::EPSILON) * 100.0) / 100.0
}

/// `floor(x + 0.5)` without the precision loss of actually adding 0.5.
fn round_half_up(x: f64) -> f64 {
    if !x.is_finite() {
        return x;
    }
    let floor = x.floor();
    if x - floor >= 0.5 { floor + 1.0 } else { floor }
}

/// Coerce user-typed text to a number; anything unusable becomes `0.0`.
///
/// Leading whitespace is skipped and the longest numeric prefix is used, so
/// `"12abc"` is `12` and `"abc"` is `0`. NaN and negative zero also become `0.0`.
pub fn parse_amount(raw: &str) -> f64 {
    let text = raw.trim_start();
    let value = numeric_prefix(text)
        .and_then(|prefix| prefix.parse::<f64>().ok())
        .unwrap_or(0.0);

    if value.is_nan() || value == 0.0 { 0.0 } else { value }
}

/// Longest prefix of `text` that reads as a decimal literal (or `Infinity`).
fn numeric_prefix(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    if text[end..].starts_with("Infinity") {
        return Some(&text[..end + "Infinity".len()]);
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    // Exponent only counts when at least one digit follows it.
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    Some(&text[..end])
}

/// Render with thousands separators and exactly two decimals (`1,234.50`).
///
/// Rounds the shortest decimal form of `value` half away from zero, so
/// `0.125` shows as `0.13` and `1.005` as `1.01`.
pub fn format_amount(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "∞" } else { "-∞" }.to_string();
    }
    match Decimal::from_str(&value.to_string()) {
        Ok(exact) => {
            let mut cents = exact.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            cents.rescale(2);
            group_fixed(&cents.to_string())
        }
        // Beyond decimal range; cents are meaningless at that magnitude anyway.
        Err(_) => group_fixed(&format!("{value:.2}")),
    }
}

/// Per-line display text: `Tsh 1,234.50`.
pub fn format_currency(value: f64) -> String {
    format!("{CURRENCY_LABEL} {}", format_amount(value))
}

/// Insert thousands separators into a fixed-point string such as `-1234567.50`.
///
/// A value that rounded to zero loses its minus sign.
pub(crate) fn group_fixed(fixed: &str) -> String {
    let (negative, unsigned) = match fixed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, fixed),
    };
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));

    let mut grouped = String::with_capacity(unsigned.len() + int_part.len() / 3 + 1);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if !frac_part.is_empty() {
        grouped.push('.');
        grouped.push_str(frac_part);
    }

    let is_zero = unsigned.chars().all(|c| c == '0' || c == '.');
    if negative && !is_zero {
        format!("-{grouped}")
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round2_uses_epsilon_to_break_representation_ties() {
        assert_eq!(round2(1.005), 1.01);
        assert_eq!(round2(2.5), 2.5);
        assert_eq!(round2(0.125), 0.13);
    }

    #[test]
    fn round2_rounds_negative_ties_toward_positive_infinity() {
        assert_eq!(round2(-0.125), -0.12);
        assert_eq!(round2(-3.0), -3.0);
    }

    #[test]
    fn round2_passes_non_finite_values_through() {
        assert!(round2(f64::NAN).is_nan());
        assert_eq!(round2(f64::INFINITY), f64::INFINITY);
    }

    #[test]
    fn parse_amount_takes_the_numeric_prefix() {
        assert_eq!(parse_amount("12abc"), 12.0);
        assert_eq!(parse_amount("  3.5"), 3.5);
        assert_eq!(parse_amount(".5"), 0.5);
        assert_eq!(parse_amount("5."), 5.0);
        assert_eq!(parse_amount("-7.25kg"), -7.25);
        assert_eq!(parse_amount("1e3"), 1000.0);
        assert_eq!(parse_amount("1e"), 1.0);
        assert_eq!(parse_amount("2E-2x"), 0.02);
    }

    #[test]
    fn parse_amount_coerces_garbage_to_zero() {
        assert_eq!(parse_amount(""), 0.0);
        assert_eq!(parse_amount("abc"), 0.0);
        assert_eq!(parse_amount("."), 0.0);
        assert_eq!(parse_amount("-"), 0.0);
        assert_eq!(parse_amount("NaN"), 0.0);
        assert!(parse_amount("-0").is_sign_positive());
    }

    #[test]
    fn parse_amount_accepts_infinity_literal() {
        assert_eq!(parse_amount("Infinity"), f64::INFINITY);
        assert_eq!(parse_amount("-Infinity"), f64::NEG_INFINITY);
    }

    #[test]
    fn format_amount_groups_thousands_with_two_decimals() {
        assert_eq!(format_amount(0.0), "0.00");
        assert_eq!(format_amount(999.5), "999.50");
        assert_eq!(format_amount(3440.0), "3,440.00");
        assert_eq!(format_amount(1234567.891), "1,234,567.89");
        assert_eq!(format_amount(-1500.0), "-1,500.00");
    }

    #[test]
    fn format_amount_rounds_ties_away_from_zero() {
        assert_eq!(format_amount(0.125), "0.13");
        assert_eq!(format_amount(2.375), "2.38");
        assert_eq!(format_amount(1.005), "1.01");
        assert_eq!(format_amount(-0.125), "-0.13");
        assert_eq!(format_amount(1234.565), "1,234.57");
    }

    #[test]
    fn format_amount_falls_back_beyond_decimal_range() {
        assert_eq!(format_amount(1e30), group_fixed(&format!("{:.2}", 1e30)));
    }

    #[test]
    fn format_amount_drops_sign_of_rounded_zero() {
        assert_eq!(format_amount(-0.001), "0.00");
    }

    #[test]
    fn format_currency_prefixes_label() {
        assert_eq!(format_currency(3000.0), "Tsh 3,000.00");
    }

    #[test]
    fn group_fixed_handles_decimal_strings() {
        assert_eq!(group_fixed("1234.50"), "1,234.50");
        assert_eq!(group_fixed("-100"), "-100");
        assert_eq!(group_fixed("123456"), "123,456");
    }
}

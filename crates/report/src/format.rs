//! Numeric display formatting.
//!
//! Backend values arrive in two conventions: book-style strings with
//! grouping dots and a decimal comma (`"1.234,56"`), and plain numbers or
//! dot-decimal strings (`1234.56`, `"1234.56"`). Both render to the same
//! display form: exactly two fraction digits, `.` grouping, `,` decimal.
//!
//! Every function here is total. Unreadable input becomes [`SENTINEL`],
//! unparseable text is handed back unchanged.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Placeholder shown for values that could not be read.
pub const SENTINEL: &str = "--";

/// Marker the backend emits when a value could not be extracted.
pub const NOT_READ_MARKER: &str = "Não lido";

/// A loosely-typed numeric field as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Number(f64),
    Text(String),
}

impl RawNumber {
    /// Numeric value of a dot-decimal number or string.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawNumber::Number(n) if n.is_finite() => Some(*n),
            RawNumber::Number(_) => None,
            RawNumber::Text(s) => parse_grouped_decimal(s),
        }
    }
}

impl From<f64> for RawNumber {
    fn from(n: f64) -> Self {
        RawNumber::Number(n)
    }
}

impl From<&str> for RawNumber {
    fn from(s: &str) -> Self {
        RawNumber::Text(s.to_string())
    }
}

fn is_sentinel(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || trimmed == SENTINEL || trimmed == NOT_READ_MARKER
}

/// Parse a grouped-decimal-comma string (`"1.234,56"`) into a float.
///
/// Grouping dots are dropped and the first comma becomes the decimal point.
/// The whole remaining string must be numeric.
pub fn parse_localized(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace('.', "").replacen(',', ".", 1);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a dot-decimal string (`"1234.56"`) into a float.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn comma_grouped_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?\d{1,3}(,\d{3})+(\.\d+)?$").expect("comma grouped pattern"))
}

/// Parse a dot-decimal string that may carry comma grouping
/// (`"1,234.56"`), as some backend reports print their floats.
pub fn parse_grouped_decimal(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if let Some(value) = parse_decimal(trimmed) {
        return Some(value);
    }
    if comma_grouped_re().is_match(trimmed) {
        return parse_decimal(&trimmed.replace(',', ""));
    }
    None
}

/// Render a value with two fraction digits, `.` grouping and `,` decimal.
pub fn format_amount(value: f64) -> String {
    if !value.is_finite() {
        return SENTINEL.to_string();
    }
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    // Values that round to zero never carry a sign.
    let negative = value < 0.0 && fixed.bytes().any(|b| (b'1'..=b'9').contains(&b));

    let mut out = String::with_capacity(fixed.len() + int_part.len() / 3 + 1);
    if negative {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    out.push(',');
    out.push_str(frac_part);
    out
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

/// Normalize a book-style string for display.
///
/// `None`, blank, `"--"` and the not-read marker render as `"--"`.
/// Text that does not parse is returned as-is.
pub fn format_localized(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return SENTINEL.to_string();
    };
    if is_sentinel(raw) {
        return SENTINEL.to_string();
    }
    match parse_localized(raw) {
        Some(value) => format_amount(value),
        None => raw.to_string(),
    }
}

/// Normalize a dot-decimal number or string for display.
pub fn format_decimal(raw: Option<&RawNumber>) -> String {
    match raw {
        None => SENTINEL.to_string(),
        Some(RawNumber::Number(n)) => format_amount(*n),
        Some(RawNumber::Text(s)) if s.trim().is_empty() => SENTINEL.to_string(),
        Some(RawNumber::Text(s)) => match parse_grouped_decimal(s) {
            Some(value) => format_amount(value),
            None => s.clone(),
        },
    }
}

/// Prefix a formatted amount with the currency symbol, leaving the
/// sentinel bare.
pub fn with_currency(formatted: String) -> String {
    if formatted == SENTINEL {
        formatted
    } else {
        format!("R$ {formatted}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn localized_pads_fraction() {
        assert_eq!(format_localized(Some("1.234,5")), "1.234,50");
        assert_eq!(format_localized(Some("2.360.524,26")), "2.360.524,26");
        assert_eq!(format_localized(Some("0,1")), "0,10");
    }

    #[test]
    fn localized_sentinels() {
        assert_eq!(format_localized(None), "--");
        assert_eq!(format_localized(Some("")), "--");
        assert_eq!(format_localized(Some("   ")), "--");
        assert_eq!(format_localized(Some("--")), "--");
        assert_eq!(format_localized(Some("Não lido")), "--");
    }

    #[test]
    fn localized_garbage_is_returned() {
        assert_eq!(format_localized(Some("abc")), "abc");
        assert_eq!(format_localized(Some("12abc")), "12abc");
        assert_eq!(format_localized(Some("ERRO")), "ERRO");
    }

    #[test]
    fn localized_negative() {
        assert_eq!(format_localized(Some("-1.000,00")), "-1.000,00");
    }

    #[test]
    fn decimal_numbers_and_strings() {
        assert_eq!(format_decimal(Some(&RawNumber::Number(1234.5))), "1.234,50");
        assert_eq!(format_decimal(Some(&RawNumber::Number(0.0))), "0,00");
        assert_eq!(format_decimal(Some(&"1234567.891".into())), "1.234.567,89");
        assert_eq!(format_decimal(Some(&"0".into())), "0,00");
    }

    #[test]
    fn decimal_accepts_comma_grouping() {
        assert_eq!(format_decimal(Some(&"2,360,524.26".into())), "2.360.524,26");
        assert_eq!(format_decimal(Some(&"-1,000.5".into())), "-1.000,50");
        assert_eq!(format_decimal(Some(&"12,50".into())), "12,50");
    }

    #[test]
    fn decimal_fallbacks() {
        assert_eq!(format_decimal(None), "--");
        assert_eq!(format_decimal(Some(&"".into())), "--");
        assert_eq!(format_decimal(Some(&"n/a".into())), "n/a");
    }

    #[test]
    fn decimal_is_idempotent_on_output() {
        let once = format_decimal(Some(&RawNumber::Number(98765.4)));
        let twice = format_decimal(Some(&RawNumber::Text(once.clone())));
        assert_eq!(once, twice);
    }

    #[test]
    fn amount_rounding_and_sign() {
        assert_eq!(format_amount(999.999), "1.000,00");
        assert_eq!(format_amount(-0.001), "0,00");
        assert_eq!(format_amount(-12.5), "-12,50");
        assert_eq!(format_amount(f64::NAN), "--");
        assert_eq!(format_amount(100000.0), "100.000,00");
    }

    #[test]
    fn currency_prefix_skips_sentinel() {
        assert_eq!(with_currency("1,00".into()), "R$ 1,00");
        assert_eq!(with_currency(SENTINEL.into()), "--");
    }

    #[test]
    fn raw_number_deserializes_both_shapes() {
        let n: RawNumber = serde_json::from_str("12.5").unwrap();
        let s: RawNumber = serde_json::from_str("\"12.5\"").unwrap();
        assert_eq!(n.as_f64(), Some(12.5));
        assert_eq!(s.as_f64(), Some(12.5));
    }
}

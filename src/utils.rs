//! Helper parsers and formatters for monetary values.

use crate::error::ReportError;
use crate::types::Money;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Normalizes a numeric string, removing spaces, the plus sign etc.
fn normalize_number(input: &str) -> String {
    input
        .chars()
        .filter(|ch| !matches!(*ch, ' ' | '\u{a0}' | '\u{202f}' | '+'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Parses a monetary value, treating an empty field as zero.
pub fn parse_money_or_zero(value: &str, field: &'static str) -> Result<Money, ReportError> {
    let normalized = normalize_number(value);
    if normalized.is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_str(&normalized).map_err(|_| ReportError::Number {
        value: value.trim().to_string(),
        field,
    })
}

/// Renders a transaction total the way the reference report prints it:
/// trailing zeros trimmed, but an integral total keeps one `.0` digit.
#[must_use]
pub fn format_total(total: Money) -> String {
    let normalized = total.normalize();
    if normalized.scale() == 0 {
        format!("{normalized}.0")
    } else {
        normalized.to_string()
    }
}

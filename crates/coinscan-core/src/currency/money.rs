//! Conversions between raw amounts, thousands and display strings.
//!
//! Display uses wan (`w`, 1e4) below 1e8 and `{yi}e{wan}w` above it,
//! so 130_000_000 renders as `1e3000w`.

use crate::error::ParseError;

use super::patterns::{MONEY_TOKEN, YI_WAN_TOKEN};

const WAN: i64 = 10_000;
const YI: i64 = 100_000_000;

/// Parse a user-entered amount such as `"12345"`, `"3.2w"`, `"500k"` or `"1e3000w"`.
pub fn parse_money_token(token: &str) -> Result<u64, ParseError> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    if let Some(caps) = YI_WAN_TOKEN.captures(trimmed) {
        let invalid = || ParseError::InvalidNumber(token.to_string());
        let yi: u64 = caps[1].parse().map_err(|_| invalid())?;
        let wan: u64 = caps[2].parse().map_err(|_| invalid())?;
        return yi
            .checked_mul(YI as u64)
            .and_then(|v| v.checked_add(wan.checked_mul(WAN as u64)?))
            .ok_or_else(invalid);
    }

    let caps = MONEY_TOKEN
        .captures(trimmed)
        .ok_or_else(|| ParseError::InvalidNumber(token.to_string()))?;

    let number: f64 = caps[1]
        .replace(',', "")
        .parse()
        .map_err(|_| ParseError::InvalidNumber(token.to_string()))?;

    let multiplier = match caps[2].to_lowercase().as_str() {
        "k" => 1_000.0,
        "w" => 10_000.0,
        "m" => 1_000_000.0,
        _ => 1.0,
    };

    Ok((number * multiplier).round() as u64)
}

/// Raw units to thousands, rounded.
pub fn raw_to_k(raw: u64) -> u64 {
    (raw as f64 / 1_000.0).round() as u64
}

/// Render a raw amount for display. `None` renders as `-`.
pub fn format_money(raw: Option<i64>) -> String {
    let Some(raw) = raw else {
        return "-".to_string();
    };
    if raw == 0 {
        return "0".to_string();
    }

    let sign = if raw < 0 { "-" } else { "" };
    let abs = raw.unsigned_abs();

    if abs < YI as u64 {
        let wan = abs as f64 / WAN as f64;
        return format!("{}{}w", sign, trim_decimal(&format!("{:.1}", wan)));
    }

    let yi = abs / YI as u64;
    let wan = (abs % YI as u64) / WAN as u64;
    format!("{}{}e{}w", sign, yi, wan)
}

/// Render an unsigned raw amount, saturating at `i64::MAX`.
pub fn format_raw(raw: Option<u64>) -> String {
    format_money(raw.map(|r| i64::try_from(r).unwrap_or(i64::MAX)))
}

/// Render an amount stored in thousands.
pub fn format_money_from_k(k: Option<i64>) -> String {
    format_money(k.map(|k| k.saturating_mul(1_000)))
}

fn trim_decimal(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

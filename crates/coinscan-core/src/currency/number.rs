//! Numeric token parsing with separator disambiguation.

use crate::error::ParseError;

use super::patterns::{GROUPED_TOKEN, PLAIN_DECIMAL};

/// Parse a numeric token, deciding whether `.`/`,` group thousands or mark decimals.
///
/// `"21.789"` and `"21,789"` are thousands-grouped (21789); `"64.7"` is a
/// decimal. Outside the grouped shape, commas are dropped and a dot is
/// kept as the decimal point.
pub fn parse_number(token: &str) -> Result<f64, ParseError> {
    let cleaned: String = token
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == '，' { ',' } else { c })
        .collect();

    if cleaned.is_empty() {
        return Err(ParseError::Empty);
    }

    let normalized = if GROUPED_TOKEN.is_match(&cleaned) {
        cleaned.replace([',', '.'], "")
    } else {
        cleaned.replace(',', "")
    };

    if !PLAIN_DECIMAL.is_match(&normalized) {
        return Err(ParseError::InvalidNumber(token.to_string()));
    }

    normalized
        .parse::<f64>()
        .map_err(|_| ParseError::InvalidNumber(token.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grouped_thousands() {
        assert_eq!(parse_number("21.789"), Ok(21789.0));
        assert_eq!(parse_number("21,789"), Ok(21789.0));
        assert_eq!(parse_number("1.234.567"), Ok(1234567.0));
        assert_eq!(parse_number("647，736"), Ok(647736.0));
    }

    #[test]
    fn test_plain_decimal() {
        assert_eq!(parse_number("64.7"), Ok(64.7));
        assert_eq!(parse_number("12345"), Ok(12345.0));
        assert_eq!(parse_number(" 3.2 "), Ok(3.2));
        assert_eq!(parse_number("1,234.5"), Ok(1234.5));
        assert_eq!(parse_number("12."), Ok(12.0));
    }

    #[test]
    fn test_invalid_tokens() {
        assert_eq!(parse_number(""), Err(ParseError::Empty));
        assert_eq!(parse_number("   "), Err(ParseError::Empty));
        assert!(matches!(parse_number("1.2.3"), Err(ParseError::InvalidNumber(_))));
        assert!(matches!(parse_number("12k"), Err(ParseError::InvalidNumber(_))));
        assert!(matches!(parse_number("."), Err(ParseError::InvalidNumber(_))));
    }
}

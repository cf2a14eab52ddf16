//! Regex patterns for currency readings.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // A number followed by a magnitude suffix: "12345k", "3.2 w", "8万", "1.5M"
    pub static ref UNIT_TAGGED: Regex = Regex::new(
        r"([0-9][0-9,.]*)\s*([kKwWmM万])"
    ).unwrap();

    // Thousands-grouped number without a suffix: "647,736", "8.650", "1,234,567"
    pub static ref GROUPED_BARE: Regex = Regex::new(
        r"\b([0-9]{1,3}(?:[,.][0-9]{3}){1,2})\b"
    ).unwrap();

    // Any run of at least four digit/separator characters
    pub static ref BARE_NUMERIC: Regex = Regex::new(
        r"\b([0-9][0-9,.]{3,})\b"
    ).unwrap();

    // Whole-token shapes for number parsing
    pub static ref GROUPED_TOKEN: Regex = Regex::new(
        r"^[0-9]{1,3}(?:[.,][0-9]{3})+$"
    ).unwrap();

    pub static ref PLAIN_DECIMAL: Regex = Regex::new(
        r"^(?:[0-9]+\.?[0-9]*|\.[0-9]+)$"
    ).unwrap();

    // Money input tokens: "1e3000w" means 1 yi (1e8) plus 3000 wan
    pub static ref YI_WAN_TOKEN: Regex = Regex::new(
        r"^\s*(\d+)\s*[eE]\s*(\d+)\s*[wW]\s*$"
    ).unwrap();

    pub static ref MONEY_TOKEN: Regex = Regex::new(
        r"^\s*([0-9][0-9,]*(?:\.[0-9]+)?)\s*([kKmMwW]?)\s*$"
    ).unwrap();
}

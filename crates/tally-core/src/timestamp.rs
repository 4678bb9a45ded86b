//! Timestamp normalization for Monzo wire timestamps
//!
//! Monzo emits UTC timestamps with anywhere between 0 and 3 digits of
//! fractional-second precision (`2018-10-05T19:34:12Z`,
//! `2018-10-05T19:34:12.5Z`, ... `.500Z`). A single regex accepts all four
//! shapes; the fraction is right-padded to milliseconds so equal sub-second
//! values normalize to the same instant regardless of digit count.

use std::sync::OnceLock;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use regex::Regex;

use crate::error::{Error, Result};

fn timestamp_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2})(?:\.(\d{1,3}))?Z$")
            .expect("timestamp regex is valid")
    })
}

/// Parse a Monzo timestamp string into a UTC instant.
pub fn parse_instant(value: &str) -> Result<DateTime<Utc>> {
    let caps = timestamp_re()
        .captures(value)
        .ok_or_else(|| Error::InvalidData(format!("unparseable timestamp '{}'", value)))?;

    let base = NaiveDateTime::parse_from_str(&caps[1], "%Y-%m-%dT%H:%M:%S")
        .map_err(|e| Error::InvalidData(format!("unparseable timestamp '{}': {}", value, e)))?;

    let millis = match caps.get(2) {
        Some(frac) => {
            let digits = frac.as_str();
            // 1-3 digits guaranteed by the regex
            let n: i64 = digits.parse().unwrap_or(0);
            n * 10i64.pow(3 - digits.len() as u32)
        }
        None => 0,
    };

    Ok(base.and_utc() + Duration::milliseconds(millis))
}

/// Parse the `settled` field, where the empty string means "not yet settled".
pub fn parse_settled(value: &str) -> Result<Option<DateTime<Utc>>> {
    if value.is_empty() {
        return Ok(None);
    }
    parse_instant(value).map(Some)
}

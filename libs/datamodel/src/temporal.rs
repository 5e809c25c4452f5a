//! ISO-8601 calendar dates and RFC 3339 timestamps.
//!
//! Dates are `YYYY-MM-DD`. Timestamps are emitted as
//! `YYYY-MM-DDThh:mm:ss[.ffffff]±hh:mm`, always with an explicit offset
//! (never `Z`), and accepted with either an offset or `Z`.

use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat, Timelike};

use crate::error::ConvertError;

pub fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Fractional seconds are written only when present: six digits for
/// microsecond precision, nine otherwise.
pub fn format_datetime(dt: &DateTime<FixedOffset>) -> String {
    let precision = match dt.nanosecond() % 1_000_000_000 {
        0 => SecondsFormat::Secs,
        n if n % 1_000 == 0 => SecondsFormat::Micros,
        _ => SecondsFormat::Nanos,
    };
    dt.to_rfc3339_opts(precision, false)
}

/// Parse `YYYY-MM-DD`. A longer timestamp whose first ten characters form a
/// date (`2018-07-02T12:00:00+00:00`) yields that date.
pub fn parse_date(text: &str) -> Result<NaiveDate, ConvertError> {
    let trimmed = text.trim();
    let date_part = match trimmed.get(10..11) {
        Some("T" | "t" | " ") => &trimmed[..10],
        _ => trimmed,
    };
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|e| ConvertError::temporal(format!("invalid date {text:?}: {e}")))
}

pub fn parse_datetime(text: &str) -> Result<DateTime<FixedOffset>, ConvertError> {
    DateTime::parse_from_rfc3339(text.trim())
        .map_err(|e| ConvertError::temporal(format!("invalid timestamp {text:?}: {e}")))
}

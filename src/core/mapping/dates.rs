//! Timestamp normalization
//!
//! Every date column of a UDM record is `YYYY-MM-DD HH:MM:SS` in UTC, or empty.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Output format of every UDM date column
pub const UDM_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Parse an ISO-8601 timestamp with or without an offset
///
/// Values without an offset are taken as UTC. A bare date is midnight.
/// Anything else, locale formats included, is `None`.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(value, format) {
            return Some(parsed.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&parsed));
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Re-emit a source timestamp in the UDM format; unparseable values become empty
pub fn normalize_timestamp(value: &str) -> String {
    parse_timestamp(value)
        .map(|ts| format_timestamp(&ts))
        .unwrap_or_default()
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(UDM_DATE_FORMAT).to_string()
}

/// Convert unix seconds (as text) to the UDM format
pub fn from_unix_seconds(value: &str) -> String {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .map(|ts| format_timestamp(&ts))
        .unwrap_or_default()
}

/// Whether a source timestamp lies after `now`; unparseable values never do
pub fn is_after(value: &str, now: DateTime<Utc>) -> bool {
    parse_timestamp(value).is_some_and(|ts| ts > now)
}

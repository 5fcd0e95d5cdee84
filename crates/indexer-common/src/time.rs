//! Timestamp normalization for metadata records.
//!
//! Source timestamps are assumed to already be UTC or naive-UTC; a missing
//! UTC marker is appended, never converted.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Seed for a minimum-fold over event timestamps. Any real timestamp in the
/// data is earlier than this.
pub const EARLIEST_SEED: &str = "2099-01-01T00:00:00Z";

/// Seed for a maximum-fold over event timestamps. Any real timestamp in the
/// data is later than this.
pub const LATEST_SEED: &str = "1000-01-01T00:00:00Z";

/// Values the source schema uses for an unknown temporal boundary.
pub fn is_unknown_placeholder(value: &str) -> bool {
    value.is_empty() || value == "--"
}

/// Append the UTC marker when missing. No timezone conversion takes place.
pub fn ensure_utc_marker(value: &str) -> String {
    if value.ends_with('Z') {
        value.to_string()
    } else {
        format!("{value}Z")
    }
}

/// Parse a timestamp in any of the shapes the source schema carries:
/// RFC 3339, naive datetime, or a bare date (midnight assumed).
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(ndt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(Utc.from_utc_datetime(&ndt));
    }

    if let Ok(ndt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&ndt));
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }

    None
}

/// Canonical timestamp form used by the index schema.
pub fn format_utc(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

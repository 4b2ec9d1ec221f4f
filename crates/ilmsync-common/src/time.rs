use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a strict `YYYY-MM-DD` calendar date.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    // chrono tolerates padding spaces and signed years; only the canonical form round-trips.
    let bytes = value.as_bytes();
    if bytes.len() != 10 {
        return None;
    }
    let canonical = bytes.iter().enumerate().all(|(idx, byte)| match idx {
        4 | 7 => *byte == b'-',
        _ => byte.is_ascii_digit(),
    });
    if !canonical {
        return None;
    }
    NaiveDate::parse_from_str(value, ISO_DATE_FORMAT).ok()
}

pub fn format_iso_date(date: &NaiveDate) -> String {
    date.format(ISO_DATE_FORMAT).to_string()
}

/// Lifecycle dates travel as midnight UTC timestamps, e.g. `2024-01-01T00:00:00Z`.
pub fn format_lifecycle_date(date: &NaiveDate) -> String {
    date.and_time(NaiveTime::MIN)
        .and_utc()
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string()
}

pub fn parse_lifecycle_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Some(date) = parse_iso_date(value) {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
}

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};

/// Parses a timestamp in any of the accepted layouts and normalizes it to UTC.
///
/// Accepted: RFC 3339 (any offset), `YYYY-MM-DDTHH:MM:SSZ`,
/// `YYYY-MM-DD HH:MM:SS` (assumed UTC) and a bare `YYYY-MM-DD` (midnight UTC).
/// Years outside 1..=9999 are rejected.
pub fn parse_utc_datetime(raw: &str) -> Option<DateTime<Utc>> {
    parse_any_layout(raw.trim()).filter(|dt| (1..=9999).contains(&dt.year()))
}

fn parse_any_layout(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for layout in ["%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, layout) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

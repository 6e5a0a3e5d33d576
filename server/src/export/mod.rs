//! Calendar and feed renderers for exported events.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::index::ExportEntry;
use crate::utils::error::AppError;

pub mod gcal;
pub mod ics;
pub mod rss;

/// Start and end of the calendar entry for an export row. Occurrences
/// without a known end last `default_duration`.
pub fn entry_bounds(
    entry: &ExportEntry,
    default_duration: Duration,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = entry.anchor.dtstart_utc;
    let end = entry.anchor.effective_end().unwrap_or_else(|| {
        start
            .checked_add_signed(default_duration)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    });
    (start, end)
}

pub fn event_url(site_url: &str, event_id: Uuid) -> String {
    format!("{}/events/{}", site_url.trim_end_matches('/'), event_id)
}

/// Parses the comma-separated `ids` query parameter.
pub fn parse_id_list(raw: Option<&str>) -> Result<Vec<Uuid>, AppError> {
    let raw = raw.unwrap_or_default();
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            Uuid::parse_str(id)
                .map_err(|_| AppError::ValidationError(format!("'{id}' is not a valid event id")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if ids.is_empty() {
        return Err(AppError::ValidationError(
            "the 'ids' parameter is required".to_string(),
        ));
    }
    Ok(ids)
}

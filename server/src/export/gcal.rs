use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use url::form_urlencoded;
use uuid::Uuid;

use super::entry_bounds;
use crate::index::ExportEntry;
use crate::utils::text::truncate_text;

const RENDER_URL: &str = "https://calendar.google.com/calendar/render";
/// Google rejects overly long template URLs.
const MAX_DETAILS_CHARS: usize = 1000;

#[derive(Debug, Clone, Serialize)]
pub struct GoogleCalendarLink {
    pub event_id: Uuid,
    pub title: String,
    pub url: String,
}

fn format_gcal_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

/// "Add to Google Calendar" template URL for one export row.
pub fn calendar_url(entry: &ExportEntry, default_duration: Duration) -> String {
    let event = &entry.event;
    let (start, end) = entry_bounds(entry, default_duration);
    let dates = format!(
        "{}/{}",
        format_gcal_datetime(start),
        format_gcal_datetime(end)
    );

    let mut query = form_urlencoded::Serializer::new(String::new());
    query
        .append_pair("action", "TEMPLATE")
        .append_pair("text", &event.title)
        .append_pair("dates", &dates);
    if let Some(description) = &event.description {
        query.append_pair("details", &truncate_text(description, MAX_DETAILS_CHARS));
    }
    if let Some(location) = &event.location {
        query.append_pair("location", location);
    }
    if let Some(tz) = &entry.anchor.tz {
        query.append_pair("ctz", tz);
    }

    format!("{RENDER_URL}?{}", query.finish())
}

pub fn calendar_links(entries: &[ExportEntry], default_duration: Duration) -> Vec<GoogleCalendarLink> {
    entries
        .iter()
        .map(|entry| GoogleCalendarLink {
            event_id: entry.event.id,
            title: entry.event.title.clone(),
            url: calendar_url(entry, default_duration),
        })
        .collect()
}

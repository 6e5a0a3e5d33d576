//! iCalendar (RFC 5545) rendering.

use chrono::{DateTime, Duration, Utc};

use super::{entry_bounds, event_url};
use crate::index::ExportEntry;

const MAX_LINE_OCTETS: usize = 75;
const PRODUCT_ID: &str = "-//Wat2Do//Events//EN";

pub const CONTENT_TYPE: &str = "text/calendar; charset=utf-8";

fn format_ics_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Escapes a TEXT property value.
pub fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            ';' => escaped.push_str("\\;"),
            ',' => escaped.push_str("\\,"),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            other => escaped.push(other),
        }
    }
    escaped
}

/// Folds a content line so no physical line exceeds 75 octets. Folding
/// never splits a multi-byte character.
pub fn fold_line(line: &str) -> String {
    let mut folded = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut width = 0;
    for ch in line.chars() {
        let len = ch.len_utf8();
        if width + len > MAX_LINE_OCTETS {
            folded.push_str("\r\n ");
            width = 1;
        }
        folded.push(ch);
        width += len;
    }
    folded
}

struct CalendarWriter {
    out: String,
}

impl CalendarWriter {
    fn new() -> Self {
        Self { out: String::new() }
    }

    fn line(&mut self, content: &str) {
        self.out.push_str(&fold_line(content));
        self.out.push_str("\r\n");
    }

    fn property(&mut self, name: &str, value: &str) {
        self.line(&format!("{name}:{value}"));
    }

    fn text(&mut self, name: &str, value: &str) {
        self.property(name, &escape_text(value));
    }

    fn finish(self) -> String {
        self.out
    }
}

/// Renders a VCALENDAR with one VEVENT per entry.
pub fn render_calendar(
    entries: &[ExportEntry],
    default_duration: Duration,
    site_url: &str,
    stamp: DateTime<Utc>,
) -> String {
    let mut cal = CalendarWriter::new();
    cal.line("BEGIN:VCALENDAR");
    cal.property("VERSION", "2.0");
    cal.property("PRODID", PRODUCT_ID);
    cal.property("CALSCALE", "GREGORIAN");
    cal.property("METHOD", "PUBLISH");

    let dtstamp = format_ics_datetime(stamp);
    for entry in entries {
        let event = &entry.event;
        let (start, end) = entry_bounds(entry, default_duration);

        cal.line("BEGIN:VEVENT");
        cal.property("UID", &format!("{}@wat2do", event.id));
        cal.property("DTSTAMP", &dtstamp);
        cal.property("DTSTART", &format_ics_datetime(start));
        cal.property("DTEND", &format_ics_datetime(end));
        cal.text("SUMMARY", &event.title);
        if let Some(description) = &event.description {
            cal.text("DESCRIPTION", description);
        }
        if let Some(location) = &event.location {
            cal.text("LOCATION", location);
        }
        if !event.categories.is_empty() {
            let categories: Vec<String> = event.categories.iter().map(|c| escape_text(c)).collect();
            cal.property("CATEGORIES", &categories.join(","));
        }
        let url = event
            .source_url
            .clone()
            .unwrap_or_else(|| event_url(site_url, event.id));
        cal.property("URL", &url);
        cal.line("END:VEVENT");
    }

    cal.line("END:VCALENDAR");
    cal.finish()
}

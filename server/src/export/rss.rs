//! RSS 2.0 feed of upcoming events.

use chrono::{DateTime, Utc};
use quick_xml::escape::escape;

use super::event_url;
use crate::index::ExportEntry;
use crate::utils::text::truncate_text;

pub const CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";

const CHANNEL_TITLE: &str = "Wat2Do Events";
const CHANNEL_DESCRIPTION: &str = "Live and upcoming events from campus clubs";
const MAX_DESCRIPTION_CHARS: usize = 500;

fn item_description(entry: &ExportEntry) -> String {
    let event = &entry.event;
    let mut text = event.description.clone().unwrap_or_default();
    if let Some(location) = &event.location {
        if !text.is_empty() {
            text.push_str("\n\n");
        }
        text.push_str("Location: ");
        text.push_str(location);
    }
    truncate_text(&text, MAX_DESCRIPTION_CHARS)
}

/// Renders the feed. `entries` are expected in listing order.
pub fn render_feed(entries: &[ExportEntry], site_url: &str, built_at: DateTime<Utc>) -> String {
    let site_url = site_url.trim_end_matches('/');
    let mut xml = String::new();

    xml.push_str(&format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <rss version=\"2.0\">\n\
         <channel>\n\
         <title>{}</title>\n\
         <link>{}</link>\n\
         <description>{}</description>\n\
         <lastBuildDate>{}</lastBuildDate>\n",
        escape(CHANNEL_TITLE),
        escape(site_url),
        escape(CHANNEL_DESCRIPTION),
        built_at.to_rfc2822(),
    ));

    for entry in entries {
        let event = &entry.event;
        let link = event_url(site_url, event.id);

        xml.push_str(&format!(
            "<item>\n\
             <title>{}</title>\n\
             <link>{}</link>\n\
             <guid isPermaLink=\"false\">{}</guid>\n\
             <description>{}</description>\n\
             <pubDate>{}</pubDate>\n",
            escape(event.title.as_str()),
            escape(link.as_str()),
            event.id,
            escape(item_description(entry).as_str()),
            entry.anchor.dtstart_utc.to_rfc2822(),
        ));
        for category in &event.categories {
            xml.push_str(&format!("<category>{}</category>\n", escape(category.as_str())));
        }
        xml.push_str("</item>\n");
    }

    xml.push_str("</channel>\n</rss>\n");
    xml
}

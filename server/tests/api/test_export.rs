use axum::http::StatusCode;
use chrono::{Duration, Utc};

use crate::common::{app, at, event, get};

#[tokio::test]
async fn test_ics_export() {
    let app = app();
    let mut e = event("Board Games; Snacks, Fun");
    e.description = Some("Line one\nLine two".into());
    let start = Utc::now() + Duration::days(3);
    app.store.insert_event(e.clone(), vec![at(start, None)]);

    let res = get(&app.router, &format!("/api/events/export/ics?ids={}", e.id)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.headers["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/calendar"));

    let body = res.body;
    assert!(body.starts_with("BEGIN:VCALENDAR\r\n"));
    assert_eq!(body.matches("BEGIN:VEVENT").count(), 1);
    assert!(body.contains(&format!("UID:{}@wat2do\r\n", e.id)));
    assert!(body.contains("SUMMARY:Board Games\\; Snacks\\, Fun\r\n"));
    assert!(body.contains("DESCRIPTION:Line one\\nLine two\r\n"));
    assert!(body.contains(&format!("DTSTART:{}\r\n", start.format("%Y%m%dT%H%M%SZ"))));
}

#[tokio::test]
async fn test_ics_export_includes_past_events_by_id() {
    let app = app();
    let past = event("Last Term Social");
    app.store
        .insert_event(past.clone(), vec![at(Utc::now() - Duration::days(90), None)]);

    let res = get(&app.router, &format!("/api/events/export/ics?ids={}", past.id)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body.contains(&format!("UID:{}@wat2do", past.id)));
}

#[tokio::test]
async fn test_export_requires_valid_ids() {
    let app = app();

    let res = get(&app.router, "/api/events/export/ics").await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = get(&app.router, "/api/events/google-calendar-urls?ids=abc").await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json()["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_google_calendar_urls() {
    let app = app();
    let first = event("First");
    let second = event("Second");
    app.store
        .insert_event(second.clone(), vec![at(Utc::now() + Duration::days(2), None)]);
    app.store
        .insert_event(first.clone(), vec![at(Utc::now() + Duration::days(1), None)]);

    let res = get(
        &app.router,
        &format!("/api/events/google-calendar-urls?ids={},{}", second.id, first.id),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);

    let body = res.json();
    let links = body["data"].as_array().unwrap();
    assert_eq!(links.len(), 2);
    assert_eq!(links[0]["event_id"], first.id.to_string());
    assert!(links[0]["url"]
        .as_str()
        .unwrap()
        .starts_with("https://calendar.google.com/calendar/render?action=TEMPLATE&text=First"));
}

#[tokio::test]
async fn test_rss_feed_lists_upcoming_events() {
    let app = app();
    let upcoming = event("Jazz & Blues Night");
    let old = event("Old News");
    app.store
        .insert_event(upcoming.clone(), vec![at(Utc::now() + Duration::days(1), None)]);
    app.store
        .insert_event(old, vec![at(Utc::now() - Duration::days(10), None)]);

    let res = get(&app.router, "/rss.xml").await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.headers["content-type"]
        .to_str()
        .unwrap()
        .starts_with("application/rss+xml"));
    assert_eq!(res.body.matches("<item>").count(), 1);
    assert!(res.body.contains("<title>Jazz &amp; Blues Night</title>"));
    assert!(!res.body.contains("Old News"));
}

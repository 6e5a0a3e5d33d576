#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use wat2do_server::config::Config;
use wat2do_server::models::{Event, EventStatus, NewOccurrence, SocialHandles};
use wat2do_server::routes::create_routes;
use wat2do_server::state::AppState;
use wat2do_server::store::MemoryStore;

pub const NOW: &str = "2025-10-20T16:00:00Z";

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 20, 16, 0, 0).unwrap()
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

pub fn app() -> TestApp {
    app_with(Config::default())
}

pub fn app_with(config: Config) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let router = create_routes(AppState::new(store.clone(), config));
    TestApp { router, store }
}

pub fn event(title: &str) -> Event {
    Event {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: None,
        location: Some("SLC Great Hall".to_string()),
        categories: vec![],
        status: EventStatus::Confirmed,
        price: None,
        registration: false,
        food: None,
        club_type: None,
        school: Some("University of Waterloo".to_string()),
        handles: SocialHandles::default(),
        source_url: None,
        source_image_url: None,
        added_at: Some(now()),
        created_at: now(),
        updated_at: now(),
    }
}

pub fn at(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> NewOccurrence {
    NewOccurrence {
        dtstart_utc: start,
        dtend_utc: end,
        duration_seconds: None,
        tz: None,
    }
}

pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl RawResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> RawResponse {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    RawResponse {
        status,
        headers,
        body: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}

pub async fn get(router: &Router, uri: &str) -> RawResponse {
    send(
        router,
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
    )
    .await
}

pub async fn post_json(router: &Router, uri: &str, body: Value) -> RawResponse {
    send(
        router,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

/// Ids of the `results` array of an enveloped page.
pub fn result_ids(page: &Value) -> Vec<String> {
    page["data"]["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap().to_string())
        .collect()
}

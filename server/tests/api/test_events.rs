use std::collections::HashSet;
use std::time::Duration as StdDuration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Duration;
use rust_decimal::Decimal;
use serde_json::json;

use wat2do_server::config::Config;
use wat2do_server::models::EventStatus;

use crate::common::{app, app_with, at, event, get, now, post_json, result_ids, send, NOW};

#[tokio::test]
async fn test_listing_orders_live_before_upcoming() {
    let app = app();
    let tomorrow = event("Tomorrow");
    let live = event("Started an hour ago");
    let finished = event("Finished");
    app.store
        .insert_event(tomorrow.clone(), vec![at(now() + Duration::days(1), None)]);
    app.store
        .insert_event(live.clone(), vec![at(now() - Duration::hours(1), None)]);
    app.store.insert_event(
        finished.clone(),
        vec![at(
            now() - Duration::hours(3),
            Some(now() - Duration::hours(2)),
        )],
    );

    let res = get(&app.router, &format!("/api/events?now={NOW}")).await;
    assert_eq!(res.status, StatusCode::OK);

    let body = res.json();
    assert_eq!(body["success"], true);
    assert_eq!(
        result_ids(&body),
        vec![live.id.to_string(), tomorrow.id.to_string()]
    );
    assert_eq!(body["data"]["results"][0]["is_live"], true);
    assert_eq!(body["data"]["results"][1]["is_live"], false);
    assert_eq!(body["data"]["totalCount"], 2);
    assert_eq!(body["data"]["hasMore"], false);
    assert!(body["data"]["nextCursor"].is_null());
}

#[tokio::test]
async fn test_relevant_occurrence_is_reported() {
    let app = app();
    let weekly = event("Weekly Run");
    app.store.insert_event(
        weekly.clone(),
        vec![
            at(now() - Duration::days(7), None),
            at(now() + Duration::days(7), None),
            at(now() + Duration::days(14), None),
        ],
    );

    let body = get(&app.router, &format!("/api/events?now={NOW}")).await.json();
    assert_eq!(
        body["data"]["results"][0]["relevant_occurrence"]["dtstart_utc"],
        "2025-10-27T16:00:00Z"
    );
}

#[tokio::test]
async fn test_cursor_walk_visits_every_event_once() {
    let app = app();
    let mut expected = HashSet::new();
    for i in 0..7 {
        let e = event(&format!("Event {i}"));
        expected.insert(e.id.to_string());
        // Pairs of events share a start to exercise the id tiebreak.
        app.store
            .insert_event(e, vec![at(now() + Duration::hours(i / 2 + 1), None)]);
    }

    let mut seen = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let mut uri = format!("/api/events?now={NOW}&limit=3");
        if let Some(cursor) = &cursor {
            uri.push_str(&format!("&cursor={cursor}"));
        }
        let body = get(&app.router, &uri).await.json();
        seen.extend(result_ids(&body));

        if body["data"]["hasMore"] == true {
            cursor = Some(body["data"]["nextCursor"].as_str().unwrap().to_string());
        } else {
            assert!(body["data"]["nextCursor"].is_null());
            break;
        }
    }

    assert_eq!(seen.len(), 7);
    assert_eq!(seen.iter().cloned().collect::<HashSet<_>>(), expected);
}

#[tokio::test]
async fn test_all_flag_skips_pagination() {
    let app = app();
    for i in 0..30 {
        app.store.insert_event(
            event(&format!("Event {i}")),
            vec![at(now() + Duration::minutes(i + 1), None)],
        );
    }

    let body = get(&app.router, &format!("/api/events?now={NOW}&all=true")).await.json();
    assert_eq!(result_ids(&body).len(), 30);
    assert_eq!(body["data"]["hasMore"], false);

    let body = get(&app.router, &format!("/api/events?now={NOW}")).await.json();
    assert_eq!(result_ids(&body).len(), 20);
    assert_eq!(body["data"]["hasMore"], true);
}

#[tokio::test]
async fn test_bad_cursor_and_limit_are_rejected() {
    let app = app();

    let res = get(&app.router, "/api/events?cursor=not-a-cursor").await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json()["error"]["code"], "INVALID_CURSOR");

    for limit in ["-5", "ten"] {
        let res = get(&app.router, &format!("/api/events?limit={limit}")).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.json()["error"]["code"], "INVALID_LIMIT");
    }

    let res = get(&app.router, "/api/events?limit=0&unknown=1").await;
    assert_eq!(res.status, StatusCode::OK);

    let res = get(&app.router, "/api/events?now=yesterday").await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json()["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_now_outside_calendar_range_is_rejected() {
    let app = app();
    for now in ["-262143-01-01", "0000-01-01"] {
        let res = get(&app.router, &format!("/api/events?now={now}")).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST, "now={now}");
        assert_eq!(res.json()["error"]["code"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn test_filters_are_combined() {
    let app = app();
    let start = vec![at(now() + Duration::days(1), None)];

    let mut pizza = event("Pizza Social");
    pizza.categories = vec!["Social".into(), "Food".into()];
    pizza.food = Some("Pizza".into());

    let mut paid_gala = event("Winter Gala");
    paid_gala.categories = vec!["Social".into()];
    paid_gala.price = Some(Decimal::new(2500, 2));
    paid_gala.registration = true;

    let mut hackathon = event("Hackathon");
    hackathon.categories = vec!["Tech".into()];
    hackathon.description = Some("Build something with friends".into());
    hackathon.school = Some("Laurier".into());

    for e in [&pizza, &paid_gala, &hackathon] {
        app.store.insert_event(e.clone(), start.clone());
    }

    let ids = |uri: String| {
        let router = app.router.clone();
        async move { result_ids(&get(&router, &uri).await.json()) }
    };

    assert_eq!(
        ids(format!("/api/events?now={NOW}&categories=Social&price=free")).await,
        vec![pizza.id.to_string()]
    );
    assert_eq!(
        ids(format!("/api/events?now={NOW}&categories=Tech,Food")).await.len(),
        2
    );
    assert_eq!(
        ids(format!("/api/events?now={NOW}&search=FRIENDS")).await,
        vec![hackathon.id.to_string()]
    );
    assert_eq!(
        ids(format!("/api/events?now={NOW}&registration=true")).await,
        vec![paid_gala.id.to_string()]
    );
    assert_eq!(
        ids(format!("/api/events?now={NOW}&food=true&is_free=true")).await,
        vec![pizza.id.to_string()]
    );
    assert_eq!(
        ids(format!("/api/events?now={NOW}&school=Laurier")).await,
        vec![hackathon.id.to_string()]
    );
}

#[tokio::test]
async fn test_category_match_all_is_configurable() {
    let config = Config::from_lookup(|key| (key == "CATEGORY_MATCH").then(|| "all".to_string()));
    let app = app_with(config);

    let mut both = event("Both");
    both.categories = vec!["Tech".into(), "Food".into()];
    let mut one = event("One");
    one.categories = vec!["Tech".into()];
    app.store
        .insert_event(both.clone(), vec![at(now() + Duration::days(1), None)]);
    app.store
        .insert_event(one, vec![at(now() + Duration::days(1), None)]);

    let body = get(&app.router, &format!("/api/events?now={NOW}&categories=Tech,Food"))
        .await
        .json();
    assert_eq!(result_ids(&body), vec![both.id.to_string()]);
}

#[tokio::test]
async fn test_get_event_by_id() {
    let app = app();
    let mut e = event("Career Fair");
    e.handles.ig_handle = Some("uwcareers".into());
    app.store.insert_event(
        e.clone(),
        vec![
            at(now() + Duration::days(2), None),
            at(now() - Duration::days(2), None),
        ],
    );

    let res = get(&app.router, &format!("/api/events/{}", e.id)).await;
    assert_eq!(res.status, StatusCode::OK);
    let body = res.json();
    assert_eq!(body["data"]["title"], "Career Fair");
    assert_eq!(body["data"]["display_handle"], "@uwcareers");
    assert_eq!(body["data"]["occurrences"].as_array().unwrap().len(), 2);
    assert_eq!(
        body["data"]["occurrences"][0]["dtstart_utc"],
        "2025-10-18T16:00:00Z"
    );
}

#[tokio::test]
async fn test_missing_hidden_or_malformed_ids_are_not_found() {
    let app = app();
    let mut pending = event("Pending");
    pending.status = EventStatus::Pending;
    app.store
        .insert_event(pending.clone(), vec![at(now() + Duration::days(1), None)]);
    let removed = event("Removed");
    app.store
        .insert_event(removed.clone(), vec![at(now() + Duration::days(1), None)]);
    app.store.remove_event(removed.id);

    for id in [
        pending.id.to_string(),
        removed.id.to_string(),
        uuid::Uuid::new_v4().to_string(),
        "not-a-uuid".to_string(),
    ] {
        let res = get(&app.router, &format!("/api/events/{id}")).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND, "id {id}");
        assert_eq!(res.json()["error"]["code"], "NOT_FOUND");
    }
}

#[tokio::test]
async fn test_submission_creates_pending_event() {
    let app = app();
    let res = post_json(
        &app.router,
        "/api/events/submit",
        json!({
            "submitted_by": "organizer@uwaterloo.ca",
            "title": "Robotics Demo",
            "location": "E7",
            "categories": ["Tech"],
            "occurrences": [{ "dtstart_utc": "2030-01-10T18:00:00Z", "duration_seconds": 3600 }]
        }),
    )
    .await;

    assert_eq!(res.status, StatusCode::CREATED);
    let body = res.json();
    assert_eq!(body["data"]["status"], "PENDING");
    assert_eq!(app.store.submissions().len(), 1);

    // Pending events stay out of public listings.
    let listing = get(&app.router, "/api/events").await.json();
    assert!(result_ids(&listing).is_empty());
}

#[tokio::test]
async fn test_invalid_submissions_are_rejected() {
    let app = app();

    let res = post_json(
        &app.router,
        "/api/events/submit",
        json!({
            "submitted_by": "organizer@uwaterloo.ca",
            "title": "No dates",
            "location": "E7",
            "occurrences": []
        }),
    )
    .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json()["error"]["code"], "VALIDATION_ERROR");

    let res = send(
        &app.router,
        Request::builder()
            .method("POST")
            .uri("/api/events/submit")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap(),
    )
    .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(app.store.submissions().is_empty());
}

#[tokio::test]
async fn test_submission_with_unrepresentable_duration_is_rejected() {
    let app = app();
    let res = post_json(
        &app.router,
        "/api/events/submit",
        json!({
            "submitted_by": "organizer@uwaterloo.ca",
            "title": "Forever Jam",
            "location": "SLC",
            "occurrences": [{ "dtstart_utc": "2030-01-10T18:00:00Z", "duration_seconds": 9000000000000i64 }]
        }),
    )
    .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json()["error"]["code"], "VALIDATION_ERROR");
    assert!(app.store.submissions().is_empty());
}

#[tokio::test]
async fn test_latest_update() {
    let app = app();
    let body = get(&app.router, "/api/events/latest-update").await.json();
    assert!(body["data"]["title"].is_null());

    let mut older = event("Older");
    older.added_at = Some(now() - Duration::days(3));
    let newer = event("Newer");
    app.store.insert_event(older, vec![]);
    app.store.insert_event(newer, vec![]);

    let body = get(&app.router, "/api/events/latest-update").await.json();
    assert_eq!(body["data"]["title"], "Newer");
    assert_eq!(body["data"]["added_at"], NOW);
}

#[tokio::test]
async fn test_root_health_and_security_headers() {
    let app = app();

    let res = get(&app.router, "/").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["data"]["name"], "Wat2Do API");

    let res = get(&app.router, "/health").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["data"]["status"], "ok");
    assert_eq!(res.headers["x-content-type-options"], "nosniff");
}

#[tokio::test]
async fn test_write_endpoints_are_rate_limited() {
    let config = Config {
        rate_limit_requests: 2,
        rate_limit_window: StdDuration::from_secs(60),
        ..Config::default()
    };
    let app = app_with(config);

    let subscribe = |email: &'static str, client: &'static str| {
        let router = app.router.clone();
        async move {
            send(
                &router,
                Request::builder()
                    .method("POST")
                    .uri("/api/newsletter/subscribe")
                    .header("content-type", "application/json")
                    .header("x-forwarded-for", client)
                    .body(Body::from(json!({ "email": email }).to_string()))
                    .unwrap(),
            )
            .await
        }
    };

    assert_eq!(subscribe("a@uw.ca", "198.51.100.1").await.status, StatusCode::CREATED);
    assert_eq!(subscribe("b@uw.ca", "198.51.100.1").await.status, StatusCode::CREATED);

    let res = subscribe("c@uw.ca", "198.51.100.1").await;
    assert_eq!(res.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(res.headers["retry-after"], "60");
    assert_eq!(res.json()["error"]["code"], "RATE_LIMITED");
    assert_eq!(res.json()["error"]["details"]["retryable"], true);

    assert_eq!(subscribe("c@uw.ca", "198.51.100.2").await.status, StatusCode::CREATED);

    // Reads are not limited.
    for _ in 0..5 {
        assert_eq!(get(&app.router, "/api/events").await.status, StatusCode::OK);
    }
}

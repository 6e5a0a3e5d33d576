use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;

use wat2do_server::config::Config;

use crate::common::{app, app_with, get, post_json, send};

async fn stats(router: &axum::Router, token: Option<&str>) -> crate::common::RawResponse {
    let mut request = Request::builder().uri("/api/waitlist/stats");
    if let Some(token) = token {
        request = request.header("x-admin-token", token);
    }
    send(router, request.body(Body::empty()).unwrap()).await
}

#[tokio::test]
async fn test_waitlist_join_and_duplicates() {
    let app = app();

    let res = post_json(
        &app.router,
        "/api/waitlist/join",
        json!({ "email": " Student@UWaterloo.ca ", "school": "Waterloo" }),
    )
    .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.json()["data"]["email"], "student@uwaterloo.ca");

    let res = post_json(
        &app.router,
        "/api/waitlist/join",
        json!({ "email": "student@uwaterloo.ca" }),
    )
    .await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.json()["error"]["code"], "CONFLICT");

    let res = post_json(&app.router, "/api/waitlist/join", json!({ "email": "nope" })).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_waitlist_stats_requires_admin_token() {
    let config = Config::from_lookup(|key| (key == "ADMIN_API_TOKEN").then(|| "let-me-in".to_string()));
    let app = app_with(config);
    for (email, school) in [("a@uw.ca", Some("Waterloo")), ("b@uw.ca", Some("Waterloo")), ("c@wlu.ca", None)] {
        let res = post_json(
            &app.router,
            "/api/waitlist/join",
            json!({ "email": email, "school": school }),
        )
        .await;
        assert_eq!(res.status, StatusCode::CREATED);
    }

    assert_eq!(stats(&app.router, None).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(stats(&app.router, Some("guess")).await.status, StatusCode::FORBIDDEN);

    let res = stats(&app.router, Some("let-me-in")).await;
    assert_eq!(res.status, StatusCode::OK);
    let body = res.json();
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["by_school"]["Waterloo"], 2);
    assert_eq!(body["data"]["by_school"]["unknown"], 1);
}

#[tokio::test]
async fn test_stats_forbidden_without_configured_token() {
    let app = app();
    assert_eq!(stats(&app.router, Some("anything")).await.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_newsletter_lifecycle() {
    let app = app();
    let body = json!({ "email": "Reader@Example.com" });

    let res = post_json(&app.router, "/api/newsletter/subscribe", body.clone()).await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.json()["data"]["email"], "reader@example.com");

    let res = post_json(&app.router, "/api/newsletter/subscribe", body.clone()).await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let res = post_json(&app.router, "/api/newsletter/unsubscribe", body.clone()).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["data"]["active"], false);

    let res = post_json(&app.router, "/api/newsletter/unsubscribe", body.clone()).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = post_json(&app.router, "/api/newsletter/subscribe", body).await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert!(res.json()["message"]
        .as_str()
        .unwrap()
        .contains("reactivated"));
}

#[tokio::test]
async fn test_unknown_email_cannot_unsubscribe() {
    let app = app();
    let res = post_json(
        &app.router,
        "/api/newsletter/unsubscribe",
        json!({ "email": "ghost@example.com" }),
    )
    .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = get(&app.router, "/api/newsletter/unsubscribe").await;
    assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);
}

use std::collections::HashSet;

use axum::http::StatusCode;
use uuid::Uuid;

use wat2do_server::models::Club;

use crate::common::{app, get, result_ids};

fn club(name: &str, categories: &[&str], club_type: Option<&str>) -> Club {
    Club {
        id: Uuid::new_v4(),
        club_name: name.to_string(),
        categories: categories.iter().map(|c| c.to_string()).collect(),
        club_page: None,
        ig: None,
        discord: None,
        club_type: club_type.map(str::to_string),
    }
}

#[tokio::test]
async fn test_clubs_paginate_by_id() {
    let app = app();
    let mut expected = HashSet::new();
    for i in 0..5 {
        let c = club(&format!("Club {i}"), &["Academic"], None);
        expected.insert(c.id.to_string());
        app.store.insert_club(c);
    }

    let first = get(&app.router, "/api/clubs?limit=3").await.json();
    assert_eq!(first["data"]["totalCount"], 5);
    assert_eq!(first["data"]["hasMore"], true);
    let cursor = first["data"]["nextCursor"].as_str().unwrap().to_string();

    let second = get(&app.router, &format!("/api/clubs?limit=3&cursor={cursor}"))
        .await
        .json();
    assert_eq!(second["data"]["hasMore"], false);

    let mut seen = result_ids(&first);
    seen.extend(result_ids(&second));
    assert_eq!(seen.len(), 5);
    assert_eq!(seen.into_iter().collect::<HashSet<_>>(), expected);
}

#[tokio::test]
async fn test_club_filters() {
    let app = app();
    let chess = club("Chess Club", &["Games"], Some("WUSA"));
    let robotics = club("Robotics Team", &["Engineering"], Some("Design Team"));
    app.store.insert_club(chess.clone());
    app.store.insert_club(robotics.clone());

    let body = get(&app.router, "/api/clubs?category=all").await.json();
    assert_eq!(result_ids(&body).len(), 2);

    let body = get(&app.router, "/api/clubs?category=Games").await.json();
    assert_eq!(result_ids(&body), vec![chess.id.to_string()]);

    let body = get(&app.router, "/api/clubs?search=ROBOT").await.json();
    assert_eq!(result_ids(&body), vec![robotics.id.to_string()]);

    let body = get(&app.router, "/api/clubs?club_type=WUSA").await.json();
    assert_eq!(result_ids(&body), vec![chess.id.to_string()]);
}

#[tokio::test]
async fn test_club_cursor_must_be_a_club_cursor() {
    let app = app();
    let res = get(&app.router, "/api/clubs?cursor=Zm9v").await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json()["error"]["code"], "INVALID_CURSOR");
}

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{clubs, events, health_check, newsletter, root, waitlist};
use crate::middleware::rate_limit;
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    let config = state.config.clone();

    // Write endpoints share the per-client request budget.
    let limited = Router::new()
        .route("/api/events/submit", post(events::submit_event))
        .route("/api/waitlist/join", post(waitlist::join_waitlist))
        .route("/api/newsletter/subscribe", post(newsletter::subscribe))
        .route("/api/newsletter/unsubscribe", post(newsletter::unsubscribe))
        .route_layer(from_fn_with_state(state.rate_limiter.clone(), rate_limit));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/rss.xml", get(events::rss_feed))
        .route("/api/events", get(events::list_events))
        .route("/api/events/latest-update", get(events::latest_update))
        .route("/api/events/export/ics", get(events::export_ics))
        .route(
            "/api/events/google-calendar-urls",
            get(events::google_calendar_urls),
        )
        .route("/api/events/:id", get(events::get_event))
        .route("/api/clubs", get(clubs::list_clubs))
        .route("/api/waitlist/stats", get(waitlist::waitlist_stats))
        .merge(limited)
        .with_state(state)
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer(config.is_production()))
        .layer(create_cors_layer(config.cors_allowed_origins.as_deref()))
}

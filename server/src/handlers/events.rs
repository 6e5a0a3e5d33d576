use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::json_body;
use crate::export::{gcal, ics, parse_id_list, rss};
use crate::index::{EventListQuery, ExportScope};
use crate::models::{EventStatus, SubmitEventRequest};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, document, success};

#[derive(Debug, Deserialize)]
pub struct IdsQuery {
    pub ids: Option<String>,
}

#[derive(Serialize)]
struct LatestUpdate {
    added_at: Option<DateTime<Utc>>,
    title: Option<String>,
}

#[derive(Serialize)]
struct SubmissionReceipt {
    submission_id: Uuid,
    event_id: Uuid,
    status: EventStatus,
}

pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventListQuery>,
) -> Result<Response, AppError> {
    let request = state.index.parse_query(query)?;
    let page = state.index.query(request).await?;
    Ok(success(page, "Events retrieved successfully"))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| AppError::NotFound(format!("Event '{id}' was not found")))?;
    let detail = state.index.get_by_id(id).await?;
    Ok(success(detail, "Event retrieved successfully"))
}

pub async fn latest_update(State(state): State<AppState>) -> Result<Response, AppError> {
    let latest = state.events.latest_confirmed().await?;
    let payload = LatestUpdate {
        added_at: latest
            .as_ref()
            .map(|event| event.added_at.unwrap_or(event.created_at)),
        title: latest.map(|event| event.title),
    };
    Ok(success(payload, "Latest update retrieved successfully"))
}

pub async fn submit_event(
    State(state): State<AppState>,
    payload: Result<Json<SubmitEventRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let new_event = json_body(payload)?.validate()?;
    let submission = state.events.create_submission(new_event).await?;

    info!(
        submission_id = %submission.id,
        event_id = %submission.created_event_id,
        "Event submitted for review"
    );

    let receipt = SubmissionReceipt {
        submission_id: submission.id,
        event_id: submission.created_event_id,
        status: EventStatus::Pending,
    };
    Ok(created(receipt, "Event submitted for review"))
}

pub async fn export_ics(
    State(state): State<AppState>,
    Query(query): Query<IdsQuery>,
) -> Result<Response, AppError> {
    let ids = parse_id_list(query.ids.as_deref())?;
    let now = Utc::now();
    let entries = state.index.export_window(ExportScope::Ids(ids), now).await?;

    let body = ics::render_calendar(
        &entries,
        state.config.live_window().grace(),
        &state.config.site_url,
        now,
    );
    Ok(document(ics::CONTENT_TYPE, body))
}

pub async fn google_calendar_urls(
    State(state): State<AppState>,
    Query(query): Query<IdsQuery>,
) -> Result<Response, AppError> {
    let ids = parse_id_list(query.ids.as_deref())?;
    let entries = state
        .index
        .export_window(ExportScope::Ids(ids), Utc::now())
        .await?;

    let links = gcal::calendar_links(&entries, state.config.live_window().grace());
    Ok(success(links, "Google Calendar URLs generated successfully"))
}

pub async fn rss_feed(State(state): State<AppState>) -> Result<Response, AppError> {
    let now = Utc::now();
    let entries = state
        .index
        .export_window(ExportScope::Upcoming(state.config.rss_item_count), now)
        .await?;

    Ok(document(
        rss::CONTENT_TYPE,
        rss::render_feed(&entries, &state.config.site_url, now),
    ))
}

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::Json;
use tracing::info;

use super::json_body;
use crate::models::waitlist::JoinWaitlistRequest;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Checks the admin token header against the configured token.
pub fn authorize_admin(headers: &HeaderMap, configured: Option<&str>) -> Result<(), AppError> {
    let provided = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::AuthError("Missing admin token".to_string()))?;

    match configured {
        Some(expected) if expected == provided => Ok(()),
        _ => Err(AppError::Forbidden("Invalid admin token".to_string())),
    }
}

pub async fn join_waitlist(
    State(state): State<AppState>,
    payload: Result<Json<JoinWaitlistRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let entry = json_body(payload)?.into_entry()?;
    let entry = state.signups.join_waitlist(entry).await?;

    info!(entry_id = %entry.id, school = ?entry.school, "Waitlist entry created");
    Ok(created(entry, "Successfully joined the waitlist"))
}

pub async fn waitlist_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    authorize_admin(&headers, state.config.admin_api_token.as_deref())?;
    let stats = state.signups.waitlist_stats().await?;
    Ok(success(stats, "Waitlist stats retrieved successfully"))
}

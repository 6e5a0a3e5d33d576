use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::Serialize;

use super::json_body;
use crate::models::newsletter::NewsletterRequest;
use crate::state::AppState;
use crate::store::SubscribeOutcome;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Serialize)]
struct Subscription {
    email: String,
    active: bool,
}

pub async fn subscribe(
    State(state): State<AppState>,
    payload: Result<Json<NewsletterRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let email = json_body(payload)?.normalized_email()?;
    let outcome = state.signups.subscribe(&email).await?;

    let message = match outcome {
        SubscribeOutcome::Created => "Successfully subscribed to the newsletter",
        SubscribeOutcome::Reactivated => "Welcome back! Your subscription has been reactivated",
    };
    Ok(created(Subscription { email, active: true }, message))
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    payload: Result<Json<NewsletterRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let email = json_body(payload)?.normalized_email()?;
    let subscriber = state.signups.unsubscribe(&email).await?;

    Ok(success(
        Subscription {
            email: subscriber.email,
            active: subscriber.active,
        },
        "Successfully unsubscribed from the newsletter",
    ))
}

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::utils::error::AppError;

pub mod clubs;
pub mod events;
pub mod newsletter;
pub mod service;
pub mod waitlist;

pub use service::{health_check, root};

/// Unwraps a JSON body, reporting malformed input as a validation error.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::ValidationError(rejection.body_text()))
}

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Too many requests")]
    RateLimited,

    #[error("Storage unavailable")]
    StorageUnavailable(sqlx::Error),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidCursor(_)
            | AppError::InvalidLimit(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::InvalidCursor(_) => "INVALID_CURSOR",
            AppError::InvalidLimit(_) => "INVALID_LIMIT",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::RateLimited => "RATE_LIMITED",
            AppError::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::StorageUnavailable(_) | AppError::RateLimited)
    }

    fn log(&self) {
        match self {
            AppError::ValidationError(msg)
            | AppError::InvalidCursor(msg)
            | AppError::InvalidLimit(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => {
                warn!(code = self.code(), message = %msg, "Request rejected");
            }
            AppError::RateLimited => {
                warn!(code = self.code(), "Rate limit exceeded");
            }
            AppError::InternalServerError(msg) => {
                error!(error = ?self, message = %msg, "Application error");
            }
            AppError::StorageUnavailable(e) => {
                error!(error = ?e, "Storage error");
            }
        }
    }
}

/// Connection-level failures are outages; anything else the database reports
/// (decode errors, constraint violations, missing rows) is a server bug.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if is_outage(&err) {
            AppError::StorageUnavailable(err)
        } else {
            AppError::InternalServerError(format!("database error: {err}"))
        }
    }
}

fn is_outage(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        self.log();

        // Only expose high-level message to the client
        let public_message = match &self {
            AppError::ValidationError(msg)
            | AppError::InvalidCursor(msg)
            | AppError::InvalidLimit(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::RateLimited => "Rate limit exceeded".to_string(),
            AppError::StorageUnavailable(_) => {
                "The data store is temporarily unavailable".to_string()
            }
            AppError::InternalServerError(_) => "An internal error occurred".to_string(),
        };

        let details = if self.is_retryable() {
            Some(serde_json::json!({ "retryable": true }))
        } else {
            None
        };

        error_response(code, public_message, details, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_map_to_4xx() {
        assert_eq!(
            AppError::InvalidCursor("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::InvalidLimit("-1".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("event".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::RateLimited.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_storage_errors_are_retryable() {
        let err = AppError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code(), "STORAGE_UNAVAILABLE");
        assert!(err.is_retryable());
        assert!(!AppError::ValidationError("x".into()).is_retryable());
    }

    #[test]
    fn test_non_outage_database_errors_are_internal() {
        let err = AppError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.is_retryable());

        let err = AppError::from(sqlx::Error::ColumnNotFound("status".into()));
        assert_eq!(err.code(), "INTERNAL_SERVER_ERROR");

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(AppError::from(sqlx::Error::Io(io)).is_retryable());
    }
}

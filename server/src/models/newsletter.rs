use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::error::AppError;
use crate::utils::validation::normalize_email;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct NewsletterSubscriber {
    pub id: Uuid,
    pub email: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of the subscribe and unsubscribe endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct NewsletterRequest {
    pub email: String,
}

impl NewsletterRequest {
    pub fn normalized_email(&self) -> Result<String, AppError> {
        normalize_email(&self.email)
            .ok_or_else(|| AppError::ValidationError("a valid email is required".to_string()))
    }
}

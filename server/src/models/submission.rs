use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::event::{NewOccurrence, SocialHandles};
use crate::utils::error::AppError;
use crate::utils::validation::{clean_optional, is_valid_url, normalize_email};

/// Body of `POST /api/events/submit`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitEventRequest {
    pub submitted_by: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub location: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub registration: bool,
    #[serde(default)]
    pub food: Option<String>,
    #[serde(default)]
    pub club_type: Option<String>,
    #[serde(default)]
    pub school: Option<String>,
    #[serde(flatten)]
    pub handles: SocialHandles,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub source_image_url: Option<String>,
    #[serde(default)]
    pub occurrences: Vec<NewOccurrence>,
}

/// A validated submission, ready to be persisted as a `PENDING` event.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub submitted_by: String,
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub categories: Vec<String>,
    pub price: Option<Decimal>,
    pub registration: bool,
    pub food: Option<String>,
    pub club_type: Option<String>,
    pub school: Option<String>,
    pub handles: SocialHandles,
    pub source_url: Option<String>,
    pub source_image_url: Option<String>,
    pub occurrences: Vec<NewOccurrence>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventSubmission {
    pub id: Uuid,
    pub submitted_by: String,
    pub submitted_at: DateTime<Utc>,
    pub created_event_id: Uuid,
}

impl SubmitEventRequest {
    pub fn validate(self) -> Result<NewEvent, AppError> {
        let submitted_by = normalize_email(&self.submitted_by).ok_or_else(|| {
            AppError::ValidationError("submitted_by must be a valid email".to_string())
        })?;

        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::ValidationError("title is required".to_string()));
        }

        let location = self.location.trim().to_string();
        if location.is_empty() {
            return Err(AppError::ValidationError("location is required".to_string()));
        }

        if self.price.is_some_and(|p| p.is_sign_negative()) {
            return Err(AppError::ValidationError(
                "price cannot be negative".to_string(),
            ));
        }

        let source_url = clean_optional(self.source_url);
        let source_image_url = clean_optional(self.source_image_url);
        for (field, value) in [
            ("source_url", &source_url),
            ("source_image_url", &source_image_url),
        ] {
            if let Some(url) = value {
                if !is_valid_url(url) {
                    return Err(AppError::ValidationError(format!(
                        "{field} must be an http(s) URL"
                    )));
                }
            }
        }

        if self.occurrences.is_empty() {
            return Err(AppError::ValidationError(
                "at least one occurrence is required".to_string(),
            ));
        }
        let occurrences = self
            .occurrences
            .into_iter()
            .map(NewOccurrence::validate)
            .collect::<Result<Vec<_>, _>>()?;

        let mut categories: Vec<String> = Vec::with_capacity(self.categories.len());
        for category in self.categories {
            let category = category.trim().to_string();
            if !category.is_empty() && !categories.contains(&category) {
                categories.push(category);
            }
        }

        let handles = SocialHandles {
            ig_handle: clean_optional(self.handles.ig_handle),
            discord_handle: clean_optional(self.handles.discord_handle),
            x_handle: clean_optional(self.handles.x_handle),
            tiktok_handle: clean_optional(self.handles.tiktok_handle),
            fb_handle: clean_optional(self.handles.fb_handle),
            other_handle: clean_optional(self.handles.other_handle),
        };

        Ok(NewEvent {
            submitted_by,
            title,
            description: clean_optional(self.description),
            location,
            categories,
            price: self.price,
            registration: self.registration,
            food: clean_optional(self.food),
            club_type: clean_optional(self.club_type),
            school: clean_optional(self.school),
            handles,
            source_url,
            source_image_url,
            occurrences,
        })
    }
}

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::error::AppError;
use crate::utils::validation::{clean_optional, normalize_email};

#[derive(Debug, Clone, Serialize)]
pub struct WaitlistEntry {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub school: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /api/waitlist/join`.
#[derive(Debug, Clone, Deserialize)]
pub struct JoinWaitlistRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub school: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl JoinWaitlistRequest {
    pub fn into_entry(self) -> Result<WaitlistEntry, AppError> {
        let email = normalize_email(&self.email)
            .ok_or_else(|| AppError::ValidationError("a valid email is required".to_string()))?;

        Ok(WaitlistEntry {
            id: Uuid::new_v4(),
            email,
            name: clean_optional(self.name),
            school: clean_optional(self.school),
            metadata: serde_json::Value::Object(self.metadata.unwrap_or_default()),
            created_at: Utc::now(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WaitlistStats {
    pub total: i64,
    pub by_school: BTreeMap<String, i64>,
}

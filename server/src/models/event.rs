use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Pending,
    Confirmed,
    Rejected,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "PENDING",
            EventStatus::Confirmed => "CONFIRMED",
            EventStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(EventStatus::Pending),
            "CONFIRMED" => Ok(EventStatus::Confirmed),
            "REJECTED" => Ok(EventStatus::Rejected),
            other => Err(AppError::InternalServerError(format!(
                "unknown event status '{other}'"
            ))),
        }
    }
}

/// Social channels an organizer can be reached through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialHandles {
    pub ig_handle: Option<String>,
    pub discord_handle: Option<String>,
    pub x_handle: Option<String>,
    pub tiktok_handle: Option<String>,
    pub fb_handle: Option<String>,
    pub other_handle: Option<String>,
}

impl SocialHandles {
    /// First non-empty handle in priority order IG, Discord, X, TikTok, FB, other.
    /// IG, X and TikTok handles are shown with a leading `@`.
    pub fn display_handle(&self) -> Option<String> {
        let candidates = [
            (&self.ig_handle, true),
            (&self.discord_handle, false),
            (&self.x_handle, true),
            (&self.tiktok_handle, true),
            (&self.fb_handle, false),
            (&self.other_handle, false),
        ];

        candidates.into_iter().find_map(|(handle, at_prefixed)| {
            let handle = handle.as_deref()?.trim();
            if handle.is_empty() {
                None
            } else if at_prefixed {
                Some(format!("@{}", handle.trim_start_matches('@')))
            } else {
                Some(handle.to_string())
            }
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub categories: Vec<String>,
    pub status: EventStatus,
    pub price: Option<Decimal>,
    pub registration: bool,
    pub food: Option<String>,
    pub club_type: Option<String>,
    pub school: Option<String>,
    #[serde(flatten)]
    pub handles: SocialHandles,
    pub source_url: Option<String>,
    pub source_image_url: Option<String>,
    pub added_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn is_free(&self) -> bool {
        self.price.map_or(true, |p| p.is_zero())
    }

    pub fn has_food(&self) -> bool {
        self.food.as_deref().is_some_and(|f| !f.is_empty())
    }
}

/// One scheduled instance of an event. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Occurrence {
    pub id: Uuid,
    pub event_id: Uuid,
    pub dtstart_utc: DateTime<Utc>,
    pub dtend_utc: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    pub tz: Option<String>,
}

impl Occurrence {
    /// The explicit end, or start plus duration when only a duration is known.
    /// A duration reaching past the representable range ends at the latest
    /// representable instant.
    pub fn effective_end(&self) -> Option<DateTime<Utc>> {
        self.dtend_utc.or_else(|| {
            self.duration_seconds.map(|secs| {
                end_after(self.dtstart_utc, secs).unwrap_or(DateTime::<Utc>::MAX_UTC)
            })
        })
    }
}

/// `start + secs`, or `None` when the result is not representable.
fn end_after(start: DateTime<Utc>, secs: i64) -> Option<DateTime<Utc>> {
    Duration::try_seconds(secs).and_then(|duration| start.checked_add_signed(duration))
}

/// Occurrence input prior to validation.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOccurrence {
    pub dtstart_utc: DateTime<Utc>,
    #[serde(default)]
    pub dtend_utc: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_seconds: Option<i64>,
    #[serde(default)]
    pub tz: Option<String>,
}

impl NewOccurrence {
    /// Checks the start/end/duration invariant. A lone duration is turned into
    /// an explicit end; an end and duration that disagree are rejected.
    pub fn validate(mut self) -> Result<Self, AppError> {
        if let Some(secs) = self.duration_seconds {
            if secs < 0 {
                return Err(AppError::ValidationError(
                    "occurrence duration cannot be negative".to_string(),
                ));
            }
        }

        if let Some(secs) = self.duration_seconds {
            let derived = end_after(self.dtstart_utc, secs).ok_or_else(|| {
                AppError::ValidationError("occurrence duration is out of range".to_string())
            })?;
            match self.dtend_utc {
                Some(end) if end != derived => {
                    return Err(AppError::ValidationError(
                        "occurrence end does not match start plus duration".to_string(),
                    ));
                }
                Some(_) => {}
                None => self.dtend_utc = Some(derived),
            }
        }

        if let Some(end) = self.dtend_utc {
            if end < self.dtstart_utc {
                return Err(AppError::ValidationError(
                    "occurrence cannot end before it starts".to_string(),
                ));
            }
        }

        self.tz = self
            .tz
            .map(|tz| tz.trim().to_string())
            .filter(|tz| !tz.is_empty());

        Ok(self)
    }

    pub fn into_occurrence(self, event_id: Uuid) -> Occurrence {
        Occurrence {
            id: Uuid::new_v4(),
            event_id,
            dtstart_utc: self.dtstart_utc,
            dtend_utc: self.dtend_utc,
            duration_seconds: self.duration_seconds,
            tz: self.tz,
        }
    }
}

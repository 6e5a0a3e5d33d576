//! Opaque pagination tokens.
//!
//! Event cursors encode the last returned `(relevant_start, event_id)` pair,
//! club cursors the last returned club id. Tokens are URL-safe base64 of a
//! plain text payload. Timestamps are kept at microsecond precision, the
//! same resolution PostgreSQL stores, so cursor order matches database order.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, DurationRound, Utc};
use uuid::Uuid;

use crate::utils::error::AppError;

/// Drops sub-microsecond precision.
pub fn to_storage_precision(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.duration_trunc(Duration::microseconds(1)).unwrap_or(dt)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventCursor {
    pub start: DateTime<Utc>,
    pub event_id: Uuid,
}

impl EventCursor {
    pub fn new(start: DateTime<Utc>, event_id: Uuid) -> Self {
        Self {
            start: to_storage_precision(start),
            event_id,
        }
    }

    pub fn encode(&self) -> String {
        encode_token(&format!(
            "{}:{}",
            self.start.timestamp_micros(),
            self.event_id.hyphenated()
        ))
    }

    pub fn decode(token: &str) -> Result<Self, AppError> {
        let payload = decode_token(token)?;
        let (micros, id) = payload
            .split_once(':')
            .ok_or_else(|| invalid("missing separator"))?;

        let micros: i64 = micros.parse().map_err(|_| invalid("bad timestamp"))?;
        let start = DateTime::from_timestamp_micros(micros)
            .ok_or_else(|| invalid("timestamp out of range"))?;
        let event_id = Uuid::parse_str(id).map_err(|_| invalid("bad event id"))?;

        let cursor = Self::new(start, event_id);
        ensure_canonical(token, &cursor.encode())?;
        Ok(cursor)
    }

    /// Whether a row at `(start, event_id)` sorts strictly after this cursor.
    pub fn precedes(&self, start: DateTime<Utc>, event_id: Uuid) -> bool {
        (self.start, self.event_id) < (start, event_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClubCursor {
    pub club_id: Uuid,
}

impl ClubCursor {
    pub fn encode(&self) -> String {
        encode_token(&self.club_id.hyphenated().to_string())
    }

    pub fn decode(token: &str) -> Result<Self, AppError> {
        let payload = decode_token(token)?;
        let club_id = Uuid::parse_str(&payload).map_err(|_| invalid("bad club id"))?;
        let cursor = Self { club_id };
        ensure_canonical(token, &cursor.encode())?;
        Ok(cursor)
    }
}

fn encode_token(payload: &str) -> String {
    URL_SAFE_NO_PAD.encode(payload.as_bytes())
}

fn decode_token(token: &str) -> Result<String, AppError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(token.trim())
        .map_err(|_| invalid("not base64"))?;
    String::from_utf8(bytes).map_err(|_| invalid("not utf-8"))
}

/// Only the exact token we would have produced is accepted.
fn ensure_canonical(token: &str, reencoded: &str) -> Result<(), AppError> {
    if token.trim() == reencoded {
        Ok(())
    } else {
        Err(invalid("non-canonical encoding"))
    }
}

fn invalid(reason: &str) -> AppError {
    AppError::InvalidCursor(format!("cursor could not be decoded ({reason})"))
}

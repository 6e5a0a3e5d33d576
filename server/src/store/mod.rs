//! Storage adapter.
//!
//! The traits here are the only way the rest of the service reads or writes
//! persistent data. Implementations only ever return live rows: tombstoned
//! (soft-deleted) events, their occurrences and deleted clubs never cross
//! this boundary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::index::cursor::EventCursor;
use crate::index::filter::{ClubFilter, EventFilter};
use crate::models::{
    Club, Event, EventSubmission, NewEvent, NewsletterSubscriber, Occurrence, WaitlistEntry,
    WaitlistStats,
};
use crate::utils::error::AppError;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// One ranked read of confirmed events.
#[derive(Debug, Clone)]
pub struct CandidateQuery<'a> {
    pub filter: &'a EventFilter,
    pub now: DateTime<Utc>,
    /// Earliest start an end-less occurrence may have and still count as live.
    pub grace_floor: DateTime<Utc>,
    pub after: Option<EventCursor>,
    /// Maximum rows to return, including any look-ahead row.
    pub fetch: usize,
}

/// A confirmed event paired with the start of its relevant occurrence.
#[derive(Debug, Clone)]
pub struct RankedRow {
    pub event: Event,
    pub relevant_start: DateTime<Utc>,
}

impl RankedRow {
    pub fn cursor(&self) -> EventCursor {
        EventCursor::new(self.relevant_start, self.event.id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CandidatePage {
    /// Rows strictly after the cursor, ascending by `(relevant_start, id)`.
    pub rows: Vec<RankedRow>,
    /// Qualifying events across all pages. `None` when a cursor is past the
    /// last qualifying event, since no row carries the count.
    pub total_count: Option<i64>,
}

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Confirmed events matching the filter that have a live or upcoming
    /// occurrence, ordered by `(relevant_start, id)`.
    async fn ranked_events(&self, query: CandidateQuery<'_>) -> Result<CandidatePage, AppError>;

    /// All occurrences of the given events in one batched read, ordered by
    /// event, then start, then id.
    async fn occurrences_for(&self, event_ids: &[Uuid]) -> Result<Vec<Occurrence>, AppError>;

    async fn confirmed_event(&self, id: Uuid) -> Result<Option<Event>, AppError>;

    async fn confirmed_events_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Event>, AppError>;

    /// Most recently added confirmed event.
    async fn latest_confirmed(&self) -> Result<Option<Event>, AppError>;

    /// Persists a pending event, its occurrences and the submission record
    /// atomically.
    async fn create_submission(&self, event: NewEvent) -> Result<EventSubmission, AppError>;

    async fn ping(&self) -> Result<(), AppError>;
}

#[derive(Debug, Clone, Default)]
pub struct ClubPage {
    pub clubs: Vec<Club>,
    pub total_count: i64,
}

#[async_trait]
pub trait ClubStore: Send + Sync {
    /// Clubs with id strictly greater than `after`, ascending by id.
    async fn club_page(
        &self,
        filter: &ClubFilter,
        after: Option<Uuid>,
        fetch: usize,
    ) -> Result<ClubPage, AppError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Created,
    Reactivated,
}

#[async_trait]
pub trait SignupStore: Send + Sync {
    /// Fails with `Conflict` when the email is already on the waitlist.
    async fn join_waitlist(&self, entry: WaitlistEntry) -> Result<WaitlistEntry, AppError>;

    async fn waitlist_stats(&self) -> Result<WaitlistStats, AppError>;

    /// Fails with `Conflict` when the email is already actively subscribed.
    async fn subscribe(&self, email: &str) -> Result<SubscribeOutcome, AppError>;

    /// Fails with `NotFound` when the email has no active subscription.
    async fn unsubscribe(&self, email: &str) -> Result<NewsletterSubscriber, AppError>;
}

//! In-process store used when no database is configured, and by tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{
    CandidatePage, CandidateQuery, ClubPage, ClubStore, EventStore, RankedRow, SignupStore,
    SubscribeOutcome,
};
use crate::index::cursor::to_storage_precision;
use crate::index::filter::ClubFilter;
use crate::index::relevance::LiveWindow;
use crate::models::{
    Club, Event, EventStatus, EventSubmission, NewEvent, NewOccurrence, NewsletterSubscriber,
    Occurrence, WaitlistEntry, WaitlistStats,
};
use crate::utils::error::AppError;

struct StoredEvent {
    event: Event,
    deleted: bool,
}

#[derive(Default)]
struct Inner {
    events: HashMap<Uuid, StoredEvent>,
    occurrences: Vec<Occurrence>,
    submissions: Vec<EventSubmission>,
    clubs: BTreeMap<Uuid, Club>,
    waitlist: Vec<WaitlistEntry>,
    subscribers: HashMap<String, NewsletterSubscriber>,
}

impl Inner {
    fn put_event(&mut self, event: Event, occurrences: impl IntoIterator<Item = Occurrence>) {
        self.occurrences.extend(occurrences);
        self.events.insert(
            event.id,
            StoredEvent {
                event,
                deleted: false,
            },
        );
    }

    fn visible_event(&self, id: &Uuid) -> Option<&Event> {
        self.events
            .get(id)
            .filter(|stored| !stored.deleted && stored.event.status == EventStatus::Confirmed)
            .map(|stored| &stored.event)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

fn storage_occurrences(event_id: Uuid, occurrences: Vec<NewOccurrence>) -> Vec<Occurrence> {
    occurrences
        .into_iter()
        .map(|new| {
            let mut occurrence = new.into_occurrence(event_id);
            occurrence.dtstart_utc = to_storage_precision(occurrence.dtstart_utc);
            occurrence.dtend_utc = occurrence.dtend_utc.map(to_storage_precision);
            occurrence
        })
        .collect()
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores an event as-is along with its occurrences. Timestamps are
    /// truncated to microseconds, matching what PostgreSQL would keep.
    pub fn insert_event(&self, event: Event, occurrences: Vec<NewOccurrence>) -> Vec<Occurrence> {
        let stored = storage_occurrences(event.id, occurrences);
        self.write().put_event(event, stored.iter().cloned());
        stored
    }

    /// Tombstones an event. Its occurrences stay but are never returned.
    pub fn remove_event(&self, id: Uuid) -> bool {
        match self.write().events.get_mut(&id) {
            Some(stored) => {
                stored.deleted = true;
                true
            }
            None => false,
        }
    }

    pub fn set_status(&self, id: Uuid, status: EventStatus) -> bool {
        match self.write().events.get_mut(&id) {
            Some(stored) => {
                stored.event.status = status;
                stored.event.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    pub fn insert_club(&self, club: Club) {
        self.write().clubs.insert(club.id, club);
    }

    pub fn submissions(&self) -> Vec<EventSubmission> {
        self.read().submissions.clone()
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn ranked_events(&self, query: CandidateQuery<'_>) -> Result<CandidatePage, AppError> {
        let window = LiveWindow::new(query.now - query.grace_floor);
        let inner = self.read();

        let mut by_event: HashMap<Uuid, Vec<&Occurrence>> = HashMap::new();
        for occurrence in &inner.occurrences {
            by_event
                .entry(occurrence.event_id)
                .or_default()
                .push(occurrence);
        }

        let mut ranked: Vec<RankedRow> = inner
            .events
            .values()
            .filter(|stored| {
                !stored.deleted
                    && stored.event.status == EventStatus::Confirmed
                    && query.filter.matches(&stored.event)
            })
            .filter_map(|stored| {
                let occurrences = by_event.get(&stored.event.id)?;
                let relevant = window.relevant_occurrence(occurrences.iter().copied(), query.now)?;
                Some(RankedRow {
                    event: stored.event.clone(),
                    relevant_start: relevant.dtstart_utc,
                })
            })
            .collect();

        ranked.sort_by_key(|row| (row.relevant_start, row.event.id));
        let matching = i64::try_from(ranked.len()).ok();

        let rows: Vec<RankedRow> = ranked
            .into_iter()
            .filter(|row| {
                query
                    .after
                    .map_or(true, |cursor| cursor.precedes(row.relevant_start, row.event.id))
            })
            .take(query.fetch)
            .collect();

        let total_count = if rows.is_empty() && query.after.is_some() {
            None
        } else {
            matching
        };
        Ok(CandidatePage { rows, total_count })
    }

    async fn occurrences_for(&self, event_ids: &[Uuid]) -> Result<Vec<Occurrence>, AppError> {
        let wanted: HashSet<&Uuid> = event_ids.iter().collect();
        let inner = self.read();

        let mut occurrences: Vec<Occurrence> = inner
            .occurrences
            .iter()
            .filter(|o| wanted.contains(&o.event_id))
            .filter(|o| inner.events.get(&o.event_id).is_some_and(|e| !e.deleted))
            .cloned()
            .collect();
        occurrences.sort_by_key(|o| (o.event_id, o.dtstart_utc, o.id));
        Ok(occurrences)
    }

    async fn confirmed_event(&self, id: Uuid) -> Result<Option<Event>, AppError> {
        Ok(self.read().visible_event(&id).cloned())
    }

    async fn confirmed_events_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Event>, AppError> {
        let inner = self.read();
        let mut seen = HashSet::new();
        Ok(ids
            .iter()
            .filter(|id| seen.insert(**id))
            .filter_map(|id| inner.visible_event(id).cloned())
            .collect())
    }

    async fn latest_confirmed(&self) -> Result<Option<Event>, AppError> {
        let inner = self.read();
        Ok(inner
            .events
            .values()
            .filter(|stored| !stored.deleted && stored.event.status == EventStatus::Confirmed)
            .map(|stored| &stored.event)
            .max_by_key(|event| (event.added_at.unwrap_or(event.created_at), event.id))
            .cloned())
    }

    async fn create_submission(&self, new: NewEvent) -> Result<EventSubmission, AppError> {
        let now = to_storage_precision(Utc::now());
        let event = Event {
            id: Uuid::new_v4(),
            title: new.title,
            description: new.description,
            location: Some(new.location),
            categories: new.categories,
            status: EventStatus::Pending,
            price: new.price,
            registration: new.registration,
            food: new.food,
            club_type: new.club_type,
            school: new.school,
            handles: new.handles,
            source_url: new.source_url,
            source_image_url: new.source_image_url,
            added_at: Some(now),
            created_at: now,
            updated_at: now,
        };
        let submission = EventSubmission {
            id: Uuid::new_v4(),
            submitted_by: new.submitted_by,
            submitted_at: now,
            created_event_id: event.id,
        };

        let occurrences = storage_occurrences(event.id, new.occurrences);
        let mut inner = self.write();
        inner.put_event(event, occurrences);
        inner.submissions.push(submission.clone());
        Ok(submission)
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[async_trait]
impl ClubStore for MemoryStore {
    async fn club_page(
        &self,
        filter: &ClubFilter,
        after: Option<Uuid>,
        fetch: usize,
    ) -> Result<ClubPage, AppError> {
        let inner = self.read();
        let matching: Vec<&Club> = inner.clubs.values().filter(|c| filter.matches(c)).collect();

        Ok(ClubPage {
            total_count: i64::try_from(matching.len()).unwrap_or(i64::MAX),
            clubs: matching
                .into_iter()
                .filter(|club| after.map_or(true, |after| club.id > after))
                .take(fetch)
                .cloned()
                .collect(),
        })
    }
}

#[async_trait]
impl SignupStore for MemoryStore {
    async fn join_waitlist(&self, entry: WaitlistEntry) -> Result<WaitlistEntry, AppError> {
        let mut inner = self.write();
        if inner.waitlist.iter().any(|e| e.email == entry.email) {
            return Err(AppError::Conflict(
                "This email is already on the waitlist".to_string(),
            ));
        }
        inner.waitlist.push(entry.clone());
        Ok(entry)
    }

    async fn waitlist_stats(&self) -> Result<WaitlistStats, AppError> {
        let inner = self.read();
        let mut stats = WaitlistStats::default();
        for entry in &inner.waitlist {
            let school = entry.school.as_deref().unwrap_or("unknown");
            *stats.by_school.entry(school.to_string()).or_default() += 1;
            stats.total += 1;
        }
        Ok(stats)
    }

    async fn subscribe(&self, email: &str) -> Result<SubscribeOutcome, AppError> {
        let now = Utc::now();
        let mut inner = self.write();

        match inner.subscribers.get_mut(email) {
            Some(existing) if existing.active => Err(AppError::Conflict(
                "This email is already subscribed".to_string(),
            )),
            Some(existing) => {
                existing.active = true;
                existing.updated_at = now;
                Ok(SubscribeOutcome::Reactivated)
            }
            None => {
                inner.subscribers.insert(
                    email.to_string(),
                    NewsletterSubscriber {
                        id: Uuid::new_v4(),
                        email: email.to_string(),
                        active: true,
                        created_at: now,
                        updated_at: now,
                    },
                );
                Ok(SubscribeOutcome::Created)
            }
        }
    }

    async fn unsubscribe(&self, email: &str) -> Result<NewsletterSubscriber, AppError> {
        let mut inner = self.write();
        let subscriber = inner
            .subscribers
            .get_mut(email)
            .filter(|s| s.active)
            .ok_or_else(|| AppError::NotFound("No active subscription for this email".to_string()))?;

        subscriber.active = false;
        subscriber.updated_at = Utc::now();
        Ok(subscriber.clone())
    }
}

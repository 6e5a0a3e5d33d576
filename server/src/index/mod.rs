//! Event Occurrence Index.
//!
//! Answers "which confirmed events have an occurrence that is live or
//! upcoming", ordered by the start of that occurrence with the event id as
//! tiebreak, filtered and paginated with opaque cursors. Each listing is
//! one ranked read of events plus one batched read of their occurrences.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::models::{Event, Occurrence};
use crate::store::{CandidateQuery, EventStore};
use crate::utils::dates::parse_utc_datetime;
use crate::utils::error::AppError;

pub mod cursor;
pub mod filter;
pub mod page;
pub mod relevance;

use cursor::{to_storage_precision, EventCursor};
use filter::{CategoryMatch, EventFilter};
use page::{parse_flag, parse_limit, Page, PageSize, DEFAULT_MAX_LIMIT};
use relevance::LiveWindow;

#[derive(Debug, Clone, Copy)]
pub struct IndexSettings {
    pub live_window: LiveWindow,
    pub category_match: CategoryMatch,
    pub default_limit: usize,
    pub max_limit: usize,
    /// Upper bound on rows for `all=true` listings and id-based exports.
    pub export_cap: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            live_window: LiveWindow::default(),
            category_match: CategoryMatch::Any,
            default_limit: 20,
            max_limit: DEFAULT_MAX_LIMIT,
            export_cap: 1000,
        }
    }
}

/// Raw query string of `GET /api/events`. Unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventListQuery {
    pub search: Option<String>,
    pub categories: Option<String>,
    pub club_type: Option<String>,
    pub food: Option<String>,
    pub price: Option<String>,
    pub is_free: Option<String>,
    pub registration: Option<String>,
    pub school: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<String>,
    pub all: Option<String>,
    pub now: Option<String>,
}

/// A validated listing request.
#[derive(Debug, Clone)]
pub struct ListRequest {
    pub filter: EventFilter,
    pub cursor: Option<EventCursor>,
    pub size: PageSize,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedEvent {
    #[serde(flatten)]
    pub event: Event,
    pub display_handle: Option<String>,
    pub relevant_occurrence: Occurrence,
    pub is_live: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventDetail {
    #[serde(flatten)]
    pub event: Event,
    pub display_handle: Option<String>,
    pub occurrences: Vec<Occurrence>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportScope {
    Ids(Vec<Uuid>),
    /// The next `n` live or upcoming confirmed events.
    Upcoming(usize),
}

/// An event and the occurrence a calendar entry is anchored at.
#[derive(Debug, Clone)]
pub struct ExportEntry {
    pub event: Event,
    pub anchor: Occurrence,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub struct EventIndex {
    store: Arc<dyn EventStore>,
    settings: IndexSettings,
}

impl EventIndex {
    pub fn new(store: Arc<dyn EventStore>, settings: IndexSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &IndexSettings {
        &self.settings
    }

    /// Validates raw query parameters into a [`ListRequest`].
    pub fn parse_query(&self, query: EventListQuery) -> Result<ListRequest, AppError> {
        let now = match non_blank(query.now) {
            Some(raw) => parse_utc_datetime(&raw)
                .ok_or_else(|| AppError::ValidationError(format!("invalid 'now' value '{raw}'")))?,
            None => Utc::now(),
        };

        let cursor = non_blank(query.cursor)
            .map(|token| EventCursor::decode(&token))
            .transpose()?;

        let size = if parse_flag(query.all.as_deref()) == Some(true) {
            PageSize::All {
                cap: self.settings.export_cap,
            }
        } else {
            PageSize::Limited(parse_limit(
                query.limit.as_deref(),
                self.settings.default_limit,
                self.settings.max_limit,
            )?)
        };

        let categories = query
            .categories
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let price_free = query
            .price
            .as_deref()
            .is_some_and(|p| p.trim().eq_ignore_ascii_case("free"));

        let filter = EventFilter {
            search: non_blank(query.search),
            categories,
            category_match: self.settings.category_match,
            club_type: non_blank(query.club_type),
            food_only: parse_flag(query.food.as_deref()) == Some(true),
            free_only: price_free || parse_flag(query.is_free.as_deref()) == Some(true),
            registration: parse_flag(query.registration.as_deref()),
            school: non_blank(query.school),
        };

        Ok(ListRequest {
            filter,
            cursor,
            size,
            now: to_storage_precision(now),
        })
    }

    /// One page of events ranked by their relevant occurrence.
    pub async fn query(&self, request: ListRequest) -> Result<Page<RankedEvent>, AppError> {
        let size = request.size.rows();
        let now = request.now;
        let window = self.settings.live_window;

        debug!(
            filter = ?request.filter,
            cursor = ?request.cursor,
            size,
            %now,
            "Querying event index"
        );

        let candidates = self
            .store
            .ranked_events(CandidateQuery {
                filter: &request.filter,
                now,
                grace_floor: window.grace_floor(now),
                after: request.cursor,
                fetch: size + 1,
            })
            .await?;

        let page_ids: Vec<Uuid> = candidates
            .rows
            .iter()
            .take(size)
            .map(|row| row.event.id)
            .collect();
        let mut occurrences = self.occurrences_by_event(&page_ids).await?;

        Page::try_from_lookahead(
            candidates.rows,
            size,
            candidates.total_count,
            |row| row.cursor().encode(),
            |row| {
                let event_occurrences = occurrences.remove(&row.event.id).unwrap_or_default();
                // Occurrences can disappear between the two reads when an
                // event is deleted mid-request.
                let Some(relevant) = window.relevant_occurrence(&event_occurrences, now) else {
                    return Err(AppError::InternalServerError(format!(
                        "ranked event {} has no relevant occurrence",
                        row.event.id
                    )));
                };
                Ok(RankedEvent {
                    display_handle: row.event.handles.display_handle(),
                    is_live: window.is_live(relevant, now),
                    relevant_occurrence: relevant.clone(),
                    event: row.event,
                })
            },
        )
    }

    /// A confirmed event with its full occurrence history, ascending by start.
    pub async fn get_by_id(&self, id: Uuid) -> Result<EventDetail, AppError> {
        let event = self
            .store
            .confirmed_event(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event '{id}' was not found")))?;

        let mut occurrences = self.store.occurrences_for(&[id]).await?;
        occurrences.sort_by_key(|o| (o.dtstart_utc, o.id));

        Ok(EventDetail {
            display_handle: event.handles.display_handle(),
            event,
            occurrences,
        })
    }

    /// Events paired with the occurrence a calendar entry should use.
    ///
    /// Explicit ids fall back to an event's earliest occurrence when nothing
    /// is live or upcoming, so past events can still be exported.
    pub async fn export_window(
        &self,
        scope: ExportScope,
        now: DateTime<Utc>,
    ) -> Result<Vec<ExportEntry>, AppError> {
        let now = to_storage_precision(now);
        let window = self.settings.live_window;

        match scope {
            ExportScope::Upcoming(count) => {
                let page = self
                    .query(ListRequest {
                        filter: EventFilter::default(),
                        cursor: None,
                        size: PageSize::Limited(count.min(self.settings.export_cap)),
                        now,
                    })
                    .await?;

                Ok(page
                    .results
                    .into_iter()
                    .map(|ranked| ExportEntry {
                        event: ranked.event,
                        anchor: ranked.relevant_occurrence,
                    })
                    .collect())
            }
            ExportScope::Ids(mut ids) => {
                ids.sort();
                ids.dedup();
                if ids.is_empty() {
                    return Err(AppError::ValidationError(
                        "at least one event id is required".to_string(),
                    ));
                }
                if ids.len() > self.settings.export_cap {
                    return Err(AppError::ValidationError(format!(
                        "at most {} events can be exported at once",
                        self.settings.export_cap
                    )));
                }

                let events = self.store.confirmed_events_by_ids(&ids).await?;
                let mut occurrences = self.occurrences_by_event(&ids).await?;

                let mut entries: Vec<ExportEntry> = events
                    .into_iter()
                    .filter_map(|event| {
                        let event_occurrences = occurrences.remove(&event.id)?;
                        let anchor = window
                            .relevant_occurrence(&event_occurrences, now)
                            .or_else(|| {
                                event_occurrences
                                    .iter()
                                    .min_by_key(|o| (o.dtstart_utc, o.id))
                            })?
                            .clone();
                        Some(ExportEntry { event, anchor })
                    })
                    .collect();

                entries.sort_by_key(|entry| (entry.anchor.dtstart_utc, entry.event.id));
                Ok(entries)
            }
        }
    }

    async fn occurrences_by_event(
        &self,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<Occurrence>>, AppError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut grouped: HashMap<Uuid, Vec<Occurrence>> = HashMap::with_capacity(ids.len());
        for occurrence in self.store.occurrences_for(ids).await? {
            grouped
                .entry(occurrence.event_id)
                .or_default()
                .push(occurrence);
        }
        Ok(grouped)
    }
}

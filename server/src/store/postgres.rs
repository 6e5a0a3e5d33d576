//! PostgreSQL storage via sqlx.
//!
//! Relevance is computed in SQL: the earliest live occurrence always starts
//! before any upcoming one, so the relevant start is the minimum start over
//! the occurrences that are live or upcoming at `now`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPool;
use sqlx::types::Json;
use sqlx::{FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{
    CandidatePage, CandidateQuery, ClubPage, ClubStore, EventStore, RankedRow, SignupStore,
    SubscribeOutcome,
};
use crate::index::filter::{CategoryMatch, ClubFilter, EventFilter};
use crate::models::{
    Club, Event, EventStatus, EventSubmission, NewEvent, NewsletterSubscriber, Occurrence,
    SocialHandles, WaitlistEntry, WaitlistStats,
};
use crate::utils::error::AppError;

const EVENT_COLUMNS: &str = r#"
    e.id, e.title, e.description, e.location, e.categories, e.status, e.price,
    e.registration, e.food, e.club_type, e.school, e.ig_handle, e.discord_handle,
    e.x_handle, e.tiktok_handle, e.fb_handle, e.other_handle, e.source_url,
    e.source_image_url, e.added_at, e.created_at, e.updated_at
"#;

#[derive(Debug, FromRow)]
struct EventRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    location: Option<String>,
    categories: Json<Vec<String>>,
    status: String,
    price: Option<Decimal>,
    registration: bool,
    food: Option<String>,
    club_type: Option<String>,
    school: Option<String>,
    ig_handle: Option<String>,
    discord_handle: Option<String>,
    x_handle: Option<String>,
    tiktok_handle: Option<String>,
    fb_handle: Option<String>,
    other_handle: Option<String>,
    source_url: Option<String>,
    source_image_url: Option<String>,
    added_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = AppError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Event {
            id: row.id,
            title: row.title,
            description: row.description,
            location: row.location,
            categories: row.categories.0,
            status: row.status.parse::<EventStatus>()?,
            price: row.price,
            registration: row.registration,
            food: row.food,
            club_type: row.club_type,
            school: row.school,
            handles: SocialHandles {
                ig_handle: row.ig_handle,
                discord_handle: row.discord_handle,
                x_handle: row.x_handle,
                tiktok_handle: row.tiktok_handle,
                fb_handle: row.fb_handle,
                other_handle: row.other_handle,
            },
            source_url: row.source_url,
            source_image_url: row.source_image_url,
            added_at: row.added_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct RankedEventRow {
    #[sqlx(flatten)]
    event: EventRow,
    relevant_start: DateTime<Utc>,
    total_count: i64,
}

#[derive(Debug, FromRow)]
struct ClubRow {
    id: Uuid,
    club_name: String,
    categories: Json<Vec<String>>,
    club_page: Option<String>,
    ig: Option<String>,
    discord: Option<String>,
    club_type: Option<String>,
}

impl From<ClubRow> for Club {
    fn from(row: ClubRow) -> Self {
        Club {
            id: row.id,
            club_name: row.club_name,
            categories: row.categories.0,
            club_page: row.club_page,
            ig: row.ig,
            discord: row.discord,
            club_type: row.club_type,
        }
    }
}

/// Escapes LIKE wildcards and wraps the term for a substring match.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn to_limit(fetch: usize) -> i64 {
    i64::try_from(fetch).unwrap_or(i64::MAX)
}

fn push_event_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, filter: &'a EventFilter) {
    if let Some(term) = &filter.search {
        let pattern = like_pattern(term);
        qb.push(" AND (e.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR e.description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR e.location ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if !filter.categories.is_empty() {
        let operator = match filter.category_match {
            CategoryMatch::Any => " AND e.categories ?| ",
            CategoryMatch::All => " AND e.categories ?& ",
        };
        qb.push(operator).push_bind(&filter.categories);
    }

    if let Some(club_type) = &filter.club_type {
        qb.push(" AND e.club_type = ").push_bind(club_type);
    }

    if filter.food_only {
        qb.push(" AND e.food IS NOT NULL AND e.food <> ''");
    }

    if filter.free_only {
        qb.push(" AND (e.price IS NULL OR e.price = 0)");
    }

    if let Some(registration) = filter.registration {
        qb.push(" AND e.registration = ").push_bind(registration);
    }

    if let Some(school) = &filter.school {
        qb.push(" AND e.school = ").push_bind(school);
    }
}

fn push_club_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, filter: &'a ClubFilter) {
    if let Some(term) = &filter.search {
        qb.push(" AND club_name ILIKE ").push_bind(like_pattern(term));
    }
    if let Some(category) = &filter.category {
        qb.push(" AND categories ? ").push_bind(category);
    }
    if let Some(club_type) = &filter.club_type {
        qb.push(" AND club_type = ").push_bind(club_type);
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl EventStore for PgStore {
    async fn ranked_events(&self, query: CandidateQuery<'_>) -> Result<CandidatePage, AppError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            WITH relevance AS (
                SELECT d.event_id, MIN(d.dtstart_utc) AS relevant_start
                FROM event_dates d
                WHERE d.dtstart_utc > "#,
        );
        qb.push_bind(query.now)
            .push(" OR (d.dtstart_utc <= ")
            .push_bind(query.now)
            .push(" AND CASE WHEN d.dtend_utc IS NOT NULL THEN ")
            .push_bind(query.now)
            .push(" < d.dtend_utc WHEN d.duration_seconds IS NOT NULL THEN ")
            .push_bind(query.now)
            .push(" < d.dtstart_utc + d.duration_seconds * INTERVAL '1 second' ELSE d.dtstart_utc >= ")
            .push_bind(query.grace_floor)
            .push(
                r#" END)
                GROUP BY d.event_id
            ),
            ranked AS (
                SELECT "#,
            )
            .push(EVENT_COLUMNS)
            .push(
                r#", r.relevant_start, COUNT(*) OVER () AS total_count
                FROM events e
                JOIN relevance r ON r.event_id = e.id
                WHERE e.status = 'CONFIRMED' AND e.deleted_at IS NULL"#,
            );
        push_event_filters(&mut qb, query.filter);
        qb.push(") SELECT * FROM ranked e");

        if let Some(cursor) = query.after {
            qb.push(" WHERE (e.relevant_start, e.id) > (")
                .push_bind(cursor.start)
                .push(", ")
                .push_bind(cursor.event_id)
                .push(")");
        }
        qb.push(" ORDER BY e.relevant_start, e.id LIMIT ")
            .push_bind(to_limit(query.fetch));

        let rows: Vec<RankedEventRow> = qb.build_query_as().fetch_all(&self.pool).await?;

        // An empty page after a cursor carries no window count.
        let total_count = match rows.first() {
            Some(row) => Some(row.total_count),
            None if query.after.is_none() => Some(0),
            None => None,
        };

        let rows = rows
            .into_iter()
            .map(|row| {
                Ok(RankedRow {
                    event: Event::try_from(row.event)?,
                    relevant_start: row.relevant_start,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        Ok(CandidatePage { rows, total_count })
    }

    async fn occurrences_for(&self, event_ids: &[Uuid]) -> Result<Vec<Occurrence>, AppError> {
        if event_ids.is_empty() {
            return Ok(Vec::new());
        }

        let occurrences = sqlx::query_as::<_, Occurrence>(
            r#"
            SELECT d.id, d.event_id, d.dtstart_utc, d.dtend_utc, d.duration_seconds, d.tz
            FROM event_dates d
            JOIN events e ON e.id = d.event_id
            WHERE d.event_id = ANY($1) AND e.deleted_at IS NULL
            ORDER BY d.event_id, d.dtstart_utc, d.id
            "#,
        )
        .bind(event_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(occurrences)
    }

    async fn confirmed_event(&self, id: Uuid) -> Result<Option<Event>, AppError> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events e \
             WHERE e.id = $1 AND e.status = 'CONFIRMED' AND e.deleted_at IS NULL"
        );
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Event::try_from).transpose()
    }

    async fn confirmed_events_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Event>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events e \
             WHERE e.id = ANY($1) AND e.status = 'CONFIRMED' AND e.deleted_at IS NULL"
        );
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Event::try_from).collect()
    }

    async fn latest_confirmed(&self) -> Result<Option<Event>, AppError> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events e \
             WHERE e.status = 'CONFIRMED' AND e.deleted_at IS NULL \
             ORDER BY COALESCE(e.added_at, e.created_at) DESC, e.id DESC LIMIT 1"
        );
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Event::try_from).transpose()
    }

    async fn create_submission(&self, new: NewEvent) -> Result<EventSubmission, AppError> {
        let mut tx = self.pool.begin().await?;
        let event_id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO events (
                id, title, description, location, categories, status, price,
                registration, food, club_type, school, ig_handle, discord_handle,
                x_handle, tiktok_handle, fb_handle, other_handle, source_url,
                source_image_url, added_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, NOW())
            "#,
        )
        .bind(event_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.location)
        .bind(Json(&new.categories))
        .bind(EventStatus::Pending.as_str())
        .bind(new.price)
        .bind(new.registration)
        .bind(&new.food)
        .bind(&new.club_type)
        .bind(&new.school)
        .bind(&new.handles.ig_handle)
        .bind(&new.handles.discord_handle)
        .bind(&new.handles.x_handle)
        .bind(&new.handles.tiktok_handle)
        .bind(&new.handles.fb_handle)
        .bind(&new.handles.other_handle)
        .bind(&new.source_url)
        .bind(&new.source_image_url)
        .execute(&mut *tx)
        .await?;

        for occurrence in new.occurrences {
            let occurrence = occurrence.into_occurrence(event_id);
            sqlx::query(
                r#"
                INSERT INTO event_dates (id, event_id, dtstart_utc, dtend_utc, duration_seconds, tz)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(occurrence.id)
            .bind(occurrence.event_id)
            .bind(occurrence.dtstart_utc)
            .bind(occurrence.dtend_utc)
            .bind(occurrence.duration_seconds)
            .bind(&occurrence.tz)
            .execute(&mut *tx)
            .await?;
        }

        let (id, submitted_at): (Uuid, DateTime<Utc>) = sqlx::query_as(
            r#"
            INSERT INTO event_submissions (id, submitted_by, created_event_id)
            VALUES ($1, $2, $3)
            RETURNING id, submitted_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.submitted_by)
        .bind(event_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(EventSubmission {
            id,
            submitted_by: new.submitted_by,
            submitted_at,
            created_event_id: event_id,
        })
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl ClubStore for PgStore {
    async fn club_page(
        &self,
        filter: &ClubFilter,
        after: Option<Uuid>,
        fetch: usize,
    ) -> Result<ClubPage, AppError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT id, club_name, categories, club_page, ig, discord, club_type \
             FROM clubs WHERE deleted_at IS NULL",
        );
        push_club_filters(&mut qb, filter);
        if let Some(after) = after {
            qb.push(" AND id > ").push_bind(after);
        }
        qb.push(" ORDER BY id LIMIT ").push_bind(to_limit(fetch));
        let rows: Vec<ClubRow> = qb.build_query_as().fetch_all(&self.pool).await?;

        let mut count: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM clubs WHERE deleted_at IS NULL");
        push_club_filters(&mut count, filter);
        let (total_count,): (i64,) = count.build_query_as().fetch_one(&self.pool).await?;

        Ok(ClubPage {
            clubs: rows.into_iter().map(Club::from).collect(),
            total_count,
        })
    }
}

#[async_trait]
impl SignupStore for PgStore {
    async fn join_waitlist(&self, entry: WaitlistEntry) -> Result<WaitlistEntry, AppError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO waitlist_entries (id, email, name, school, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(entry.id)
        .bind(&entry.email)
        .bind(&entry.name)
        .bind(&entry.school)
        .bind(Json(&entry.metadata))
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(AppError::Conflict(
                "This email is already on the waitlist".to_string(),
            ));
        }
        Ok(entry)
    }

    async fn waitlist_stats(&self) -> Result<WaitlistStats, AppError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT COALESCE(NULLIF(school, ''), 'unknown') AS school, COUNT(*) AS entries
            FROM waitlist_entries
            GROUP BY 1
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut stats = WaitlistStats::default();
        for (school, entries) in rows {
            stats.total += entries;
            *stats.by_school.entry(school).or_default() += entries;
        }
        Ok(stats)
    }

    async fn subscribe(&self, email: &str) -> Result<SubscribeOutcome, AppError> {
        // xmax is zero only for freshly inserted rows.
        let outcome: Option<(bool,)> = sqlx::query_as(
            r#"
            INSERT INTO newsletter_subscribers (id, email, active)
            VALUES ($1, $2, TRUE)
            ON CONFLICT (email) DO UPDATE
                SET active = TRUE, updated_at = NOW()
                WHERE newsletter_subscribers.active = FALSE
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        match outcome {
            Some((true,)) => Ok(SubscribeOutcome::Created),
            Some((false,)) => Ok(SubscribeOutcome::Reactivated),
            None => Err(AppError::Conflict(
                "This email is already subscribed".to_string(),
            )),
        }
    }

    async fn unsubscribe(&self, email: &str) -> Result<NewsletterSubscriber, AppError> {
        sqlx::query_as::<_, NewsletterSubscriber>(
            r#"
            UPDATE newsletter_subscribers
            SET active = FALSE, updated_at = NOW()
            WHERE email = $1 AND active
            RETURNING id, email, active, created_at, updated_at
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("No active subscription for this email".to_string()))
    }
}

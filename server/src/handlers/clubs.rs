use axum::extract::{Query, State};
use axum::response::Response;
use serde::Deserialize;

use crate::index::cursor::ClubCursor;
use crate::index::filter::ClubFilter;
use crate::index::page::{parse_limit, Page};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;
use crate::utils::validation::clean_optional;

#[derive(Debug, Default, Deserialize)]
pub struct ClubListQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub club_type: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<String>,
}

impl ClubListQuery {
    fn filter(&self) -> ClubFilter {
        ClubFilter {
            search: clean_optional(self.search.clone()),
            category: clean_optional(self.category.clone())
                .filter(|c| !c.eq_ignore_ascii_case("all")),
            club_type: clean_optional(self.club_type.clone()),
        }
    }
}

pub async fn list_clubs(
    State(state): State<AppState>,
    Query(query): Query<ClubListQuery>,
) -> Result<Response, AppError> {
    let limit = parse_limit(
        query.limit.as_deref(),
        state.config.clubs_default_limit,
        state.config.max_page_limit,
    )?;
    let after = clean_optional(query.cursor.clone())
        .map(|token| ClubCursor::decode(&token))
        .transpose()?
        .map(|cursor| cursor.club_id);

    let filter = query.filter();
    let page = state.clubs.club_page(&filter, after, limit + 1).await?;

    let page = Page::from_lookahead(
        page.clubs,
        limit,
        Some(page.total_count),
        |club| ClubCursor { club_id: club.id }.encode(),
        |club| club,
    );
    Ok(success(page, "Clubs retrieved successfully"))
}

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::models::{Club, Event};

/// How a category filter is compared against an event's category set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryMatch {
    /// The sets share at least one category.
    #[default]
    Any,
    /// Every requested category is present on the event.
    All,
}

impl fmt::Display for CategoryMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryMatch::Any => f.write_str("any"),
            CategoryMatch::All => f.write_str("all"),
        }
    }
}

impl FromStr for CategoryMatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "any" => Ok(CategoryMatch::Any),
            "all" => Ok(CategoryMatch::All),
            other => Err(format!("expected 'any' or 'all', got '{other}'")),
        }
    }
}

/// Conjunctive event filters. Status is not a filter: public listings only
/// ever see confirmed events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub search: Option<String>,
    pub categories: Vec<String>,
    pub category_match: CategoryMatch,
    pub club_type: Option<String>,
    pub food_only: bool,
    pub free_only: bool,
    pub registration: Option<bool>,
    pub school: Option<String>,
}

impl EventFilter {
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            let hit = [
                Some(event.title.as_str()),
                event.description.as_deref(),
                event.location.as_deref(),
            ]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }

        if !self.categories.is_empty() {
            let has = |c: &String| event.categories.contains(c);
            let ok = match self.category_match {
                CategoryMatch::Any => self.categories.iter().any(has),
                CategoryMatch::All => self.categories.iter().all(has),
            };
            if !ok {
                return false;
            }
        }

        if let Some(club_type) = &self.club_type {
            if event.club_type.as_ref() != Some(club_type) {
                return false;
            }
        }

        if self.food_only && !event.has_food() {
            return false;
        }

        if self.free_only && !event.is_free() {
            return false;
        }

        if let Some(registration) = self.registration {
            if event.registration != registration {
                return false;
            }
        }

        if let Some(school) = &self.school {
            if event.school.as_ref() != Some(school) {
                return false;
            }
        }

        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClubFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub club_type: Option<String>,
}

impl ClubFilter {
    pub fn matches(&self, club: &Club) -> bool {
        if let Some(term) = &self.search {
            if !club.club_name.to_lowercase().contains(&term.to_lowercase()) {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if !club.categories.contains(category) {
                return false;
            }
        }
        if let Some(club_type) = &self.club_type {
            if club.club_type.as_ref() != Some(club_type) {
                return false;
            }
        }
        true
    }
}

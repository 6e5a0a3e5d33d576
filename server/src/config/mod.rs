use std::{env, fmt::Display, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::index::filter::CategoryMatch;
use crate::index::page::DEFAULT_MAX_LIMIT;
use crate::index::relevance::{LiveWindow, DEFAULT_LIVE_GRACE_MINUTES};
use crate::index::IndexSettings;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

#[derive(Debug, Clone)]
pub struct Config {
    /// In-memory storage is used when unset.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub port: u16,
    pub environment: String,
    pub cors_allowed_origins: Option<String>,
    pub request_timeout: Duration,
    pub rate_limit_requests: usize,
    pub rate_limit_window: Duration,
    pub live_grace_minutes: i64,
    pub category_match: CategoryMatch,
    pub events_default_limit: usize,
    pub clubs_default_limit: usize,
    pub max_page_limit: usize,
    pub export_cap: usize,
    pub rss_item_count: usize,
    pub site_url: String,
    pub admin_api_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Missing or unparsable values
    /// fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let loader = Loader { lookup };

        Self {
            database_url: loader.optional("DATABASE_URL"),
            database_max_connections: loader.try_load("DATABASE_MAX_CONNECTIONS", 5),
            port: loader.try_load("PORT", 8000),
            environment: loader.try_load("ENVIRONMENT", "development".to_string()),
            cors_allowed_origins: loader.optional("CORS_ALLOWED_ORIGINS"),
            request_timeout: Duration::from_secs(loader.try_load("REQUEST_TIMEOUT_SECS", 30)),
            rate_limit_requests: loader.try_load("RATE_LIMIT_REQUESTS", 100),
            rate_limit_window: Duration::from_secs(loader.try_load("RATE_LIMIT_WINDOW_SECS", 3600)),
            live_grace_minutes: loader.try_load("LIVE_GRACE_MINUTES", DEFAULT_LIVE_GRACE_MINUTES),
            category_match: loader.try_load("CATEGORY_MATCH", CategoryMatch::Any),
            events_default_limit: loader.try_load("EVENTS_DEFAULT_LIMIT", 20),
            clubs_default_limit: loader.try_load("CLUBS_DEFAULT_LIMIT", 50),
            max_page_limit: loader.try_load("MAX_PAGE_LIMIT", DEFAULT_MAX_LIMIT),
            export_cap: loader.try_load("EXPORT_CAP", 1000),
            rss_item_count: loader.try_load("RSS_ITEM_COUNT", 50),
            site_url: loader.try_load("SITE_URL", "https://wat2do.ca".to_string()),
            admin_api_token: loader.optional("ADMIN_API_TOKEN"),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn live_window(&self) -> LiveWindow {
        LiveWindow::from_minutes(self.live_grace_minutes.max(0))
    }

    pub fn index_settings(&self) -> IndexSettings {
        IndexSettings {
            live_window: self.live_window(),
            category_match: self.category_match,
            default_limit: self.events_default_limit,
            max_limit: self.max_page_limit.max(1),
            export_cap: self.export_cap.max(1),
        }
    }
}

struct Loader<F> {
    lookup: F,
}

impl<F> Loader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn try_load<T>(&self, key: &str, default: T) -> T
    where
        T: FromStr + Display,
        T::Err: Display,
    {
        let Some(raw) = self.optional(key) else {
            info!("{key} not set, using default: {default}");
            return default;
        };

        raw.parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value '{raw}': {e}, using default: {default}");
            default
        })
    }
}

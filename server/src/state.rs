use std::sync::Arc;

use crate::config::Config;
use crate::index::EventIndex;
use crate::middleware::RateLimiter;
use crate::store::{ClubStore, EventStore, SignupStore};

/// Shared handles passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub index: Arc<EventIndex>,
    pub events: Arc<dyn EventStore>,
    pub clubs: Arc<dyn ClubStore>,
    pub signups: Arc<dyn SignupStore>,
    pub config: Arc<Config>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new<S>(store: Arc<S>, config: Config) -> Self
    where
        S: EventStore + ClubStore + SignupStore + 'static,
    {
        let events: Arc<dyn EventStore> = store.clone();
        let index = EventIndex::new(events.clone(), config.index_settings());
        let rate_limiter = RateLimiter::new(config.rate_limit_requests, config.rate_limit_window);

        Self {
            index: Arc::new(index),
            events,
            clubs: store.clone(),
            signups: store,
            config: Arc::new(config),
            rate_limiter: Arc::new(rate_limiter),
        }
    }
}

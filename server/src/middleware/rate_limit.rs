//! Sliding-window request limiter keyed by client.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::utils::error::AppError;

/// Every this many checks, buckets of clients that went quiet are dropped.
const SWEEP_INTERVAL: u64 = 1024;

#[derive(Default)]
struct Buckets {
    clients: HashMap<String, VecDeque<Instant>>,
    checks: u64,
}

pub struct RateLimiter {
    limit: usize,
    window: Duration,
    buckets: Mutex<Buckets>,
}

impl RateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            buckets: Mutex::new(Buckets::default()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn check(&self, client: &str) -> bool {
        self.check_at(client, Instant::now())
    }

    /// Records a request at `now` unless the client already made `limit`
    /// requests within the trailing window. Rejected requests are not
    /// recorded.
    pub fn check_at(&self, client: &str, now: Instant) -> bool {
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);

        buckets.checks = buckets.checks.wrapping_add(1);
        if buckets.checks % SWEEP_INTERVAL == 0 {
            let window = self.window;
            buckets.clients.retain(|_, hits| {
                evict_expired(hits, now, window);
                !hits.is_empty()
            });
        }

        let hits = buckets.clients.entry(client.to_string()).or_default();
        evict_expired(hits, now, self.window);

        if hits.len() >= self.limit {
            if hits.is_empty() {
                buckets.clients.remove(client);
            }
            return false;
        }

        hits.push_back(now);
        true
    }

    pub fn tracked_clients(&self) -> usize {
        self.buckets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clients
            .len()
    }
}

fn evict_expired(hits: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = hits.front() {
        if now.saturating_duration_since(*oldest) >= window {
            hits.pop_front();
        } else {
            break;
        }
    }
}

/// First `X-Forwarded-For` hop, else the peer address.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_key(request.headers(), peer);

    if limiter.check(&client) {
        return next.run(request).await;
    }

    debug!(client = %client, path = %request.uri().path(), "Rejecting rate limited client");
    let mut response = AppError::RateLimited.into_response();
    if let Ok(retry_after) = HeaderValue::from_str(&limiter.window().as_secs().to_string()) {
        response.headers_mut().insert(header::RETRY_AFTER, retry_after);
    }
    response
}

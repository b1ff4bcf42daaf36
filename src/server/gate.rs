//! Per-client request gate.
//!
//! The gate runs before any handler. Each client address gets a fixed window
//! of `max_requests` requests; once the window is spent, requests are answered
//! with 429 until it rolls over.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Json;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use serde_json::json;
use tokio::time::Instant;
use tracing::{debug, info};

use super::AppState;
use crate::config::RateLimitConfig;

const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
const RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// Key used when the peer address is unavailable.
const UNKNOWN_CLIENT: &str = "unknown";

/// Result of asking the gate to admit one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Admitted; `remaining` requests are left in the current window.
    Allowed { remaining: u32, reset_after: Duration },
    /// Budget spent; retry once `retry_after` has elapsed.
    Rejected { retry_after: Duration },
}

/// Admission control keyed by client identity.
pub trait RequestGate: Send + Sync {
    /// Admits or rejects one request from `client_key`, consuming budget when admitted.
    fn check_and_consume(&self, client_key: &str) -> GateDecision;

    /// Requests allowed per window.
    fn limit(&self) -> u32;

    /// Drops bookkeeping for windows that have fully elapsed.
    fn purge_expired(&self) {}
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window counter per client key.
#[derive(Debug)]
pub struct FixedWindowGate {
    max_requests: u32,
    window: Duration,
    windows: DashMap<String, Window>,
}

impl FixedWindowGate {
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests,
            window: config.window,
            windows: DashMap::new(),
        }
    }

    /// Number of clients currently tracked.
    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

impl RequestGate for FixedWindowGate {
    fn check_and_consume(&self, client_key: &str) -> GateDecision {
        let now = Instant::now();
        let mut entry = self
            .windows
            .entry(client_key.to_string())
            .or_insert(Window {
                started: now,
                count: 0,
            });

        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }
        let reset_after = self.window.saturating_sub(now.duration_since(entry.started));

        if entry.count >= self.max_requests {
            return GateDecision::Rejected {
                retry_after: reset_after,
            };
        }
        entry.count += 1;
        GateDecision::Allowed {
            remaining: self.max_requests - entry.count,
            reset_after,
        }
    }

    fn limit(&self) -> u32 {
        self.max_requests
    }

    fn purge_expired(&self) {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.duration_since(w.started) < self.window);
        let purged = before.saturating_sub(self.windows.len());
        if purged > 0 {
            debug!(purged, "expired rate-limit windows dropped");
        }
    }
}

/// Whole seconds, rounded up.
fn ceil_secs(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}

fn rate_limit_headers(limit: u32, remaining: u32, reset_after: Duration) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(limit));
    headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(remaining));
    headers.insert(RATE_LIMIT_RESET, HeaderValue::from(ceil_secs(reset_after)));
    headers
}

/// Middleware: admits the request or answers 429 before the handler runs.
pub(crate) async fn enforce(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let client_key = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| UNKNOWN_CLIENT.to_string(), |ConnectInfo(addr)| addr.ip().to_string());

    let limit = state.gate.limit();
    match state.gate.check_and_consume(&client_key) {
        GateDecision::Allowed {
            remaining,
            reset_after,
        } => {
            let mut response = next.run(request).await;
            response
                .headers_mut()
                .extend(rate_limit_headers(limit, remaining, reset_after));
            response
        }
        GateDecision::Rejected { retry_after } => {
            info!(client = %client_key, "rate limit exceeded");
            let mut headers = rate_limit_headers(limit, 0, retry_after);
            headers.insert(RETRY_AFTER, HeaderValue::from(ceil_secs(retry_after)));
            (
                StatusCode::TOO_MANY_REQUESTS,
                headers,
                Json(json!({ "error": "Too many requests, please try again later." })),
            )
                .into_response()
        }
    }
}

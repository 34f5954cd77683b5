//! In-memory fixed-window rate limiting keyed by client address.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use dashmap::DashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// RateLimiter
///
/// Counts requests per client in fixed windows of `window` length. Lives in `AppState`
/// so every router built from the same state shares the counters.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    clients: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: DashMap::new(),
        }
    }

    /// General API traffic: 100 requests per minute.
    pub fn api() -> Self {
        Self::new(100, Duration::from_secs(60))
    }

    /// Login and registration attempts: 20 per minute.
    pub fn login() -> Self {
        Self::new(20, Duration::from_secs(60))
    }

    /// check
    ///
    /// Records one request for `client_id`. Returns `Err` with the seconds left in the
    /// current window once the client has exceeded `max_requests`.
    pub fn check(&self, client_id: &str) -> Result<(), u64> {
        self.check_at(client_id, Instant::now())
    }

    fn check_at(&self, client_id: &str, now: Instant) -> Result<(), u64> {
        self.clients
            .retain(|_, w| now.duration_since(w.started) < self.window);

        let mut entry = self
            .clients
            .entry(client_id.to_string())
            .or_insert(Window {
                started: now,
                count: 0,
            });
        entry.count += 1;

        if entry.count > self.max_requests {
            let remaining = self
                .window
                .saturating_sub(now.duration_since(entry.started))
                .as_secs();
            debug!(
                client = client_id,
                count = entry.count,
                limit = self.max_requests,
                "rate limit exceeded"
            );
            Err(remaining)
        } else {
            Ok(())
        }
    }

    /// Number of clients with an open window (for monitoring).
    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }

    pub fn reset(&self, client_id: &str) {
        self.clients.remove(client_id);
    }
}

/// get_client_id
///
/// First hop of `X-Forwarded-For`, then `X-Real-IP`, then the socket address.
pub fn get_client_id(addr: Option<SocketAddr>, headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for")
        && let Ok(value) = forwarded.to_str()
        && let Some(ip) = value.split(',').next()
    {
        return ip.trim().to_string();
    }

    if let Some(real_ip) = headers.get("x-real-ip")
        && let Ok(value) = real_ip.to_str()
    {
        return value.to_string();
    }

    addr.map(|a| a.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// ClientIp
///
/// The caller's address as resolved by [`get_client_id`]. Never rejects: requests served
/// without connect info (e.g. in-process tests) resolve from headers or to `"unknown"`.
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(ClientIp(get_client_id(addr, &parts.headers)))
    }
}

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use log::warn;
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

/// Key shared by every request whose origin cannot be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Expired windows are only swept once this many clients are being tracked.
const SWEEP_THRESHOLD: usize = 10_000;

struct Window {
    started: Instant,
    count: u32,
}

/// Fixed window per client: at most `limit` requests in every `window`.
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    clients: HashMap<String, Window>,
    last_sweep: Option<Instant>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        RateLimiter {
            limit: limit.max(1),
            window: window.max(Duration::from_secs(1)),
            clients: HashMap::new(),
            last_sweep: None,
        }
    }

    pub fn try_acquire(&mut self, client: &str) -> bool {
        self.try_acquire_at(client, Instant::now())
    }

    pub fn try_acquire_at(&mut self, client: &str, now: Instant) -> bool {
        if self.clients.len() >= SWEEP_THRESHOLD && self.sweep_due(now) {
            self.sweep(now);
        }

        let window = self.window;
        let entry = self
            .clients
            .entry(client.to_owned())
            .or_insert_with(|| Window {
                started: now,
                count: 0,
            });

        if now.saturating_duration_since(entry.started) >= window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count < self.limit {
            entry.count += 1;
            true
        } else {
            false
        }
    }

    fn sweep_due(&self, now: Instant) -> bool {
        self.last_sweep
            .map_or(true, |last| now.saturating_duration_since(last) >= self.window)
    }

    /// Forgets clients whose window has already run out.
    fn sweep(&mut self, now: Instant) {
        let window = self.window;
        self.clients
            .retain(|_, entry| now.saturating_duration_since(entry.started) < window);
        self.last_sweep = Some(now);
    }
}

/// First `X-Forwarded-For` hop, then the socket peer, then [`UNKNOWN_CLIENT`].
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_owned)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

pub async fn rate_limit(
    State(limiter): State<Arc<Mutex<RateLimiter>>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_key(request.headers(), peer);

    let allowed = limiter.lock().await.try_acquire(&client);
    if !allowed {
        warn!("rate limit exceeded for {}", client);
        return (
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests, please try again later.",
        )
            .into_response();
    }

    next.run(request).await
}

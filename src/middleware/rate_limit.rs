/// Fixed-window rate limiting for mutating requests, keyed by client IP
///
/// The in-memory store serves a single instance. With Redis configured the
/// counters live in Redis (`INCR` + `EXPIRE`), and a Redis failure lets the
/// request through.
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use redis::AsyncCommands;
use tokio::sync::Mutex;

use crate::error::AppError;

/// Sweep expired windows once the table grows past this size
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Limited { retry_after_secs: u64 },
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Clone)]
enum Store {
    Memory(Arc<Mutex<HashMap<String, Window>>>),
    Redis(redis::Client),
}

#[derive(Clone)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    store: Store,
}

impl RateLimiter {
    pub fn in_memory(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            store: Store::Memory(Arc::new(Mutex::new(HashMap::new()))),
        }
    }

    pub fn redis(client: redis::Client, max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            store: Store::Redis(client),
        }
    }

    /// Counts one request for `key` and decides whether it may proceed
    pub async fn check(&self, key: &str) -> Decision {
        match &self.store {
            Store::Memory(windows) => self.check_memory(windows, key).await,
            Store::Redis(client) => match self.check_redis(client, key).await {
                Ok(decision) => decision,
                Err(e) => {
                    tracing::warn!(error = %e, key = %key, "Rate limit store unavailable, allowing request");
                    Decision::Allowed
                }
            },
        }
    }

    async fn check_memory(&self, windows: &Mutex<HashMap<String, Window>>, key: &str) -> Decision {
        let now = Instant::now();
        let mut windows = windows.lock().await;

        if windows.len() > SWEEP_THRESHOLD {
            windows.retain(|_, w| now.duration_since(w.started) < self.window);
        }

        let window = windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(window.started) >= self.window {
            *window = Window {
                started: now,
                count: 0,
            };
        }

        window.count += 1;
        if window.count <= self.max_requests {
            return Decision::Allowed;
        }

        let remaining = self.window.saturating_sub(now.duration_since(window.started));
        Decision::Limited {
            retry_after_secs: remaining.as_secs_f64().ceil().max(1.0) as u64,
        }
    }

    async fn check_redis(&self, client: &redis::Client, key: &str) -> redis::RedisResult<Decision> {
        let key = format!("ratelimit:{}", key);
        let window_secs = self.window.as_secs().max(1);
        let mut conn = client.get_multiplexed_async_connection().await?;

        let count: u32 = conn.incr(&key, 1).await?;
        if count == 1 {
            let _: () = conn.expire(&key, window_secs as i64).await?;
        }
        if count <= self.max_requests {
            return Ok(Decision::Allowed);
        }

        let ttl: i64 = conn.ttl(&key).await?;
        if ttl < 0 {
            // Counter lost its expiry; restart the window
            let _: () = conn.expire(&key, window_secs as i64).await?;
        }
        Ok(Decision::Limited {
            retry_after_secs: if ttl > 0 { ttl as u64 } else { window_secs },
        })
    }
}

/// Client IP: first `x-forwarded-for` hop, then `x-real-ip`, then the socket address
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    header("x-forwarded-for")
        .or_else(|| header("x-real-ip"))
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

fn is_mutating(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
}

pub async fn rate_limit_middleware(State(limiter): State<RateLimiter>, request: Request, next: Next) -> Response {
    if !is_mutating(request.method()) {
        return next.run(request).await;
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = client_ip(request.headers(), peer);

    match limiter.check(&ip).await {
        Decision::Allowed => next.run(request).await,
        Decision::Limited { retry_after_secs } => {
            tracing::warn!(client_ip = %ip, path = %request.uri().path(), retry_after_secs, "Rate limit exceeded");
            AppError::RateLimited { retry_after_secs }.into_response()
        }
    }
}

//! Fixed-window request limiter keyed by client address.
//!
//! Counters live in one mutex-guarded map; a janitor task drops windows that
//! have closed. Rejections are answered here with the `TooManyRequests`
//! envelope and status 429.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header;
use actix_web::{Error, HttpResponse};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use mockable::Clock;
use serde::Deserialize;
use tokio::task::JoinHandle;

use crate::inbound::http::{ErrorCode, failure_json};

const fn default_requests() -> u32 {
    100
}

const fn default_window_ms() -> u64 {
    60_000
}

/// `rate_limit` configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RateLimitConfig {
    /// Whether the limiter is mounted.
    #[serde(default)]
    pub enabled: bool,
    /// Requests allowed per window and client.
    #[serde(default = "default_requests")]
    pub requests: u32,
    /// Window length in milliseconds.
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests: default_requests(),
            window_ms: default_window_ms(),
        }
    }
}

impl RateLimitConfig {
    /// Window length; never zero.
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms.max(1))
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

/// Outcome of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Under the limit.
    Allowed {
        /// Requests left in the window.
        remaining: u32,
    },
    /// Over the limit until the window closes.
    Limited {
        /// Time until the window closes.
        retry_after: Duration,
    },
}

/// Per-client counters.
#[derive(Debug)]
pub struct RateLimitStore {
    limit: u32,
    window: Duration,
    entries: Mutex<HashMap<String, Window>>,
}

impl RateLimitStore {
    /// Allow `limit` requests per `window`.
    #[must_use]
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Store sized from configuration.
    #[must_use]
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.requests, config.window())
    }

    /// Count one request from `key` at `now`.
    pub fn hit(&self, key: &str, now: Instant) -> Decision {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let window = entries
            .entry(key.to_owned())
            .and_modify(|window| {
                if now >= window.reset_at {
                    *window = Window {
                        count: 0,
                        reset_at: now + self.window,
                    };
                }
            })
            .or_insert(Window {
                count: 0,
                reset_at: now + self.window,
            });
        if window.count >= self.limit {
            return Decision::Limited {
                retry_after: window.reset_at.saturating_duration_since(now),
            };
        }
        window.count += 1;
        Decision::Allowed {
            remaining: self.limit - window.count,
        }
    }

    /// Drop every window closed at `now`; returns how many were dropped.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, window| window.reset_at > now);
        before - entries.len()
    }

    /// Number of tracked clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no client is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Purge expired windows once per window until the store is dropped.
    pub fn spawn_janitor(store: &Arc<Self>) -> JoinHandle<()> {
        let period = store.window;
        let store = Arc::downgrade(store);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                let purged = store.purge_expired(Instant::now());
                if purged > 0 {
                    tracing::debug!(purged, "rate limit janitor dropped closed windows");
                }
            }
        })
    }
}

/// Rate-limit middleware factory.
#[derive(Clone)]
pub struct RateLimit {
    store: Arc<RateLimitStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimit {
    /// Count requests in `store`; stamp rejections with `clock`.
    pub fn new(store: Arc<RateLimitStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddleware {
            service,
            limit: self.clone(),
        }))
    }
}

/// Service produced by [`RateLimit`].
pub struct RateLimitMiddleware<S> {
    service: S,
    limit: RateLimit,
}

fn client_key(req: &ServiceRequest) -> String {
    req.peer_addr()
        .map_or_else(|| "unknown".to_owned(), |addr| addr.ip().to_string())
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match self.limit.store.hit(&client_key(&req), Instant::now()) {
            Decision::Allowed { .. } => {
                let fut = self.service.call(req);
                Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
            }
            Decision::Limited { retry_after } => {
                let retry_secs = retry_after.as_secs().max(1);
                tracing::debug!(client = %client_key(&req), retry_secs, "request rate limited");
                let response = HttpResponse::TooManyRequests()
                    .insert_header((header::RETRY_AFTER, retry_secs.to_string()))
                    .json(failure_json(
                        self.limit.clock.utc(),
                        ErrorCode::TooManyRequests,
                    ));
                let (request, _) = req.into_parts();
                let limited = ServiceResponse::new(request, response).map_into_right_body();
                Box::pin(async move { Ok(limited) })
            }
        }
    }
}

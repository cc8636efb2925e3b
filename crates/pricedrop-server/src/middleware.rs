use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Query, Request, State},
    http::{header::AUTHORIZATION, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use pricedrop_core::{AppConfig, Environment};
use serde::Deserialize;
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::ApiError;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Decides whether a presented credential unlocks the scheduler routes.
pub trait CredentialCheck: Send + Sync + 'static {
    fn allows(&self, presented: Option<&str>) -> bool;
}

/// A single shared secret, compared in constant time.
pub struct SharedSecret(String);

impl SharedSecret {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }
}

impl CredentialCheck for SharedSecret {
    fn allows(&self, presented: Option<&str>) -> bool {
        presented.is_some_and(|p| bool::from(p.as_bytes().ct_eq(self.0.as_bytes())))
    }
}

/// Accepts every request. Only used in development without a secret.
pub struct AllowAll;

impl CredentialCheck for AllowAll {
    fn allows(&self, _presented: Option<&str>) -> bool {
        true
    }
}

/// Credential settings used by [`require_cron_key`].
#[derive(Clone)]
pub struct AuthState {
    check: Arc<dyn CredentialCheck>,
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState").finish_non_exhaustive()
    }
}

impl AuthState {
    pub fn new(check: impl CredentialCheck) -> Self {
        Self {
            check: Arc::new(check),
        }
    }

    /// Builds auth from `PRICEDROP_CRON_SECRET`.
    ///
    /// In development, a missing secret disables the check for local iteration.
    /// In non-development envs, a missing secret fails startup.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        match &config.cron_secret {
            Some(secret) => Ok(Self::new(SharedSecret::new(secret.clone()))),
            None if config.env == Environment::Development => {
                tracing::warn!(
                    "PRICEDROP_CRON_SECRET not set; cron auth disabled in development environment"
                );
                Ok(Self::new(AllowAll))
            }
            None => anyhow::bail!("PRICEDROP_CRON_SECRET is required outside development"),
        }
    }
}

#[derive(Debug)]
struct RateLimitWindow {
    opened_at: Instant,
    admitted: usize,
}

/// Fixed-window request limiter shared by all API routes.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    current: Arc<Mutex<RateLimitWindow>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            current: Arc::new(Mutex::new(RateLimitWindow {
                opened_at: Instant::now(),
                admitted: 0,
            })),
        }
    }

    /// Counts one request against the current window; `false` once it is full.
    async fn admit(&self) -> bool {
        let mut current = self.current.lock().await;
        if current.opened_at.elapsed() >= self.window {
            current.opened_at = Instant::now();
            current.admitted = 0;
        }
        if current.admitted >= self.max_requests {
            return false;
        }
        current.admitted += 1;
        true
    }
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, val);
    }

    res
}

#[derive(Debug, Deserialize)]
struct KeyQuery {
    key: Option<String>,
}

/// Middleware guarding `/cron` and `/end-all`.
///
/// The secret is read from `?key=` first, then from an `Authorization: Bearer`
/// header.
pub async fn require_cron_key(State(auth): State<AuthState>, req: Request, next: Next) -> Response {
    let from_query = Query::<KeyQuery>::try_from_uri(req.uri())
        .ok()
        .and_then(|Query(q)| q.key);
    let presented = from_query
        .as_deref()
        .or_else(|| extract_bearer_token(req.headers().get(AUTHORIZATION)));

    if auth.check.allows(presented) {
        return next.run(req).await;
    }

    tracing::warn!(path = %req.uri().path(), "rejected request with missing or invalid cron key");
    ApiError::unauthorized(request_id_of(&req), "missing or invalid cron key").into_response()
}

/// Middleware rejecting requests once the current window is full.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    if rate_limit.admit().await {
        next.run(req).await
    } else {
        ApiError::rate_limited(request_id_of(&req)).into_response()
    }
}

fn request_id_of(req: &Request) -> String {
    req.extensions()
        .get::<RequestId>()
        .map_or_else(String::new, |id| id.0.clone())
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|s| !s.trim().is_empty())
}

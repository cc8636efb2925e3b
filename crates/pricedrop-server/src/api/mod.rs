mod cron;
mod error;
mod health;
mod jobs;
mod schedule;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, HeaderName, Method},
    routing::{get, post},
    Router,
};
use pricedrop_engine::TickOptions;
use pricedrop_shopify::ShopifyClient;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use error::{ApiError, ResponseMeta};

use crate::middleware::{
    enforce_rate_limit, request_id, require_cron_key, AuthState, RateLimitState,
};

/// Collaborators shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub shopify: Arc<ShopifyClient>,
    pub tick: TickOptions,
}

/// Permissive CORS so a storefront admin page can call the API directly.
fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

/// Rate-limited routes. `/cron` and `/end-all` additionally require the cron key.
fn api_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    let guarded = Router::new()
        .route("/cron", get(cron::run_cron).post(cron::run_cron))
        .route("/end-all", post(cron::end_all))
        .route_layer(axum::middleware::from_fn_with_state(auth, require_cron_key));

    Router::new()
        .route("/schedule", post(schedule::create_schedule))
        .route("/list-jobs", get(jobs::list_jobs))
        .merge(guarded)
        .route_layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .merge(api_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

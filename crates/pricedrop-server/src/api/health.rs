use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{AppState, ResponseMeta};

#[derive(Debug, Serialize)]
struct HealthResponse {
    success: bool,
    database: &'static str,
    meta: ResponseMeta,
}

/// `GET /health`: `200` when the database answers, `503` otherwise.
pub(super) async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let (status, database) = match pricedrop_db::health_check(&state.pool).await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    };

    (
        status,
        Json(HealthResponse {
            success: status == StatusCode::OK,
            database,
            meta: ResponseMeta::new(req_id.0),
        }),
    )
}

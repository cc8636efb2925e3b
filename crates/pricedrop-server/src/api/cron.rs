//! Scheduler triggers: `/cron` runs one tick, `/end-all` is the emergency stop.

use axum::{extract::State, Extension, Json};
use chrono::Utc;
use pricedrop_engine::{EmergencyStopReport, TickSummary};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{ApiError, AppState};

#[derive(Debug, Serialize)]
pub(super) struct CronResponse {
    pub success: bool,
    pub log: TickSummary,
}

#[derive(Debug, Serialize)]
pub(super) struct EndAllResponse {
    pub success: bool,
    pub message: String,
    pub details: EmergencyStopReport,
}

pub(super) async fn run_cron(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<CronResponse>, ApiError> {
    let summary =
        pricedrop_engine::run_tick(&state.pool, state.shopify.as_ref(), state.tick, Utc::now())
            .await
            .map_err(|e| ApiError::internal(req_id.0, "scheduler run aborted", &e))?;

    Ok(Json(CronResponse {
        success: true,
        log: summary,
    }))
}

pub(super) async fn end_all(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<EndAllResponse>, ApiError> {
    tracing::warn!(request_id = %req_id.0, "emergency stop requested");

    let report = pricedrop_engine::end_all(&state.pool, state.shopify.as_ref(), state.tick)
        .await
        .map_err(|e| ApiError::internal(req_id.0, "emergency stop aborted", &e))?;

    let message = if report.is_clean() {
        format!(
            "Cancelled {} scheduled job(s) and restored {} active discount(s)",
            report.cancelled_future_jobs, report.reverted_active_jobs
        )
    } else {
        format!(
            "Cancelled {} scheduled job(s); restored {} active discount(s), {} failed",
            report.cancelled_future_jobs,
            report.reverted_active_jobs,
            report.errors.len()
        )
    };

    Ok(Json(EndAllResponse {
        success: report.is_clean(),
        message,
        details: report,
    }))
}

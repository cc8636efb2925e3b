//! `POST /schedule`: create one pending job per variant.

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use pricedrop_core::NewDiscountJob;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ScheduleRequest {
    #[serde(default)]
    pub variant_ids: Option<Vec<String>>,
    pub discount: Decimal,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(super) struct ScheduleResponse {
    pub success: bool,
    pub message: String,
    pub scheduled: u64,
}

pub(super) async fn create_schedule(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<ScheduleRequest>, JsonRejection>,
) -> Result<Json<ScheduleResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::validation(req_id.0.clone(), e.body_text()))?;

    let variant_ids = request
        .variant_ids
        .filter(|ids| !ids.is_empty())
        .ok_or_else(|| {
            ApiError::validation(req_id.0.clone(), "variantIds must be a non-empty list")
        })?;

    let jobs = NewDiscountJob::batch(
        &variant_ids,
        request.discount,
        request.start_at,
        request.end_at,
    );
    let scheduled = pricedrop_db::insert_discount_jobs(&state.pool, &jobs)
        .await
        .map_err(|e| {
            ApiError::internal(req_id.0.clone(), "failed to store discount jobs", &e)
        })?;

    tracing::info!(
        scheduled,
        discount = %request.discount,
        start_at = %request.start_at,
        end_at = %request.end_at,
        "scheduled discount jobs"
    );

    Ok(Json(ScheduleResponse {
        success: true,
        message: format!("Scheduled {scheduled} discount job(s)"),
        scheduled,
    }))
}

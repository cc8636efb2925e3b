//! `GET /list-jobs`: open jobs joined with live catalog metadata.

use std::collections::HashMap;

use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use pricedrop_core::{DiscountJob, JobStatus};
use pricedrop_shopify::{numeric_variant_id, VariantSummary};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{ApiError, AppState};

#[derive(Debug, Serialize)]
pub(super) struct JobListItem {
    pub id: Uuid,
    pub variant_id: String,
    pub discount_percent: Decimal,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: JobStatus,
    pub original_price: Option<String>,
    pub original_compare_at: Option<String>,
    pub last_error: Option<String>,
    pub title: Option<String>,
    pub product_title: Option<String>,
    pub image_url: Option<String>,
    pub current_price: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct JobListResponse {
    pub success: bool,
    pub jobs: Vec<JobListItem>,
}

pub(super) async fn list_jobs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<JobListResponse>, ApiError> {
    let jobs = pricedrop_db::list_open_jobs(&state.pool)
        .await
        .map_err(|e| ApiError::internal(req_id.0.clone(), "failed to load jobs", &e))?;

    let lookup_ids: Vec<String> = jobs
        .iter()
        .filter(|job| numeric_variant_id(&job.variant_id).is_ok())
        .map(|job| job.variant_id.clone())
        .collect();

    let summaries = match state.shopify.variant_summaries(&lookup_ids).await {
        Ok(summaries) => summaries,
        Err(e) => {
            tracing::warn!(
                request_id = %req_id.0,
                error = %e,
                "list-jobs: catalog lookup failed; returning jobs without metadata"
            );
            Vec::new()
        }
    };

    Ok(Json(JobListResponse {
        success: true,
        jobs: merge_metadata(jobs, summaries),
    }))
}

/// Attaches catalog metadata to each job, keyed by numeric variant id.
fn merge_metadata(jobs: Vec<DiscountJob>, summaries: Vec<VariantSummary>) -> Vec<JobListItem> {
    let by_variant: HashMap<String, VariantSummary> = summaries
        .into_iter()
        .map(|s| (s.variant_id.clone(), s))
        .collect();

    jobs.into_iter()
        .map(|job| {
            let summary = numeric_variant_id(&job.variant_id)
                .ok()
                .and_then(|id| by_variant.get(id));
            JobListItem {
                id: job.public_id,
                title: summary.map(|s| s.title.clone()),
                product_title: summary.map(|s| s.product_title.clone()),
                image_url: summary.and_then(|s| s.image_url.clone()),
                current_price: summary.map(|s| s.price.clone()),
                variant_id: job.variant_id,
                discount_percent: job.discount_percent,
                start_time: job.start_time,
                end_time: job.end_time,
                status: job.status,
                original_price: job.original_price,
                original_compare_at: job.original_compare_at,
                last_error: job.last_error,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: i64, variant_id: &str) -> DiscountJob {
        let now = Utc::now();
        DiscountJob {
            id,
            public_id: Uuid::new_v4(),
            variant_id: variant_id.to_string(),
            discount_percent: Decimal::new(10, 0),
            start_time: now,
            end_time: now,
            original_price: None,
            original_compare_at: None,
            status: JobStatus::Pending,
            last_error: None,
            created_at: now,
            updated_at: now,
            activated_at: None,
            completed_at: None,
        }
    }

    fn summary(variant_id: &str, title: &str) -> VariantSummary {
        VariantSummary {
            variant_id: variant_id.to_string(),
            title: title.to_string(),
            product_title: "Tee".to_string(),
            image_url: None,
            price: "19.99".to_string(),
        }
    }

    #[test]
    fn merge_matches_numeric_and_gid_variant_ids() {
        let jobs = vec![job(1, "11"), job(2, "gid://shopify/ProductVariant/22")];
        let summaries = vec![summary("11", "Small"), summary("22", "Large")];

        let items = merge_metadata(jobs, summaries);

        assert_eq!(items[0].title.as_deref(), Some("Small"));
        assert_eq!(items[1].title.as_deref(), Some("Large"));
        assert_eq!(items[1].variant_id, "gid://shopify/ProductVariant/22");
        assert_eq!(items[1].current_price.as_deref(), Some("19.99"));
    }

    #[test]
    fn merge_leaves_metadata_absent_when_catalog_has_no_match() {
        let items = merge_metadata(vec![job(1, "33"), job(2, "not-a-variant")], Vec::new());

        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.title.is_none() && i.current_price.is_none()));
    }
}

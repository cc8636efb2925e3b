//! Scheduled discount jobs and their lifecycle.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreError;

/// Lifecycle state of a [`DiscountJob`].
///
/// Transitions only move forward: `Pending → Active → Completed`, or
/// `Pending → Completed` when a job is cancelled before it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Active,
    Completed,
}

impl JobStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Active => "active",
            JobStatus::Completed => "completed",
        }
    }

    /// Whether moving from `self` to `next` is a legal forward transition.
    #[must_use]
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Active | JobStatus::Completed)
                | (JobStatus::Active, JobStatus::Completed)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "active" => Ok(JobStatus::Active),
            "completed" => Ok(JobStatus::Completed),
            other => Err(CoreError::InvalidJobStatus(other.to_string())),
        }
    }
}

/// One discount window for one storefront variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountJob {
    pub id: i64,
    pub public_id: Uuid,
    /// Shopify variant identifier exactly as the merchant supplied it.
    pub variant_id: String,
    pub discount_percent: Decimal,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Price string as read from the storefront at activation.
    pub original_price: Option<String>,
    /// Compare-at price string as read at activation; `None` when the
    /// variant had no compare-at price.
    pub original_compare_at: Option<String>,
    pub status: JobStatus,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Input for creating a pending job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDiscountJob {
    pub variant_id: String,
    pub discount_percent: Decimal,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl NewDiscountJob {
    /// Expands one schedule request into a job per variant, preserving order.
    #[must_use]
    pub fn batch(
        variant_ids: &[String],
        discount_percent: Decimal,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Vec<Self> {
        variant_ids
            .iter()
            .map(|variant_id| Self {
                variant_id: variant_id.clone(),
                discount_percent,
                start_time,
                end_time,
            })
            .collect()
    }
}

//! Database operations for the `discount_jobs` table.
//!
//! Every status change is a guarded `UPDATE … WHERE status = <expected>`, so
//! a job can only move forward even when two workers race on it.

use chrono::{DateTime, Utc};
use pricedrop_core::{DiscountJob, JobStatus, NewDiscountJob};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `discount_jobs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DiscountJobRow {
    pub id: i64,
    pub public_id: Uuid,
    pub variant_id: String,
    pub discount_percent: Decimal,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub original_price: Option<String>,
    pub original_compare_at: Option<String>,
    pub status: String,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl DiscountJobRow {
    /// Converts the row into the typed domain record.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::CorruptStatus`] if `status` is not a known value.
    pub fn into_job(self) -> Result<DiscountJob, DbError> {
        let status = self
            .status
            .parse::<JobStatus>()
            .map_err(|_| DbError::CorruptStatus {
                id: self.id,
                status: self.status.clone(),
            })?;

        Ok(DiscountJob {
            id: self.id,
            public_id: self.public_id,
            variant_id: self.variant_id,
            discount_percent: self.discount_percent,
            start_time: self.start_time,
            end_time: self.end_time,
            original_price: self.original_price,
            original_compare_at: self.original_compare_at,
            status,
            last_error: self.last_error,
            created_at: self.created_at,
            updated_at: self.updated_at,
            activated_at: self.activated_at,
            completed_at: self.completed_at,
        })
    }
}

fn into_jobs(rows: Vec<DiscountJobRow>) -> Result<Vec<DiscountJob>, DbError> {
    rows.into_iter().map(DiscountJobRow::into_job).collect()
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Inserts a batch of `pending` jobs in a single statement.
///
/// Returns the number of rows inserted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_discount_jobs(pool: &PgPool, jobs: &[NewDiscountJob]) -> Result<u64, DbError> {
    if jobs.is_empty() {
        return Ok(0);
    }

    let mut public_ids: Vec<Uuid> = Vec::with_capacity(jobs.len());
    let mut variant_ids: Vec<String> = Vec::with_capacity(jobs.len());
    let mut discounts: Vec<Decimal> = Vec::with_capacity(jobs.len());
    let mut start_times: Vec<DateTime<Utc>> = Vec::with_capacity(jobs.len());
    let mut end_times: Vec<DateTime<Utc>> = Vec::with_capacity(jobs.len());

    for job in jobs {
        public_ids.push(Uuid::new_v4());
        variant_ids.push(job.variant_id.clone());
        discounts.push(job.discount_percent);
        start_times.push(job.start_time);
        end_times.push(job.end_time);
    }

    let result = sqlx::query(
        "INSERT INTO discount_jobs \
             (public_id, variant_id, discount_percent, start_time, end_time, status) \
         SELECT *, 'pending' FROM UNNEST(\
              $1::uuid[], $2::text[], $3::numeric[], $4::timestamptz[], $5::timestamptz[])",
    )
    .bind(&public_ids)
    .bind(&variant_ids)
    .bind(&discounts)
    .bind(&start_times)
    .bind(&end_times)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Moves a job from `pending` to `active`, recording the prices it displaced.
///
/// # Errors
///
/// Returns [`DbError::InvalidJobTransition`] if the job is not `pending`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn mark_job_active(
    pool: &PgPool,
    id: i64,
    original_price: &str,
    original_compare_at: Option<&str>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE discount_jobs \
         SET status = 'active', original_price = $2, original_compare_at = $3, \
             activated_at = NOW(), updated_at = NOW(), last_error = NULL \
         WHERE id = $1 AND status = 'pending'",
    )
    .bind(id)
    .bind(original_price)
    .bind(original_compare_at)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidJobTransition {
            id,
            expected_status: "pending",
        });
    }

    Ok(())
}

/// Moves a job from `active` to `completed`.
///
/// # Errors
///
/// Returns [`DbError::InvalidJobTransition`] if the job is not `active`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn mark_job_completed(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE discount_jobs \
         SET status = 'completed', completed_at = NOW(), updated_at = NOW(), last_error = NULL \
         WHERE id = $1 AND status = 'active'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidJobTransition {
            id,
            expected_status: "active",
        });
    }

    Ok(())
}

/// Completes every `pending` job without touching prices.
///
/// Returns the number of jobs cancelled.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn cancel_pending_jobs(pool: &PgPool) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE discount_jobs \
         SET status = 'completed', completed_at = NOW(), updated_at = NOW() \
         WHERE status = 'pending'",
    )
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Stores the latest failure message on a job without changing its status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn record_job_error(pool: &PgPool, id: i64, message: &str) -> Result<(), DbError> {
    sqlx::query("UPDATE discount_jobs SET last_error = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(message)
        .execute(pool)
        .await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Returns up to `limit` `pending` jobs whose window has started, earliest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::CorruptStatus`]
/// if a row cannot be converted.
pub async fn list_due_pending_jobs(
    pool: &PgPool,
    now: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<DiscountJob>, DbError> {
    let rows = sqlx::query_as::<_, DiscountJobRow>(
        "SELECT id, public_id, variant_id, discount_percent, start_time, end_time, \
                original_price, original_compare_at, status, last_error, \
                created_at, updated_at, activated_at, completed_at \
         FROM discount_jobs \
         WHERE status = 'pending' AND start_time <= $1 \
         ORDER BY start_time, id \
         LIMIT $2",
    )
    .bind(now)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    into_jobs(rows)
}

/// Returns up to `limit` `active` jobs whose window has ended, earliest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::CorruptStatus`]
/// if a row cannot be converted.
pub async fn list_due_active_jobs(
    pool: &PgPool,
    now: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<DiscountJob>, DbError> {
    let rows = sqlx::query_as::<_, DiscountJobRow>(
        "SELECT id, public_id, variant_id, discount_percent, start_time, end_time, \
                original_price, original_compare_at, status, last_error, \
                created_at, updated_at, activated_at, completed_at \
         FROM discount_jobs \
         WHERE status = 'active' AND end_time <= $1 \
         ORDER BY end_time, id \
         LIMIT $2",
    )
    .bind(now)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    into_jobs(rows)
}

/// Returns every `active` job regardless of its window.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::CorruptStatus`]
/// if a row cannot be converted.
pub async fn list_active_jobs(pool: &PgPool) -> Result<Vec<DiscountJob>, DbError> {
    let rows = sqlx::query_as::<_, DiscountJobRow>(
        "SELECT id, public_id, variant_id, discount_percent, start_time, end_time, \
                original_price, original_compare_at, status, last_error, \
                created_at, updated_at, activated_at, completed_at \
         FROM discount_jobs \
         WHERE status = 'active' \
         ORDER BY end_time, id",
    )
    .fetch_all(pool)
    .await?;

    into_jobs(rows)
}

/// Returns all `pending` and `active` jobs, by start time.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::CorruptStatus`]
/// if a row cannot be converted.
pub async fn list_open_jobs(pool: &PgPool) -> Result<Vec<DiscountJob>, DbError> {
    let rows = sqlx::query_as::<_, DiscountJobRow>(
        "SELECT id, public_id, variant_id, discount_percent, start_time, end_time, \
                original_price, original_compare_at, status, last_error, \
                created_at, updated_at, activated_at, completed_at \
         FROM discount_jobs \
         WHERE status IN ('pending', 'active') \
         ORDER BY start_time, id",
    )
    .fetch_all(pool)
    .await?;

    into_jobs(rows)
}

/// Fetches a single job by its internal `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`,
/// [`DbError::Sqlx`] if the query fails, or [`DbError::CorruptStatus`].
pub async fn get_discount_job(pool: &PgPool, id: i64) -> Result<DiscountJob, DbError> {
    let row = sqlx::query_as::<_, DiscountJobRow>(
        "SELECT id, public_id, variant_id, discount_percent, start_time, end_time, \
                original_price, original_compare_at, status, last_error, \
                created_at, updated_at, activated_at, completed_at \
         FROM discount_jobs \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    row.into_job()
}

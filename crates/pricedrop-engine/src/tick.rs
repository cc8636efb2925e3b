//! One scheduler tick: revert expired windows, then activate due ones.

use chrono::{DateTime, Utc};
use pricedrop_core::AppConfig;
use pricedrop_shopify::PriceStore;
use serde::Serialize;
use sqlx::PgPool;

use crate::error::EngineError;
use crate::transition::{run_pass, Transition};

const DEFAULT_BATCH_SIZE: i64 = 20;
const DEFAULT_CONCURRENCY: usize = 5;

/// Knobs shared by [`run_tick`] and [`crate::end_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOptions {
    /// Maximum jobs selected per pass.
    pub batch_size: i64,
    /// Maximum jobs in flight at once within a pass.
    pub concurrency: usize,
    /// Take the cross-process tick lease before touching any job.
    pub use_lock: bool,
}

impl Default for TickOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            use_lock: true,
        }
    }
}

impl TickOptions {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            batch_size: config.tick_batch_size,
            concurrency: config.tick_concurrency,
            use_lock: config.tick_lock,
        }
    }
}

/// What a tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    /// Jobs moved `pending → active`.
    pub started: u64,
    /// Jobs moved `active → completed`.
    pub reverted: u64,
    /// One message per job that failed and kept its status.
    pub errors: Vec<String>,
    /// `true` when another tick held the lease and nothing was done.
    pub skipped: bool,
}

impl TickSummary {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

/// Runs one tick at instant `now`.
///
/// Expired `active` jobs are reverted before due `pending` jobs are
/// activated, so back-to-back windows on one variant read the restored price.
/// Per-job failures are collected in [`TickSummary::errors`] and never abort
/// the pass.
///
/// # Errors
///
/// Returns [`EngineError::Db`] if the lease or the due-job selection fails.
pub async fn run_tick<S: PriceStore>(
    pool: &PgPool,
    store: &S,
    options: TickOptions,
    now: DateTime<Utc>,
) -> Result<TickSummary, EngineError> {
    let lease = if options.use_lock {
        match pricedrop_db::try_acquire_tick_lease(pool).await? {
            Some(lease) => Some(lease),
            None => {
                tracing::info!("tick: another tick holds the lease, skipping");
                return Ok(TickSummary::skipped());
            }
        }
    } else {
        None
    };

    let mut summary = TickSummary::default();

    let expired = pricedrop_db::list_due_active_jobs(pool, now, options.batch_size).await?;
    let (reverted, errors) =
        run_pass(pool, store, &expired, options.concurrency, Transition::Revert).await;
    summary.reverted = reverted;
    summary.errors.extend(errors);

    let due = pricedrop_db::list_due_pending_jobs(pool, now, options.batch_size).await?;
    let (started, errors) =
        run_pass(pool, store, &due, options.concurrency, Transition::Activate).await;
    summary.started = started;
    summary.errors.extend(errors);

    if let Some(lease) = lease {
        if let Err(e) = lease.release().await {
            tracing::warn!(error = %e, "tick: failed to release lease cleanly");
        }
    }

    tracing::info!(
        started = summary.started,
        reverted = summary.reverted,
        errors = summary.errors.len(),
        "tick: complete"
    );
    Ok(summary)
}

//! Emergency stop: cancel everything scheduled and restore every live discount.

use pricedrop_shopify::PriceStore;
use serde::Serialize;
use sqlx::PgPool;

use crate::error::EngineError;
use crate::tick::TickOptions;
use crate::transition::{run_pass, Transition};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmergencyStopReport {
    pub cancelled_future_jobs: u64,
    pub reverted_active_jobs: u64,
    pub errors: Vec<String>,
}

impl EmergencyStopReport {
    /// Whether every active job was restored.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Completes every `pending` job without touching prices, then reverts every
/// `active` job regardless of its end time.
///
/// Waits for the tick lease when `options.use_lock` is set, so it never
/// interleaves with a running tick. `options.batch_size` is ignored.
///
/// # Errors
///
/// Returns [`EngineError::Db`] if the lease, the cancellation or the
/// active-job selection fails.
pub async fn end_all<S: PriceStore>(
    pool: &PgPool,
    store: &S,
    options: TickOptions,
) -> Result<EmergencyStopReport, EngineError> {
    let lease = if options.use_lock {
        Some(pricedrop_db::acquire_tick_lease(pool).await?)
    } else {
        None
    };

    let cancelled_future_jobs = pricedrop_db::cancel_pending_jobs(pool).await?;

    let active = pricedrop_db::list_active_jobs(pool).await?;
    let (reverted_active_jobs, errors) =
        run_pass(pool, store, &active, options.concurrency, Transition::Revert).await;

    if let Some(lease) = lease {
        if let Err(e) = lease.release().await {
            tracing::warn!(error = %e, "scheduler: failed to release lease after emergency stop");
        }
    }

    tracing::warn!(
        cancelled_future_jobs,
        reverted_active_jobs,
        errors = errors.len(),
        "scheduler: emergency stop complete"
    );

    Ok(EmergencyStopReport {
        cancelled_future_jobs,
        reverted_active_jobs,
        errors,
    })
}

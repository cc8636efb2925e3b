//! Optional in-process tick.
//!
//! When `PRICEDROP_TICK_CRON` is set the server drives its own ticks instead
//! of waiting for an external caller to hit `/cron`. The tick lease keeps the
//! two from overlapping if both are active.

use std::sync::Arc;

use chrono::Utc;
use pricedrop_engine::TickOptions;
use pricedrop_shopify::ShopifyClient;
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background scheduler if a tick cron is configured.
///
/// Returns `None` when `cron` is `None`. The returned [`JobScheduler`] must be
/// kept alive for the lifetime of the process; dropping it stops the job.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, the
/// cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(
    cron: Option<&str>,
    pool: PgPool,
    shopify: Arc<ShopifyClient>,
    options: TickOptions,
) -> Result<Option<JobScheduler>, JobSchedulerError> {
    let Some(cron) = cron else {
        tracing::info!("scheduler: PRICEDROP_TICK_CRON not set; waiting for external /cron calls");
        return Ok(None);
    };

    let scheduler = JobScheduler::new().await?;
    register_tick_job(&scheduler, cron, pool, shopify, options).await?;
    scheduler.start().await?;
    Ok(Some(scheduler))
}

async fn register_tick_job(
    scheduler: &JobScheduler,
    cron: &str,
    pool: PgPool,
    shopify: Arc<ShopifyClient>,
    options: TickOptions,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let pool = pool.clone();
        let shopify = Arc::clone(&shopify);

        Box::pin(async move {
            match pricedrop_engine::run_tick(&pool, shopify.as_ref(), options, Utc::now()).await {
                Ok(summary) if summary.skipped => {
                    tracing::info!("scheduler: tick skipped, lease held elsewhere");
                }
                Ok(summary) => {
                    tracing::info!(
                        started = summary.started,
                        reverted = summary.reverted,
                        errors = summary.errors.len(),
                        "scheduler: tick complete"
                    );
                }
                Err(e) => tracing::error!(error = %e, "scheduler: tick aborted"),
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: registered tick job");
    Ok(())
}

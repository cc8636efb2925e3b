//! Per-job price transitions shared by the tick and the emergency stop.

use futures::stream::{self, StreamExt};
use pricedrop_core::{parse_price, plan_discount, DiscountJob, JobStatus};
use pricedrop_shopify::PriceStore;
use sqlx::PgPool;

use crate::error::JobError;

/// Applies the stacked discount to a due `pending` job and marks it `active`.
///
/// The price pair is recorded exactly as read so reversion restores the
/// storefront byte-for-byte.
pub(crate) async fn activate_job<S: PriceStore>(
    pool: &PgPool,
    store: &S,
    job: &DiscountJob,
) -> Result<(), JobError> {
    debug_assert!(
        job.status.can_transition_to(JobStatus::Active),
        "job {} selected for activation while {}",
        job.id,
        job.status
    );
    let current = store.read_price(&job.variant_id).await?;

    let current_price = parse_price(&current.price)?;
    let compare_at = current
        .compare_at_price
        .as_deref()
        .map(parse_price)
        .transpose()?;
    let plan = plan_discount(current_price, compare_at, job.discount_percent)?;

    let new_price = plan.new_price_string();
    let new_compare_at = plan.compare_at_string();
    store
        .write_price(&job.variant_id, &new_price, Some(&new_compare_at))
        .await?;

    // A job still `pending` must not leave its discounted price live.
    if let Err(e) = pricedrop_db::mark_job_active(
        pool,
        job.id,
        &current.price,
        current.compare_at_price.as_deref(),
    )
    .await
    {
        if let Err(undo) = store
            .write_price(
                &job.variant_id,
                &current.price,
                current.compare_at_price.as_deref(),
            )
            .await
        {
            tracing::error!(
                job_id = job.id,
                variant_id = %job.variant_id,
                error = %undo,
                "tick: could not restore price after failed activation"
            );
        }
        return Err(e.into());
    }

    tracing::info!(
        job_id = job.id,
        variant_id = %job.variant_id,
        original_price = %current.price,
        new_price = %new_price,
        total_percent = %plan.total_percent,
        "tick: discount applied"
    );
    Ok(())
}

/// Writes the recorded original prices back and marks an `active` job `completed`.
pub(crate) async fn revert_job<S: PriceStore>(
    pool: &PgPool,
    store: &S,
    job: &DiscountJob,
) -> Result<(), JobError> {
    debug_assert!(
        job.status.can_transition_to(JobStatus::Completed),
        "job {} selected for reversion while {}",
        job.id,
        job.status
    );
    let original_price = job
        .original_price
        .as_deref()
        .ok_or(JobError::MissingOriginalPrice(job.id))?;

    store
        .write_price(
            &job.variant_id,
            original_price,
            job.original_compare_at.as_deref(),
        )
        .await?;

    pricedrop_db::mark_job_completed(pool, job.id).await?;

    tracing::info!(
        job_id = job.id,
        variant_id = %job.variant_id,
        restored_price = %original_price,
        "tick: original price restored"
    );
    Ok(())
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Transition {
    Activate,
    Revert,
}

/// Runs `transition` over `jobs` with at most `concurrency` in flight.
///
/// Returns the number of successes and one message per failed job. Each
/// failure is also stored on the job row, best effort.
pub(crate) async fn run_pass<S: PriceStore>(
    pool: &PgPool,
    store: &S,
    jobs: &[DiscountJob],
    concurrency: usize,
    transition: Transition,
) -> (u64, Vec<String>) {
    let pending: Vec<_> = jobs
        .iter()
        .map(|job| async move {
            let outcome = match transition {
                Transition::Activate => activate_job(pool, store, job).await,
                Transition::Revert => revert_job(pool, store, job).await,
            };
            (job, outcome)
        })
        .collect();
    let results: Vec<(&DiscountJob, Result<(), JobError>)> = stream::iter(pending)
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut succeeded: u64 = 0;
    let mut errors = Vec::new();
    for (job, outcome) in results {
        match outcome {
            Ok(()) => succeeded += 1,
            Err(e) => errors.push(record_failure(pool, job, transition, &e).await),
        }
    }
    (succeeded, errors)
}

async fn record_failure(
    pool: &PgPool,
    job: &DiscountJob,
    transition: Transition,
    error: &JobError,
) -> String {
    let action = match transition {
        Transition::Activate => "activate",
        Transition::Revert => "revert",
    };
    tracing::warn!(
        job_id = job.id,
        variant_id = %job.variant_id,
        error = %error,
        "tick: failed to {action} job"
    );

    let message = error.to_string();
    if let Err(e) = pricedrop_db::record_job_error(pool, job.id, &message).await {
        tracing::warn!(job_id = job.id, error = %e, "tick: could not record job error");
    }

    format!("{action} job {} ({}): {message}", job.id, job.variant_id)
}

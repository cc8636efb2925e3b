//! Scheduler commands: a manual tick and the emergency stop.

use chrono::Utc;
use pricedrop_engine::TickOptions;

fn build_shopify_client(
    config: &pricedrop_core::AppConfig,
) -> anyhow::Result<pricedrop_shopify::ShopifyClient> {
    pricedrop_shopify::ShopifyClient::new(
        &config.shopify_store_domain,
        &config.shopify_access_token,
        &config.shopify_api_version,
        config.shopify_timeout_secs,
    )
    .map_err(|e| anyhow::anyhow!("failed to build Shopify client: {e}"))
}

/// Runs one tick and prints its summary.
///
/// When `dry_run` is `true` the due jobs are listed and nothing is written.
///
/// # Errors
///
/// Returns an error if the Shopify client cannot be constructed or the tick
/// aborts. Per-job failures are printed, not propagated.
pub(crate) async fn run_tick(
    pool: &sqlx::PgPool,
    config: &pricedrop_core::AppConfig,
    dry_run: bool,
) -> anyhow::Result<()> {
    let options = TickOptions::from_app_config(config);
    let now = Utc::now();

    if dry_run {
        let expired = pricedrop_db::list_due_active_jobs(pool, now, options.batch_size).await?;
        let due = pricedrop_db::list_due_pending_jobs(pool, now, options.batch_size).await?;
        println!(
            "dry-run: would revert {} job(s) and activate {} job(s)",
            expired.len(),
            due.len()
        );
        for job in expired.iter().chain(&due) {
            println!("  {:>8}  {:<9} {}", job.id, job.status.as_str(), job.variant_id);
        }
        return Ok(());
    }

    let client = build_shopify_client(config)?;
    let summary = pricedrop_engine::run_tick(pool, &client, options, now).await?;

    if summary.skipped {
        tracing::info!("tick: skipped, lease held elsewhere");
        println!("tick skipped: another tick is in progress");
        return Ok(());
    }

    tracing::info!(
        started = summary.started,
        reverted = summary.reverted,
        errors = summary.errors.len(),
        "tick: manual run complete"
    );
    println!(
        "tick complete: started={} reverted={} errors={}",
        summary.started,
        summary.reverted,
        summary.errors.len()
    );
    for error in &summary.errors {
        println!("  error: {error}");
    }
    Ok(())
}

/// Cancels every scheduled job and restores every active discount.
///
/// # Errors
///
/// Returns an error if `confirmed` is `false`, the Shopify client cannot be
/// constructed, the stop aborts, or any active job failed to revert.
pub(crate) async fn run_end_all(
    pool: &sqlx::PgPool,
    config: &pricedrop_core::AppConfig,
    confirmed: bool,
) -> anyhow::Result<()> {
    if !confirmed {
        anyhow::bail!("end-all restores every active discount; re-run with --yes to confirm");
    }

    let client = build_shopify_client(config)?;
    let options = TickOptions::from_app_config(config);
    let report = pricedrop_engine::end_all(pool, &client, options).await?;

    println!(
        "cancelled {} scheduled job(s), restored {} active discount(s)",
        report.cancelled_future_jobs, report.reverted_active_jobs
    );
    for error in &report.errors {
        println!("  error: {error}");
    }

    if !report.is_clean() {
        tracing::error!(
            failed = report.errors.len(),
            "end-all: active jobs left unrestored"
        );
        anyhow::bail!(
            "{} active job(s) could not be restored; they remain active",
            report.errors.len()
        );
    }
    Ok(())
}

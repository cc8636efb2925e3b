//! Live tests for the tick and emergency stop against a migrated database
//! and an in-memory price store.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use pricedrop_core::{JobStatus, NewDiscountJob};
use pricedrop_db::{
    get_discount_job, insert_discount_jobs, list_open_jobs, mark_job_active,
    try_acquire_tick_lease,
};
use pricedrop_engine::{end_all, run_tick, TickOptions};
use pricedrop_shopify::{PriceStore, PriceStoreError, VariantPrice};
use rust_decimal::Decimal;

// ---------------------------------------------------------------------------
// In-memory price store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakePriceStore {
    prices: Mutex<HashMap<String, VariantPrice>>,
    failing: Mutex<HashSet<String>>,
    writes: Mutex<Vec<String>>,
    /// Closes the variant's job behind the engine's back on the next write,
    /// so the following status update finds nothing to move.
    close_job_on_write: Mutex<Option<(sqlx::PgPool, String)>>,
}

impl FakePriceStore {
    fn with_price(self, variant_id: &str, price: &str, compare_at: Option<&str>) -> Self {
        self.prices.lock().unwrap().insert(
            variant_id.to_string(),
            VariantPrice {
                price: price.to_string(),
                compare_at_price: compare_at.map(ToString::to_string),
            },
        );
        self
    }

    fn fail(&self, variant_id: &str) {
        self.failing.lock().unwrap().insert(variant_id.to_string());
    }

    fn heal(&self, variant_id: &str) {
        self.failing.lock().unwrap().remove(variant_id);
    }

    fn close_job_on_next_write(&self, pool: &sqlx::PgPool, variant_id: &str) {
        *self.close_job_on_write.lock().unwrap() = Some((pool.clone(), variant_id.to_string()));
    }

    fn price_of(&self, variant_id: &str) -> VariantPrice {
        self.prices.lock().unwrap()[variant_id].clone()
    }

    fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    fn injected_failure(&self, variant_id: &str) -> Option<PriceStoreError> {
        self.failing
            .lock()
            .unwrap()
            .contains(variant_id)
            .then(|| PriceStoreError::UnexpectedStatus {
                status: 502,
                url: format!("fake://{variant_id}"),
            })
    }
}

impl PriceStore for FakePriceStore {
    async fn read_price(&self, variant_id: &str) -> Result<VariantPrice, PriceStoreError> {
        if let Some(err) = self.injected_failure(variant_id) {
            return Err(err);
        }
        self.prices
            .lock()
            .unwrap()
            .get(variant_id)
            .cloned()
            .ok_or_else(|| PriceStoreError::NotFound {
                url: format!("fake://{variant_id}"),
            })
    }

    async fn write_price(
        &self,
        variant_id: &str,
        price: &str,
        compare_at_price: Option<&str>,
    ) -> Result<(), PriceStoreError> {
        if let Some(err) = self.injected_failure(variant_id) {
            return Err(err);
        }
        self.prices.lock().unwrap().insert(
            variant_id.to_string(),
            VariantPrice {
                price: price.to_string(),
                compare_at_price: compare_at_price.map(ToString::to_string),
            },
        );
        self.writes.lock().unwrap().push(variant_id.to_string());

        let hook = {
            let mut slot = self.close_job_on_write.lock().unwrap();
            let armed = matches!(slot.as_ref(), Some((_, target)) if target == variant_id);
            if armed {
                slot.take()
            } else {
                None
            }
        };
        if let Some((pool, target)) = hook {
            sqlx::query("UPDATE discount_jobs SET status = 'completed' WHERE variant_id = $1")
                .bind(&target)
                .execute(&pool)
                .await
                .unwrap();
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn options() -> TickOptions {
    TickOptions {
        batch_size: 20,
        concurrency: 3,
        use_lock: true,
    }
}

async fn schedule(
    pool: &sqlx::PgPool,
    variants: &[&str],
    percent: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) {
    let ids: Vec<String> = variants.iter().map(ToString::to_string).collect();
    let jobs = NewDiscountJob::batch(&ids, Decimal::new(percent, 0), start, end);
    insert_discount_jobs(pool, &jobs).await.unwrap();
}

async fn job_for(pool: &sqlx::PgPool, variant_id: &str) -> pricedrop_core::DiscountJob {
    let id: i64 = sqlx::query_scalar(
        "SELECT id FROM discount_jobs WHERE variant_id = $1 ORDER BY id DESC LIMIT 1",
    )
    .bind(variant_id)
    .fetch_one(pool)
    .await
    .unwrap();
    get_discount_job(pool, id).await.unwrap()
}

async fn count_with_status(pool: &sqlx::PgPool, status: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM discount_jobs WHERE status = $1")
        .bind(status)
        .fetch_one(pool)
        .await
        .unwrap()
}

// ---------------------------------------------------------------------------
// Activation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn due_job_is_activated_with_stacked_discount(pool: sqlx::PgPool) {
    let now = Utc::now();
    let store = FakePriceStore::default().with_price("4412", "80.00", Some("100.00"));
    schedule(&pool, &["4412"], 10, now - Duration::minutes(1), now + Duration::hours(1)).await;

    let summary = run_tick(&pool, &store, options(), now).await.unwrap();

    assert_eq!(summary.started, 1);
    assert_eq!(summary.reverted, 0);
    assert!(summary.errors.is_empty(), "{:?}", summary.errors);
    assert!(!summary.skipped);

    let live = store.price_of("4412");
    assert_eq!(live.price, "70.00");
    assert_eq!(live.compare_at_price.as_deref(), Some("100.00"));

    let job = job_for(&pool, "4412").await;
    assert_eq!(job.status, JobStatus::Active);
    assert_eq!(job.original_price.as_deref(), Some("80.00"));
    assert_eq!(job.original_compare_at.as_deref(), Some("100.00"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn discount_over_one_hundred_percent_clamps_to_zero(pool: sqlx::PgPool) {
    let now = Utc::now();
    let store = FakePriceStore::default().with_price("9", "10.00", None);
    schedule(&pool, &["9"], 150, now - Duration::minutes(1), now + Duration::hours(1)).await;

    run_tick(&pool, &store, options(), now).await.unwrap();

    let live = store.price_of("9");
    assert_eq!(live.price, "0.00");
    assert_eq!(live.compare_at_price.as_deref(), Some("10.00"));
    assert!(job_for(&pool, "9").await.original_compare_at.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn future_jobs_are_left_pending(pool: sqlx::PgPool) {
    let now = Utc::now();
    let store = FakePriceStore::default().with_price("1", "20.00", None);
    schedule(&pool, &["1"], 10, now + Duration::hours(1), now + Duration::hours(2)).await;

    let summary = run_tick(&pool, &store, options(), now).await.unwrap();

    assert_eq!(summary.started, 0);
    assert_eq!(store.write_count(), 0);
    assert_eq!(job_for(&pool, "1").await.status, JobStatus::Pending);
}

#[sqlx::test(migrations = "../../migrations")]
async fn second_tick_does_not_discount_an_active_job_again(pool: sqlx::PgPool) {
    let now = Utc::now();
    let store = FakePriceStore::default().with_price("4412", "50.00", None);
    schedule(&pool, &["4412"], 20, now - Duration::minutes(1), now + Duration::hours(1)).await;

    run_tick(&pool, &store, options(), now).await.unwrap();
    let second = run_tick(&pool, &store, options(), now).await.unwrap();

    assert_eq!(second.started, 0);
    assert_eq!(store.write_count(), 1);
    assert_eq!(store.price_of("4412").price, "40.00");
    assert_eq!(
        job_for(&pool, "4412").await.original_price.as_deref(),
        Some("50.00")
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn failing_variant_stays_pending_and_does_not_block_others(pool: sqlx::PgPool) {
    let now = Utc::now();
    let store = FakePriceStore::default()
        .with_price("ok", "10.00", None)
        .with_price("broken", "10.00", None);
    store.fail("broken");
    schedule(&pool, &["ok", "broken"], 10, now - Duration::minutes(1), now + Duration::hours(1))
        .await;

    let summary = run_tick(&pool, &store, options(), now).await.unwrap();

    assert_eq!(summary.started, 1);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].contains("broken"), "{:?}", summary.errors);

    let broken = job_for(&pool, "broken").await;
    assert_eq!(broken.status, JobStatus::Pending);
    assert!(broken.last_error.is_some());
    assert_eq!(job_for(&pool, "ok").await.status, JobStatus::Active);

    store.heal("broken");
    let retry = run_tick(&pool, &store, options(), now).await.unwrap();
    assert_eq!(retry.started, 1);
    let healed = job_for(&pool, "broken").await;
    assert_eq!(healed.status, JobStatus::Active);
    assert!(healed.last_error.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn failed_status_update_restores_price_so_retry_keeps_true_original(pool: sqlx::PgPool) {
    let now = Utc::now();
    let store = FakePriceStore::default().with_price("4412", "80.00", Some("100.00"));
    schedule(&pool, &["4412"], 10, now - Duration::minutes(1), now + Duration::hours(1)).await;
    store.close_job_on_next_write(&pool, "4412");

    let summary = run_tick(&pool, &store, options(), now).await.unwrap();

    assert_eq!(summary.started, 0);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].contains("job store"), "{:?}", summary.errors);
    let live = store.price_of("4412");
    assert_eq!(live.price, "80.00");
    assert_eq!(live.compare_at_price.as_deref(), Some("100.00"));
    assert_eq!(store.write_count(), 2);

    sqlx::query("UPDATE discount_jobs SET status = 'pending' WHERE variant_id = '4412'")
        .execute(&pool)
        .await
        .unwrap();
    let retry = run_tick(&pool, &store, options(), now).await.unwrap();

    assert_eq!(retry.started, 1);
    assert_eq!(store.price_of("4412").price, "70.00");
    let job = job_for(&pool, "4412").await;
    assert_eq!(job.status, JobStatus::Active);
    assert_eq!(job.original_price.as_deref(), Some("80.00"));
    assert_eq!(job.original_compare_at.as_deref(), Some("100.00"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn batch_size_caps_jobs_per_pass(pool: sqlx::PgPool) {
    let now = Utc::now();
    let mut store = FakePriceStore::default();
    for id in ["1", "2", "3", "4", "5"] {
        store = store.with_price(id, "10.00", None);
    }
    schedule(
        &pool,
        &["1", "2", "3", "4", "5"],
        10,
        now - Duration::minutes(1),
        now + Duration::hours(1),
    )
    .await;

    let opts = TickOptions {
        batch_size: 2,
        ..options()
    };
    let summary = run_tick(&pool, &store, opts, now).await.unwrap();

    assert_eq!(summary.started, 2);
    assert_eq!(count_with_status(&pool, "pending").await, 3);
}

// ---------------------------------------------------------------------------
// Reversion
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn expired_job_restores_original_prices(pool: sqlx::PgPool) {
    let now = Utc::now();
    let store = FakePriceStore::default().with_price("7", "18.00", Some("20.00"));
    schedule(&pool, &["7"], 10, now - Duration::hours(2), now - Duration::minutes(1)).await;
    let job = job_for(&pool, "7").await;
    mark_job_active(&pool, job.id, "20.00", None).await.unwrap();

    let summary = run_tick(&pool, &store, options(), now).await.unwrap();

    assert_eq!(summary.reverted, 1);
    let live = store.price_of("7");
    assert_eq!(live.price, "20.00");
    assert!(live.compare_at_price.is_none(), "compare-at must be cleared");
    assert_eq!(job_for(&pool, "7").await.status, JobStatus::Completed);
}

#[sqlx::test(migrations = "../../migrations")]
async fn back_to_back_windows_anchor_on_restored_price(pool: sqlx::PgPool) {
    let now = Utc::now();
    let store = FakePriceStore::default().with_price("5", "90.00", Some("100.00"));

    schedule(&pool, &["5"], 10, now - Duration::hours(2), now - Duration::minutes(1)).await;
    let first = job_for(&pool, "5").await;
    mark_job_active(&pool, first.id, "100.00", None).await.unwrap();
    schedule(&pool, &["5"], 25, now - Duration::minutes(1), now + Duration::hours(1)).await;

    let summary = run_tick(&pool, &store, options(), now).await.unwrap();

    assert_eq!(summary.reverted, 1);
    assert_eq!(summary.started, 1);
    let second = job_for(&pool, "5").await;
    assert_eq!(second.original_price.as_deref(), Some("100.00"));
    assert!(second.original_compare_at.is_none());
    assert_eq!(store.price_of("5").price, "75.00");
}

// ---------------------------------------------------------------------------
// Tick lease
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn tick_is_skipped_while_another_holds_the_lease(pool: sqlx::PgPool) {
    let now = Utc::now();
    let store = FakePriceStore::default().with_price("1", "10.00", None);
    schedule(&pool, &["1"], 10, now - Duration::minutes(1), now + Duration::hours(1)).await;

    let lease = try_acquire_tick_lease(&pool).await.unwrap().expect("lease");
    let summary = run_tick(&pool, &store, options(), now).await.unwrap();
    lease.release().await.unwrap();

    assert!(summary.skipped);
    assert_eq!(store.write_count(), 0);
    assert_eq!(job_for(&pool, "1").await.status, JobStatus::Pending);
}

#[sqlx::test(migrations = "../../migrations")]
async fn tick_ignores_lease_when_locking_is_disabled(pool: sqlx::PgPool) {
    let now = Utc::now();
    let store = FakePriceStore::default().with_price("1", "10.00", None);
    schedule(&pool, &["1"], 10, now - Duration::minutes(1), now + Duration::hours(1)).await;

    let lease = try_acquire_tick_lease(&pool).await.unwrap().expect("lease");
    let opts = TickOptions {
        use_lock: false,
        ..options()
    };
    let summary = run_tick(&pool, &store, opts, now).await.unwrap();
    lease.release().await.unwrap();

    assert!(!summary.skipped);
    assert_eq!(summary.started, 1);
}

// ---------------------------------------------------------------------------
// Emergency stop
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn end_all_cancels_pending_and_reverts_active(pool: sqlx::PgPool) {
    let now = Utc::now();
    let store = FakePriceStore::default()
        .with_price("a1", "8.00", Some("10.00"))
        .with_price("a2", "16.00", Some("20.00"));

    schedule(&pool, &["p1", "p2", "p3"], 10, now + Duration::hours(1), now + Duration::hours(2))
        .await;
    schedule(&pool, &["a1", "a2"], 10, now - Duration::hours(1), now + Duration::hours(3)).await;
    for variant in ["a1", "a2"] {
        let job = job_for(&pool, variant).await;
        mark_job_active(&pool, job.id, "10.00", None).await.unwrap();
    }

    let report = end_all(&pool, &store, options()).await.unwrap();

    assert_eq!(report.cancelled_future_jobs, 3);
    assert_eq!(report.reverted_active_jobs, 2);
    assert!(report.is_clean());
    assert_eq!(count_with_status(&pool, "completed").await, 5);
    assert!(list_open_jobs(&pool).await.unwrap().is_empty());
    assert_eq!(store.price_of("a1").price, "10.00");
    assert!(store.price_of("a2").compare_at_price.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn end_all_reports_jobs_that_failed_to_revert(pool: sqlx::PgPool) {
    let now = Utc::now();
    let store = FakePriceStore::default()
        .with_price("good", "9.00", None)
        .with_price("bad", "9.00", None);
    store.fail("bad");

    schedule(&pool, &["good", "bad"], 10, now - Duration::hours(1), now + Duration::hours(1))
        .await;
    for variant in ["good", "bad"] {
        let job = job_for(&pool, variant).await;
        mark_job_active(&pool, job.id, "10.00", None).await.unwrap();
    }

    let report = end_all(&pool, &store, options()).await.unwrap();

    assert_eq!(report.reverted_active_jobs, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(!report.is_clean());
    assert_eq!(job_for(&pool, "bad").await.status, JobStatus::Active);
    assert_eq!(job_for(&pool, "good").await.status, JobStatus::Completed);
}

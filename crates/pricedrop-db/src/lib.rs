//! Postgres persistence for discount jobs.
//!
//! Owns the connection pool, the embedded migrations, the `discount_jobs`
//! queries and the advisory-lock [`TickLease`].

use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

pub mod discount_jobs;
pub mod tick_lease;

pub use discount_jobs::{
    cancel_pending_jobs, get_discount_job, insert_discount_jobs, list_active_jobs,
    list_due_active_jobs, list_due_pending_jobs, list_open_jobs, mark_job_active,
    mark_job_completed, record_job_error, DiscountJobRow,
};
pub use tick_lease::{acquire_tick_lease, try_acquire_tick_lease, TickLease};

// Relative to this crate's Cargo.toml.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,
    #[error("discount job {id} is not in expected status '{expected_status}'")]
    InvalidJobTransition {
        id: i64,
        expected_status: &'static str,
    },
    #[error("discount job {id} has unreadable status '{status}'")]
    CorruptStatus { id: i64, status: String },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Sizing for the shared connection pool.
///
/// A tick holds one connection for its lease while its queries run on
/// others, so `max_connections` must be at least 2 when locking is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_secs: 10,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &pricedrop_core::AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

/// Opens a pool against `database_url`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if no connection can be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, DbError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Applies the embedded migrations and returns how many were newly applied.
///
/// # Errors
///
/// Returns [`DbError::Migration`] if a migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, DbError> {
    let before = applied_migrations(pool).await;
    MIGRATOR.run(pool).await?;
    Ok(applied_migrations(pool).await.saturating_sub(before))
}

/// Number of successful rows in `_sqlx_migrations`; zero on a fresh database
/// where the table does not exist yet.
async fn applied_migrations(pool: &PgPool) -> usize {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success")
        .fetch_one(pool)
        .await
        .ok()
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0)
}

/// Round-trips a trivial query.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the database is unreachable.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_config_defaults_match_documented_env_defaults() {
        assert_eq!(
            PoolConfig::default(),
            PoolConfig {
                max_connections: 10,
                min_connections: 1,
                acquire_timeout_secs: 10,
            }
        );
    }
}

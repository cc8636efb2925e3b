//! Cross-process fence around a scheduler tick.
//!
//! A lease is a transaction holding a transaction-scoped Postgres advisory
//! lock. Committing or dropping the transaction releases the lock, so a
//! crashed holder cannot wedge the scheduler.

use sqlx::{PgPool, Postgres, Transaction};

use crate::DbError;

/// Advisory lock key shared by every process working the `discount_jobs` table.
const TICK_LOCK_KEY: i64 = 0x7072_6963_6564_726f;

/// Proof that the caller holds the tick lock.
pub struct TickLease {
    tx: Transaction<'static, Postgres>,
}

impl std::fmt::Debug for TickLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickLease").finish_non_exhaustive()
    }
}

impl TickLease {
    /// Releases the lock by committing the holding transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the commit fails. The lock is released
    /// either way once the connection drops the transaction.
    pub async fn release(self) -> Result<(), DbError> {
        self.tx.commit().await?;
        Ok(())
    }
}

/// Takes the tick lock if nobody else holds it.
///
/// Returns `None` when another tick is in progress.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a connection cannot be acquired or the lock
/// query fails.
pub async fn try_acquire_tick_lease(pool: &PgPool) -> Result<Option<TickLease>, DbError> {
    let mut tx = pool.begin().await?;
    let acquired: bool = sqlx::query_scalar("SELECT pg_try_advisory_xact_lock($1)")
        .bind(TICK_LOCK_KEY)
        .fetch_one(&mut *tx)
        .await?;

    if acquired {
        Ok(Some(TickLease { tx }))
    } else {
        tx.rollback().await?;
        Ok(None)
    }
}

/// Waits until the tick lock is free, then takes it.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a connection cannot be acquired or the lock
/// query fails.
pub async fn acquire_tick_lease(pool: &PgPool) -> Result<TickLease, DbError> {
    let mut tx = pool.begin().await?;
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(TICK_LOCK_KEY)
        .execute(&mut *tx)
        .await?;
    Ok(TickLease { tx })
}

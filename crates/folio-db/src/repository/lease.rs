//! # Scheduler Lease Repository
//!
//! Cross-process mutual exclusion for periodic jobs, as a row with an expiry.
//!
//! ```text
//! try_acquire("reminders", holder=A, now, ttl)
//!   ├── no row                    → insert, A holds until now + ttl
//!   ├── row expired (any holder)  → take over
//!   ├── row held by A             → extend
//!   └── row held by B, not expired→ refused
//! ```
//!
//! A crashed holder never releases; its lease simply runs out.

use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::DbResult;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct SchedulerLease {
    pub name: String,
    pub holder: String,
    /// Unix seconds.
    pub lease_until: i64,
}

#[derive(Debug, Clone)]
pub struct LeaseRepository {
    pool: SqlitePool,
}

impl LeaseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LeaseRepository { pool }
    }

    /// Attempts to take or extend the named lease. Returns whether `holder`
    /// now holds it.
    pub async fn try_acquire(&self, name: &str, holder: &str, now: i64, ttl_secs: i64) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO scheduler_leases (name, holder, lease_until)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(name) DO UPDATE SET
                holder = excluded.holder,
                lease_until = excluded.lease_until
            WHERE scheduler_leases.lease_until <= ?4
               OR scheduler_leases.holder = excluded.holder
            "#,
        )
        .bind(name)
        .bind(holder)
        .bind(now + ttl_secs)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let acquired = result.rows_affected() > 0;
        debug!(lease = %name, holder = %holder, acquired, "Lease acquisition attempted");
        Ok(acquired)
    }

    /// Releases the lease if `holder` still holds it.
    pub async fn release(&self, name: &str, holder: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM scheduler_leases WHERE name = ?1 AND holder = ?2")
            .bind(name)
            .bind(holder)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn current(&self, name: &str) -> DbResult<Option<SchedulerLease>> {
        let lease = sqlx::query_as::<_, SchedulerLease>(
            "SELECT name, holder, lease_until FROM scheduler_leases WHERE name = ?1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(lease)
    }
}

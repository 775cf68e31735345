//! # Sequence Counter Repository
//!
//! ## Allocation Under Lock
//! ```text
//! BEGIN
//!   UPDATE sequence_counters                 ← first write in the transaction:
//!      SET current_number = current_number + 1    SQLite takes the database
//!    WHERE company_id = ? AND document_kind = ?   write lock here and holds it
//!   RETURNING *                                   until COMMIT / ROLLBACK
//!   ... insert document, line items ...
//! COMMIT
//! ```
//!
//! The increment and the read of the new value are one statement, so two
//! allocations can never observe the same `current_number`. A rolled-back
//! transaction takes its increment with it.

use folio_core::{DocumentKind, SequenceCounter};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct CounterRepository {
    pool: SqlitePool,
}

impl CounterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CounterRepository { pool }
    }

    pub async fn insert(&self, counter: &SequenceCounter) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_in(&mut conn, counter).await
    }

    pub async fn insert_in(conn: &mut SqliteConnection, counter: &SequenceCounter) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sequence_counters (
                company_id, document_kind, prefix, postfix, current_number, number_padding
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&counter.company_id)
        .bind(counter.document_kind)
        .bind(&counter.prefix)
        .bind(&counter.postfix)
        .bind(counter.current_number)
        .bind(counter.number_padding)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Increments the counter and returns it with the new `current_number`.
    ///
    /// Returns `None` if no counter is provisioned for the pair.
    pub async fn increment(
        conn: &mut SqliteConnection,
        company_id: &str,
        kind: DocumentKind,
    ) -> DbResult<Option<SequenceCounter>> {
        let counter = sqlx::query_as::<_, SequenceCounter>(
            r#"
            UPDATE sequence_counters
               SET current_number = current_number + 1
             WHERE company_id = ?1 AND document_kind = ?2
            RETURNING company_id, document_kind, prefix, postfix, current_number, number_padding
            "#,
        )
        .bind(company_id)
        .bind(kind)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(c) = &counter {
            debug!(company_id = %company_id, kind = %kind, number = c.current_number, "Counter incremented");
        }
        Ok(counter)
    }

    pub async fn get(&self, company_id: &str, kind: DocumentKind) -> DbResult<Option<SequenceCounter>> {
        let counter = sqlx::query_as::<_, SequenceCounter>(
            r#"
            SELECT company_id, document_kind, prefix, postfix, current_number, number_padding
            FROM sequence_counters
            WHERE company_id = ?1 AND document_kind = ?2
            "#,
        )
        .bind(company_id)
        .bind(kind)
        .fetch_optional(&self.pool)
        .await?;

        Ok(counter)
    }

    /// Changes how future numbers are formatted. `current_number` is untouched.
    pub async fn update_format(
        &self,
        company_id: &str,
        kind: DocumentKind,
        prefix: &str,
        postfix: &str,
        number_padding: i64,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sequence_counters
               SET prefix = ?3, postfix = ?4, number_padding = ?5
             WHERE company_id = ?1 AND document_kind = ?2
            "#,
        )
        .bind(company_id)
        .bind(kind)
        .bind(prefix)
        .bind(postfix)
        .bind(number_padding)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::fixtures;

    #[tokio::test]
    async fn test_increment_is_monotonic() {
        let db = fixtures::setup().await;

        for expected in 1..=3 {
            let mut tx = db.pool().begin().await.unwrap();
            let counter = CounterRepository::increment(&mut tx, fixtures::COMPANY_ID, DocumentKind::Quote)
                .await
                .unwrap()
                .unwrap();
            tx.commit().await.unwrap();
            assert_eq!(counter.current_number, expected);
        }

        // Invoices have their own counter
        let counter = db.counters().get(fixtures::COMPANY_ID, DocumentKind::Invoice).await.unwrap().unwrap();
        assert_eq!(counter.current_number, 0);
    }

    #[tokio::test]
    async fn test_rollback_discards_increment() {
        let db = fixtures::setup().await;

        let mut tx = db.pool().begin().await.unwrap();
        CounterRepository::increment(&mut tx, fixtures::COMPANY_ID, DocumentKind::Quote)
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        let counter = db.counters().get(fixtures::COMPANY_ID, DocumentKind::Quote).await.unwrap().unwrap();
        assert_eq!(counter.current_number, 0);
    }

    #[tokio::test]
    async fn test_missing_counter_returns_none() {
        let db = fixtures::setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let counter = CounterRepository::increment(&mut conn, "no-such-company", DocumentKind::Quote)
            .await
            .unwrap();
        assert!(counter.is_none());
    }

    #[tokio::test]
    async fn test_second_counter_for_pair_rejected() {
        let db = fixtures::setup().await;
        let dup = SequenceCounter::starting_at(fixtures::COMPANY_ID, DocumentKind::Quote, "X-", "", 2, 1);
        let err = db.counters().insert(&dup).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_update_format_keeps_number() {
        let db = fixtures::setup().await;
        assert!(db
            .counters()
            .update_format(fixtures::COMPANY_ID, DocumentKind::Quote, "QU{YYYY}-", "-A", 6)
            .await
            .unwrap());

        let counter = db.counters().get(fixtures::COMPANY_ID, DocumentKind::Quote).await.unwrap().unwrap();
        assert_eq!(counter.prefix, "QU{YYYY}-");
        assert_eq!(counter.number_padding, 6);
        assert_eq!(counter.current_number, 0);
    }
}

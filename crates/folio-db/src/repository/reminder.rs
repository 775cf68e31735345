//! # Reminder Record Repository
//!
//! One row per (document, reminder type).
//!
//! ```text
//! no row           ──record(success)──►  success = 1   (final)
//! no row           ──record(failure)──►  success = 0
//! success = 0      ──record(any)─────►  overwritten   (retry on a later tick)
//! success = 1      ──record(any)─────►  unchanged, returns false
//! ```

use chrono::{DateTime, Utc};
use folio_core::{ReminderRecord, ReminderType};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct ReminderRepository {
    pool: SqlitePool,
}

impl ReminderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReminderRepository { pool }
    }

    pub async fn find(&self, document_id: &str, reminder_type: ReminderType) -> DbResult<Option<ReminderRecord>> {
        let record = sqlx::query_as::<_, ReminderRecord>(
            r#"
            SELECT id, document_id, reminder_type, recipient, success, error, sent_at
            FROM reminder_records
            WHERE document_id = ?1 AND reminder_type = ?2
            "#,
        )
        .bind(document_id)
        .bind(reminder_type)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Whether a successful reminder of this type was already sent.
    pub async fn has_succeeded(&self, document_id: &str, reminder_type: ReminderType) -> DbResult<bool> {
        Ok(self
            .find(document_id, reminder_type)
            .await?
            .is_some_and(|r| r.success))
    }

    /// Records the outcome of an attempt.
    ///
    /// Returns `false` when a successful record already existed; that record
    /// is left untouched.
    pub async fn record(
        &self,
        document_id: &str,
        reminder_type: ReminderType,
        recipient: &str,
        error: Option<&str>,
        sent_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO reminder_records (id, document_id, reminder_type, recipient, success, error, sent_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(document_id, reminder_type) DO UPDATE SET
                recipient = excluded.recipient,
                success = excluded.success,
                error = excluded.error,
                sent_at = excluded.sent_at
            WHERE reminder_records.success = 0
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(document_id)
        .bind(reminder_type)
        .bind(recipient)
        .bind(error.is_none())
        .bind(error)
        .bind(sent_at)
        .execute(&self.pool)
        .await?;

        let written = result.rows_affected() > 0;
        debug!(
            document_id = %document_id,
            reminder = %reminder_type,
            success = error.is_none(),
            written,
            "Reminder outcome recorded"
        );
        Ok(written)
    }

    pub async fn list_for_document(&self, document_id: &str) -> DbResult<Vec<ReminderRecord>> {
        let records = sqlx::query_as::<_, ReminderRecord>(
            r#"
            SELECT id, document_id, reminder_type, recipient, success, error, sent_at
            FROM reminder_records
            WHERE document_id = ?1
            ORDER BY sent_at ASC
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

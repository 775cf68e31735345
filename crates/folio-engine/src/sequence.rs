//! # Sequence Allocator
//!
//! Hands out gapless, strictly increasing document numbers per
//! (company, document kind).
//!
//! ## Locking
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    UPDATE sequence_counters SET current_number = current_number + 1     │
//! │     WHERE company_id = ? AND document_kind = ?                          │
//! │    RETURNING ...          ◄── takes the SQLite write lock; a second     │
//! │                               allocator blocks here (busy_timeout)      │
//! │    ... caller inserts the document in the same transaction ...          │
//! │  COMMIT                   ◄── lock released, next allocator proceeds    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The increment is the first statement of the transaction, so the lock is
//! taken before anything is read and two allocations can never observe the
//! same `current_number`. A rolled-back transaction rolls back the increment
//! with it.
//!
//! The formatted string is never parsed back; the integer counter is the
//! only source of truth.

use chrono::NaiveDate;
use folio_core::numbering::format_sequence_number;
use folio_core::DocumentKind;
use folio_db::{CounterRepository, Database};
use sqlx::SqliteConnection;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::{EngineError, EngineResult};

/// A freshly allocated number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatedNumber {
    /// Raw counter value after the increment.
    pub number: i64,
    /// `prefix + zero-padded(number) + postfix`, date tokens resolved.
    pub formatted: String,
}

#[derive(Clone)]
pub struct SequenceAllocator {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl SequenceAllocator {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        SequenceAllocator { db, clock }
    }

    /// Allocates and commits the next number on its own.
    ///
    /// Document creation does not use this; it calls [`Self::allocate_in`]
    /// so the number and the document commit together.
    pub async fn allocate(&self, company_id: &str, kind: DocumentKind) -> EngineResult<AllocatedNumber> {
        let mut tx = self.db.begin_write().await?;
        let allocated = Self::allocate_in(&mut tx, company_id, kind, self.clock.today()).await?;
        tx.commit().await?;
        Ok(allocated)
    }

    /// Allocates inside the caller's transaction. Must be the first write
    /// of that transaction.
    pub async fn allocate_in(
        conn: &mut SqliteConnection,
        company_id: &str,
        kind: DocumentKind,
        date: NaiveDate,
    ) -> EngineResult<AllocatedNumber> {
        let Some(counter) = CounterRepository::increment(conn, company_id, kind).await? else {
            warn!(company_id = %company_id, kind = %kind, "No sequence counter provisioned");
            return Err(EngineError::ConfigurationMissing {
                company_id: company_id.to_string(),
                kind,
            });
        };

        let formatted = format_sequence_number(
            &counter.prefix,
            counter.current_number,
            &counter.postfix,
            counter.number_padding,
            date,
        );

        debug!(
            company_id = %company_id,
            kind = %kind,
            number = counter.current_number,
            formatted = %formatted,
            "Allocated document number"
        );

        Ok(AllocatedNumber {
            number: counter.current_number,
            formatted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::testing;
    use chrono::{TimeZone, Utc};
    use folio_core::SequenceCounter;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_allocates_sequentially() {
        let (db, clock) = testing::setup().await;
        let allocator = SequenceAllocator::new(db, clock);

        let first = allocator.allocate(testing::COMPANY_ID, DocumentKind::Quote).await.unwrap();
        let second = allocator.allocate(testing::COMPANY_ID, DocumentKind::Quote).await.unwrap();
        let invoice = allocator.allocate(testing::COMPANY_ID, DocumentKind::Invoice).await.unwrap();

        assert_eq!(first.formatted, "Q-0001");
        assert_eq!(second.formatted, "Q-0002");
        assert_eq!(invoice.formatted, "INV-0001");
    }

    #[tokio::test]
    async fn test_missing_counter_is_configuration_error() {
        let (db, clock) = testing::setup().await;
        let allocator = SequenceAllocator::new(db, clock);

        let err = allocator.allocate("unknown-co", DocumentKind::Quote).await.unwrap_err();
        assert!(matches!(err, EngineError::ConfigurationMissing { kind: DocumentKind::Quote, .. }));
    }

    #[tokio::test]
    async fn test_date_tokens_use_allocation_date() {
        let (db, _) = testing::setup().await;
        let company = testing::company("dated-co", folio_core::PlanTier::Pro);
        db.companies()
            .provision(
                &company,
                &[SequenceCounter::starting_at("dated-co", DocumentKind::Invoice, "INV-{YYYY}-", "", 5, 100)],
            )
            .await
            .unwrap();

        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2027, 1, 2, 9, 0, 0).unwrap()));
        let allocator = SequenceAllocator::new(db, clock);

        let allocated = allocator.allocate("dated-co", DocumentKind::Invoice).await.unwrap();
        assert_eq!(allocated.number, 100);
        assert_eq!(allocated.formatted, "INV-2027-00100");
    }

    #[tokio::test]
    async fn test_rolled_back_allocation_is_not_observed() {
        let (db, clock) = testing::setup().await;
        let today = clock.today();

        let mut tx = db.pool().begin().await.unwrap();
        let n = SequenceAllocator::allocate_in(&mut tx, testing::COMPANY_ID, DocumentKind::Quote, today)
            .await
            .unwrap();
        assert_eq!(n.number, 1);
        tx.rollback().await.unwrap();

        let allocator = SequenceAllocator::new(db, clock);
        let next = allocator.allocate(testing::COMPANY_ID, DocumentKind::Quote).await.unwrap();
        assert_eq!(next.number, 1);
    }

    #[tokio::test]
    async fn test_concurrent_allocations_are_gapless() {
        let dir = tempfile::tempdir().unwrap();
        let (db, clock) = testing::setup_file(&dir.path().join("alloc.db")).await;
        let allocator = SequenceAllocator::new(db, clock);

        let mut handles = Vec::new();
        for _ in 0..20 {
            let allocator = allocator.clone();
            handles.push(tokio::spawn(async move {
                allocator.allocate(testing::COMPANY_ID, DocumentKind::Quote).await
            }));
        }

        let mut numbers = Vec::new();
        for handle in handles {
            numbers.push(handle.await.unwrap().unwrap().number);
        }
        numbers.sort_unstable();

        let distinct: HashSet<_> = numbers.iter().copied().collect();
        assert_eq!(distinct.len(), 20);
        assert_eq!(numbers, (1..=20).collect::<Vec<i64>>());
    }
}

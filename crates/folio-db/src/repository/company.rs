//! # Company Repository
//!
//! Companies own everything else. A company is only usable once its sequence
//! counters exist, so [`CompanyRepository::provision`] writes both in one
//! transaction.

use folio_core::{Company, PlanTier, SequenceCounter};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::repository::counter::CounterRepository;

#[derive(Debug, Clone)]
pub struct CompanyRepository {
    pool: SqlitePool,
}

impl CompanyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CompanyRepository { pool }
    }

    /// Inserts a company together with its sequence counters.
    ///
    /// Fails with [`DbError::UniqueViolation`] if the company or any
    /// (company, kind) counter already exists; nothing is written in that case.
    pub async fn provision(&self, company: &Company, counters: &[SequenceCounter]) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO companies (id, name, plan, currency, merchant_account_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&company.id)
        .bind(&company.name)
        .bind(company.plan)
        .bind(&company.currency)
        .bind(&company.merchant_account_id)
        .bind(company.created_at)
        .execute(&mut *tx)
        .await?;

        for counter in counters {
            if counter.company_id != company.id {
                return Err(DbError::ForeignKeyViolation {
                    message: format!(
                        "counter for {} provisioned under company {}",
                        counter.company_id, company.id
                    ),
                });
            }
            CounterRepository::insert_in(&mut tx, counter).await?;
        }

        tx.commit().await?;

        info!(
            company_id = %company.id,
            plan = %company.plan,
            counters = counters.len(),
            "Company provisioned"
        );
        Ok(())
    }

    pub async fn get(&self, id: &str) -> DbResult<Company> {
        let mut conn = self.pool.acquire().await?;
        Self::get_in(&mut conn, id).await
    }

    pub async fn get_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Company> {
        sqlx::query_as::<_, Company>(
            r#"
            SELECT id, name, plan, currency, merchant_account_id, created_at
            FROM companies
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Company", id))
    }

    /// Changes the subscription tier. Takes effect for the next new document.
    pub async fn set_plan(&self, id: &str, plan: PlanTier) -> DbResult<()> {
        let result = sqlx::query("UPDATE companies SET plan = ?2 WHERE id = ?1")
            .bind(id)
            .bind(plan)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Company", id));
        }
        Ok(())
    }

    pub async fn set_merchant_account(&self, id: &str, merchant_account_id: Option<&str>) -> DbResult<()> {
        let result = sqlx::query("UPDATE companies SET merchant_account_id = ?2 WHERE id = ?1")
            .bind(id)
            .bind(merchant_account_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Company", id));
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::fixtures;
    use folio_core::DocumentKind;

    #[tokio::test]
    async fn test_provision_writes_company_and_counters() {
        let db = fixtures::setup().await;

        let company = db.companies().get(fixtures::COMPANY_ID).await.unwrap();
        assert_eq!(company.plan, PlanTier::Free);
        assert_eq!(company.currency, "AUD");

        for kind in DocumentKind::ALL {
            let counter = db.counters().get(fixtures::COMPANY_ID, kind).await.unwrap();
            assert_eq!(counter.unwrap().current_number, 0);
        }
    }

    #[tokio::test]
    async fn test_duplicate_counter_rolls_back_company() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut counters = fixtures::counters("co-2");
        counters.push(counters[0].clone());

        let err = db
            .companies()
            .provision(&fixtures::company("co-2", PlanTier::Pro), &counters)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        assert!(db.companies().get("co-2").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_set_plan() {
        let db = fixtures::setup().await;
        db.companies().set_plan(fixtures::COMPANY_ID, PlanTier::Pro).await.unwrap();
        assert_eq!(db.companies().get(fixtures::COMPANY_ID).await.unwrap().plan, PlanTier::Pro);

        assert!(db.companies().set_plan("missing", PlanTier::Pro).await.is_err());
    }
}

//! # Approval Token Repository
//!
//! ```text
//! approval_tokens  PRIMARY KEY (client_id, company_id, token_type)
//!
//! upsert(key, new token)  ──►  INSERT ... ON CONFLICT(key) DO UPDATE
//!                              the previous token string is gone; presenting
//!                              it again no longer matches the stored row
//! ```
//!
//! Expiries are unix seconds so comparisons happen in SQL against a `now`
//! supplied by the caller.

use folio_core::{ApprovalToken, TokenType};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct TokenRepository {
    pool: SqlitePool,
}

impl TokenRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TokenRepository { pool }
    }

    /// Inserts the token, replacing any existing row for its key.
    pub async fn upsert(conn: &mut SqliteConnection, token: &ApprovalToken) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO approval_tokens (client_id, company_id, token_type, document_id, token, expires_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(client_id, company_id, token_type) DO UPDATE SET
                document_id = excluded.document_id,
                token = excluded.token,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(&token.client_id)
        .bind(&token.company_id)
        .bind(token.token_type)
        .bind(&token.document_id)
        .bind(&token.token)
        .bind(token.expires_at)
        .execute(&mut *conn)
        .await?;

        debug!(
            client_id = %token.client_id,
            company_id = %token.company_id,
            token_type = %token.token_type,
            document_id = %token.document_id,
            "Approval token stored"
        );
        Ok(())
    }

    pub async fn find(
        &self,
        client_id: &str,
        company_id: &str,
        token_type: TokenType,
    ) -> DbResult<Option<ApprovalToken>> {
        let mut conn = self.pool.acquire().await?;
        Self::find_in(&mut conn, client_id, company_id, token_type).await
    }

    pub async fn find_in(
        conn: &mut SqliteConnection,
        client_id: &str,
        company_id: &str,
        token_type: TokenType,
    ) -> DbResult<Option<ApprovalToken>> {
        let token = sqlx::query_as::<_, ApprovalToken>(
            r#"
            SELECT client_id, company_id, token_type, document_id, token, expires_at
            FROM approval_tokens
            WHERE client_id = ?1 AND company_id = ?2 AND token_type = ?3
            "#,
        )
        .bind(client_id)
        .bind(company_id)
        .bind(token_type)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(token)
    }

    /// Deletes the row for a key. Returns whether a row existed.
    pub async fn delete(
        conn: &mut SqliteConnection,
        client_id: &str,
        company_id: &str,
        token_type: TokenType,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "DELETE FROM approval_tokens WHERE client_id = ?1 AND company_id = ?2 AND token_type = ?3",
        )
        .bind(client_id)
        .bind(company_id)
        .bind(token_type)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes the key's row only if it still points at `document_id`.
    ///
    /// The key is per client, so a newer link for another document of the
    /// same client must survive a decision on this one.
    pub async fn delete_for_document(
        conn: &mut SqliteConnection,
        client_id: &str,
        company_id: &str,
        token_type: TokenType,
        document_id: &str,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM approval_tokens
            WHERE client_id = ?1 AND company_id = ?2 AND token_type = ?3 AND document_id = ?4
            "#,
        )
        .bind(client_id)
        .bind(company_id)
        .bind(token_type)
        .bind(document_id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes tokens whose expiry is at or before `now` (unix seconds).
    pub async fn delete_expired(&self, now: i64) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM approval_tokens WHERE expires_at <= ?1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures;

    fn token(document_id: &str, value: &str, expires_at: i64) -> ApprovalToken {
        ApprovalToken {
            client_id: fixtures::CLIENT_ID.to_string(),
            company_id: fixtures::COMPANY_ID.to_string(),
            token_type: TokenType::QuoteToken,
            document_id: document_id.to_string(),
            token: value.to_string(),
            expires_at,
        }
    }

    #[tokio::test]
    async fn test_upsert_overwrites_key() {
        let db = fixtures::setup().await;

        let mut tx = db.pool().begin().await.unwrap();
        TokenRepository::upsert(&mut tx, &token("doc-1", "first", 100)).await.unwrap();
        TokenRepository::upsert(&mut tx, &token("doc-2", "second", 200)).await.unwrap();
        tx.commit().await.unwrap();

        let stored = db
            .tokens()
            .find(fixtures::CLIENT_ID, fixtures::COMPANY_ID, TokenType::QuoteToken)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.token, "second");
        assert_eq!(stored.document_id, "doc-2");
        assert_eq!(stored.expires_at, 200);

        let invoice = db
            .tokens()
            .find(fixtures::CLIENT_ID, fixtures::COMPANY_ID, TokenType::InvoiceToken)
            .await
            .unwrap();
        assert!(invoice.is_none());
    }

    #[tokio::test]
    async fn test_delete_for_document_checks_document() {
        let db = fixtures::setup().await;
        let mut tx = db.pool().begin().await.unwrap();
        TokenRepository::upsert(&mut tx, &token("doc-2", "second", 200)).await.unwrap();

        let key = (fixtures::CLIENT_ID, fixtures::COMPANY_ID, TokenType::QuoteToken);
        assert!(!TokenRepository::delete_for_document(&mut tx, key.0, key.1, key.2, "doc-1").await.unwrap());
        assert!(TokenRepository::delete_for_document(&mut tx, key.0, key.1, key.2, "doc-2").await.unwrap());
        assert!(!TokenRepository::delete(&mut tx, key.0, key.1, key.2).await.unwrap());
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_expired() {
        let db = fixtures::setup().await;
        let mut tx = db.pool().begin().await.unwrap();
        TokenRepository::upsert(&mut tx, &token("doc-1", "old", 100)).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(db.tokens().delete_expired(99).await.unwrap(), 0);
        assert_eq!(db.tokens().delete_expired(100).await.unwrap(), 1);
    }
}

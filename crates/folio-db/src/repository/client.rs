//! # Client Repository
//!
//! Clients are the recipients of documents, approval links and reminders.

use folio_core::Client;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};

#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
}

impl ClientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ClientRepository { pool }
    }

    pub async fn insert(&self, client: &Client) -> DbResult<()> {
        debug!(client_id = %client.id, company_id = %client.company_id, "Inserting client");

        sqlx::query(
            r#"
            INSERT INTO clients (id, company_id, name, email, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&client.id)
        .bind(&client.company_id)
        .bind(&client.name)
        .bind(&client.email)
        .bind(client.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get(&self, id: &str) -> DbResult<Client> {
        let mut conn = self.pool.acquire().await?;
        Self::get_in(&mut conn, id).await
    }

    pub async fn get_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Client> {
        sqlx::query_as::<_, Client>(
            r#"
            SELECT id, company_id, name, email, created_at
            FROM clients
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Client", id))
    }

    pub async fn list_for_company(&self, company_id: &str) -> DbResult<Vec<Client>> {
        let clients = sqlx::query_as::<_, Client>(
            r#"
            SELECT id, company_id, name, email, created_at
            FROM clients
            WHERE company_id = ?1
            ORDER BY name ASC
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(clients)
    }
}

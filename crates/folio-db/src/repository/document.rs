//! # Document Repository
//!
//! Quotes and invoices share one table; line items live in their own table
//! and are always written and read together with their parent.
//!
//! ## Revision Chain
//! ```text
//! documents
//! ┌──────────┬─────────┬──────────┬─────┬──────────┐
//! │ id       │ kind    │ number   │ rev │ status   │
//! ├──────────┼─────────┼──────────┼─────┼──────────┤
//! │ doc-a    │ quote   │ Q-0001   │  0  │ rejected │  ← read-only forever
//! │ doc-b    │ quote   │ Q-0001   │  1  │ sent     │  ← read-only forever
//! │ doc-c    │ quote   │ Q-0001   │  2  │ pending  │  ← latest, editable
//! └──────────┴─────────┴──────────┴─────┴──────────┘
//!   UNIQUE (company_id, kind, document_number, revision_number)
//! ```
//!
//! Every status-sensitive write carries the status the caller observed in its
//! `WHERE` clause, so a row that changed underneath the caller is left alone
//! and the write reports `false`.

use chrono::{DateTime, NaiveDate, Utc};
use folio_core::{DiscountType, Document, DocumentKind, DocumentStatus, LineItem};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};

macro_rules! select_documents {
    ($rest:literal) => {
        concat!(
            "SELECT id, company_id, client_id, kind, document_number, revision_number, status, ",
            "issue_date, due_date, discount_type, discount_value, total_price_cents, total_gst_cents, ",
            "notes, client_notes, created_by, created_at, updated_at FROM documents ",
            $rest
        )
    };
}

const SELECT_DOCUMENTS: &str = select_documents!("WHERE 1 = 1");

/// Raw `documents` row. `status` is stored as text and only meaningful
/// together with `kind`.
#[derive(Debug, FromRow)]
struct DocumentRow {
    id: String,
    company_id: String,
    client_id: String,
    kind: DocumentKind,
    document_number: String,
    revision_number: i64,
    status: String,
    issue_date: NaiveDate,
    due_date: NaiveDate,
    discount_type: DiscountType,
    discount_value: i64,
    total_price_cents: i64,
    total_gst_cents: i64,
    notes: Option<String>,
    client_notes: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DocumentRow {
    fn into_document(self, line_items: Vec<LineItem>) -> DbResult<Document> {
        let status = DocumentStatus::parse(self.kind, &self.status).ok_or_else(|| {
            DbError::corrupt(
                "Document",
                &self.id,
                format!("unknown {} status '{}'", self.kind, self.status),
            )
        })?;

        Ok(Document {
            id: self.id,
            company_id: self.company_id,
            client_id: self.client_id,
            kind: self.kind,
            document_number: self.document_number,
            revision_number: self.revision_number,
            status,
            issue_date: self.issue_date,
            due_date: self.due_date,
            line_items,
            discount_type: self.discount_type,
            discount_value: self.discount_value,
            total_price_cents: self.total_price_cents,
            total_gst_cents: self.total_gst_cents,
            notes: self.notes,
            client_notes: self.client_notes,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DocumentRepository {
    pool: SqlitePool,
}

impl DocumentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DocumentRepository { pool }
    }

    // =========================================================================
    // Writes (caller-owned transaction)
    // =========================================================================

    /// Inserts a document and all of its line items.
    pub async fn insert(conn: &mut SqliteConnection, doc: &Document) -> DbResult<()> {
        debug!(
            document_id = %doc.id,
            number = %doc.document_number,
            revision = doc.revision_number,
            "Inserting document"
        );

        sqlx::query(
            r#"
            INSERT INTO documents (
                id, company_id, client_id, kind, document_number, revision_number, status,
                issue_date, due_date, discount_type, discount_value,
                total_price_cents, total_gst_cents, notes, client_notes,
                created_by, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7,
                ?8, ?9, ?10, ?11,
                ?12, ?13, ?14, ?15,
                ?16, ?17, ?18
            )
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.company_id)
        .bind(&doc.client_id)
        .bind(doc.kind)
        .bind(&doc.document_number)
        .bind(doc.revision_number)
        .bind(doc.status.as_str())
        .bind(doc.issue_date)
        .bind(doc.due_date)
        .bind(doc.discount_type)
        .bind(doc.discount_value)
        .bind(doc.total_price_cents)
        .bind(doc.total_gst_cents)
        .bind(&doc.notes)
        .bind(&doc.client_notes)
        .bind(&doc.created_by)
        .bind(doc.created_at)
        .bind(doc.updated_at)
        .execute(&mut *conn)
        .await?;

        Self::insert_line_items(conn, &doc.line_items).await
    }

    /// Overwrites the editable content of a document and replaces its line
    /// items, provided the stored status is still `expected_status`.
    ///
    /// Number, revision, kind, company and creator are never changed.
    pub async fn update(
        conn: &mut SqliteConnection,
        doc: &Document,
        expected_status: DocumentStatus,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE documents SET
                client_id = ?3,
                status = ?4,
                issue_date = ?5,
                due_date = ?6,
                discount_type = ?7,
                discount_value = ?8,
                total_price_cents = ?9,
                total_gst_cents = ?10,
                notes = ?11,
                updated_at = ?12
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(&doc.id)
        .bind(expected_status.as_str())
        .bind(&doc.client_id)
        .bind(doc.status.as_str())
        .bind(doc.issue_date)
        .bind(doc.due_date)
        .bind(doc.discount_type)
        .bind(doc.discount_value)
        .bind(doc.total_price_cents)
        .bind(doc.total_gst_cents)
        .bind(&doc.notes)
        .bind(doc.updated_at)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("DELETE FROM line_items WHERE document_id = ?1")
            .bind(&doc.id)
            .execute(&mut *conn)
            .await?;
        Self::insert_line_items(conn, &doc.line_items).await?;

        debug!(document_id = %doc.id, lines = doc.line_items.len(), "Document updated");
        Ok(true)
    }

    async fn insert_line_items(conn: &mut SqliteConnection, items: &[LineItem]) -> DbResult<()> {
        for item in items {
            sqlx::query(
                r#"
                INSERT INTO line_items (
                    id, document_id, position, description, quantity,
                    unit_price_cents, gst_rate_bps, line_total_cents, line_gst_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(&item.id)
            .bind(&item.document_id)
            .bind(item.position)
            .bind(&item.description)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.gst_rate_bps)
            .bind(item.line_total_cents)
            .bind(item.line_gst_cents)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    /// Moves a document from `from` to `to`.
    ///
    /// `client_notes` replaces the client-visible response note when given.
    pub async fn set_status(
        conn: &mut SqliteConnection,
        id: &str,
        from: DocumentStatus,
        to: DocumentStatus,
        client_notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE documents SET
                status = ?3,
                client_notes = COALESCE(?4, client_notes),
                updated_at = ?5
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(client_notes)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a document (line items cascade) if its status is still
    /// `expected_status`.
    pub async fn delete(
        conn: &mut SqliteConnection,
        id: &str,
        expected_status: DocumentStatus,
    ) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?1 AND status = ?2")
            .bind(id)
            .bind(expected_status.as_str())
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get(&self, id: &str) -> DbResult<Document> {
        let mut conn = self.pool.acquire().await?;
        Self::get_in(&mut conn, id).await
    }

    pub async fn get_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Document> {
        Self::find_in(conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Document", id))
    }

    pub async fn find_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Document>> {
        let row = sqlx::query_as::<_, DocumentRow>(select_documents!("WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => Ok(Some(Self::hydrate(conn, row).await?)),
            None => Ok(None),
        }
    }

    /// Highest revision of a document number.
    pub async fn latest_revision_in(
        conn: &mut SqliteConnection,
        company_id: &str,
        kind: DocumentKind,
        document_number: &str,
    ) -> DbResult<Option<Document>> {
        let row = sqlx::query_as::<_, DocumentRow>(select_documents!(
            "WHERE company_id = ?1 AND kind = ?2 AND document_number = ?3 \
             ORDER BY revision_number DESC LIMIT 1"
        ))
        .bind(company_id)
        .bind(kind)
        .bind(document_number)
        .fetch_optional(&mut *conn)
        .await?;

        match row {
            Some(row) => Ok(Some(Self::hydrate(conn, row).await?)),
            None => Ok(None),
        }
    }

    /// Highest revision number of a document number, without loading it.
    pub async fn latest_revision_number_in(
        conn: &mut SqliteConnection,
        company_id: &str,
        kind: DocumentKind,
        document_number: &str,
    ) -> DbResult<Option<i64>> {
        let latest: Option<i64> = sqlx::query_scalar(
            "SELECT MAX(revision_number) FROM documents \
             WHERE company_id = ?1 AND kind = ?2 AND document_number = ?3",
        )
        .bind(company_id)
        .bind(kind)
        .bind(document_number)
        .fetch_one(&mut *conn)
        .await?;

        Ok(latest)
    }

    pub async fn latest_revision(
        &self,
        company_id: &str,
        kind: DocumentKind,
        document_number: &str,
    ) -> DbResult<Option<Document>> {
        let mut conn = self.pool.acquire().await?;
        Self::latest_revision_in(&mut conn, company_id, kind, document_number).await
    }

    /// All revisions of a document number, oldest first.
    pub async fn revision_history(
        &self,
        company_id: &str,
        kind: DocumentKind,
        document_number: &str,
    ) -> DbResult<Vec<Document>> {
        let mut conn = self.pool.acquire().await?;

        let rows = sqlx::query_as::<_, DocumentRow>(select_documents!(
            "WHERE company_id = ?1 AND kind = ?2 AND document_number = ?3 \
             ORDER BY revision_number ASC"
        ))
        .bind(company_id)
        .bind(kind)
        .bind(document_number)
        .fetch_all(&mut *conn)
        .await?;

        let mut docs = Vec::with_capacity(rows.len());
        for row in rows {
            docs.push(Self::hydrate(&mut conn, row).await?);
        }
        Ok(docs)
    }

    /// Brand-new documents (revision 0) of `kind` created at or after `since`.
    pub async fn count_created_since(
        conn: &mut SqliteConnection,
        company_id: &str,
        kind: DocumentKind,
        since: DateTime<Utc>,
    ) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM documents
            WHERE company_id = ?1 AND kind = ?2 AND revision_number = 0 AND created_at >= ?3
            "#,
        )
        .bind(company_id)
        .bind(kind)
        .bind(since)
        .fetch_one(&mut *conn)
        .await?;

        Ok(count)
    }

    /// One page of documents of `kind` in `status` whose due/expiry date is
    /// one of `dates`, ordered by (due_date, id) and starting after `after`.
    ///
    /// Superseded quote revisions are never returned. Used by the reminder
    /// scheduler, across all companies.
    pub async fn find_due_on(
        &self,
        kind: DocumentKind,
        status: DocumentStatus,
        dates: &[NaiveDate],
        after: Option<(NaiveDate, &str)>,
        limit: u32,
    ) -> DbResult<Vec<Document>> {
        if dates.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(SELECT_DOCUMENTS);
        qb.push(" AND kind = ").push_bind(kind);
        qb.push(" AND status = ").push_bind(status.as_str());
        qb.push(" AND due_date IN (");
        let mut separated = qb.separated(", ");
        for date in dates {
            separated.push_bind(*date);
        }
        separated.push_unseparated(")");
        qb.push(
            " AND NOT EXISTS (SELECT 1 FROM documents AS newer \
             WHERE newer.company_id = documents.company_id \
             AND newer.kind = documents.kind \
             AND newer.document_number = documents.document_number \
             AND newer.revision_number > documents.revision_number)",
        );
        if let Some((due_date, id)) = after {
            qb.push(" AND (due_date > ").push_bind(due_date);
            qb.push(" OR (due_date = ").push_bind(due_date);
            qb.push(" AND id > ").push_bind(id.to_string());
            qb.push("))");
        }
        qb.push(" ORDER BY due_date ASC, id ASC LIMIT ").push_bind(limit);

        let mut conn = self.pool.acquire().await?;
        let rows = qb.build_query_as::<DocumentRow>().fetch_all(&mut *conn).await?;

        let mut docs = Vec::with_capacity(rows.len());
        for row in rows {
            docs.push(Self::hydrate(&mut conn, row).await?);
        }

        debug!(kind = %kind, count = docs.len(), "Found documents due on trigger dates");
        Ok(docs)
    }

    async fn hydrate(conn: &mut SqliteConnection, row: DocumentRow) -> DbResult<Document> {
        let items = sqlx::query_as::<_, LineItem>(
            r#"
            SELECT id, document_id, position, description, quantity,
                   unit_price_cents, gst_rate_bps, line_total_cents, line_gst_cents
            FROM line_items
            WHERE document_id = ?1
            ORDER BY position ASC
            "#,
        )
        .bind(&row.id)
        .fetch_all(&mut *conn)
        .await?;

        row.into_document(items)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures;
    use chrono::Duration;
    use folio_core::{InvoiceStatus, QuoteStatus};

    fn quote(id: &str, number: &str, revision: i64, status: QuoteStatus) -> Document {
        let now = Utc::now();
        Document {
            id: id.to_string(),
            company_id: fixtures::COMPANY_ID.to_string(),
            client_id: fixtures::CLIENT_ID.to_string(),
            kind: DocumentKind::Quote,
            document_number: number.to_string(),
            revision_number: revision,
            status: DocumentStatus::Quote(status),
            issue_date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
            line_items: vec![LineItem {
                id: format!("{id}-li-0"),
                document_id: id.to_string(),
                position: 0,
                description: "Design".to_string(),
                quantity: 2,
                unit_price_cents: 5000,
                gst_rate_bps: 1000,
                line_total_cents: 11000,
                line_gst_cents: 1000,
            }],
            discount_type: DiscountType::Percent,
            discount_value: 1000,
            total_price_cents: 9900,
            total_gst_cents: 1000,
            notes: Some("Valid for 30 days".to_string()),
            client_notes: None,
            created_by: "user-1".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    async fn insert(db: &crate::Database, doc: &Document) {
        let mut tx = db.pool().begin().await.unwrap();
        DocumentRepository::insert(&mut tx, doc).await.unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_and_get_roundtrips_line_items() {
        let db = fixtures::setup().await;
        let doc = quote("doc-1", "Q-0001", 0, QuoteStatus::Pending);
        insert(&db, &doc).await;

        let loaded = db.documents().get("doc-1").await.unwrap();
        assert_eq!(loaded.status, DocumentStatus::Quote(QuoteStatus::Pending));
        assert_eq!(loaded.line_items, doc.line_items);
        assert_eq!(loaded.total_price_cents, 9900);
        assert_eq!(loaded.issue_date, doc.issue_date);
    }

    #[tokio::test]
    async fn test_duplicate_revision_rejected() {
        let db = fixtures::setup().await;
        insert(&db, &quote("doc-1", "Q-0001", 0, QuoteStatus::Pending)).await;

        let mut tx = db.pool().begin().await.unwrap();
        let err = DocumentRepository::insert(&mut tx, &quote("doc-2", "Q-0001", 0, QuoteStatus::Pending))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_latest_revision_and_history() {
        let db = fixtures::setup().await;
        insert(&db, &quote("doc-a", "Q-0001", 0, QuoteStatus::Rejected)).await;
        insert(&db, &quote("doc-b", "Q-0001", 1, QuoteStatus::Sent)).await;
        insert(&db, &quote("doc-c", "Q-0001", 2, QuoteStatus::Pending)).await;
        insert(&db, &quote("doc-x", "Q-0002", 0, QuoteStatus::Pending)).await;

        let latest = db
            .documents()
            .latest_revision(fixtures::COMPANY_ID, DocumentKind::Quote, "Q-0001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, "doc-c");

        let history = db
            .documents()
            .revision_history(fixtures::COMPANY_ID, DocumentKind::Quote, "Q-0001")
            .await
            .unwrap();
        let revisions: Vec<i64> = history.iter().map(|d| d.revision_number).collect();
        assert_eq!(revisions, vec![0, 1, 2]);

        assert!(db
            .documents()
            .latest_revision(fixtures::COMPANY_ID, DocumentKind::Invoice, "Q-0001")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_update_replaces_lines_only_from_expected_status() {
        let db = fixtures::setup().await;
        let mut doc = quote("doc-1", "Q-0001", 0, QuoteStatus::Pending);
        insert(&db, &doc).await;

        doc.line_items[0].quantity = 3;
        doc.line_items.push(LineItem {
            id: "doc-1-li-1".to_string(),
            position: 1,
            ..doc.line_items[0].clone()
        });

        let mut tx = db.pool().begin().await.unwrap();
        let stale = DocumentRepository::update(&mut tx, &doc, DocumentStatus::Quote(QuoteStatus::Sent))
            .await
            .unwrap();
        assert!(!stale);
        let updated = DocumentRepository::update(&mut tx, &doc, DocumentStatus::Quote(QuoteStatus::Pending))
            .await
            .unwrap();
        assert!(updated);
        tx.commit().await.unwrap();

        let loaded = db.documents().get("doc-1").await.unwrap();
        assert_eq!(loaded.line_items.len(), 2);
        assert_eq!(loaded.line_items[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_set_status_guards_and_keeps_notes() {
        let db = fixtures::setup().await;
        insert(&db, &quote("doc-1", "Q-0001", 0, QuoteStatus::Sent)).await;
        let sent = DocumentStatus::Quote(QuoteStatus::Sent);
        let rejected = DocumentStatus::Quote(QuoteStatus::Rejected);

        let mut tx = db.pool().begin().await.unwrap();
        assert!(DocumentRepository::set_status(&mut tx, "doc-1", sent, rejected, Some("Too dear"), Utc::now())
            .await
            .unwrap());
        // Second attempt observes a stale status
        assert!(!DocumentRepository::set_status(&mut tx, "doc-1", sent, rejected, None, Utc::now())
            .await
            .unwrap());
        tx.commit().await.unwrap();

        let loaded = db.documents().get("doc-1").await.unwrap();
        assert_eq!(loaded.status, rejected);
        assert_eq!(loaded.client_notes.as_deref(), Some("Too dear"));
    }

    #[tokio::test]
    async fn test_delete_cascades_line_items() {
        let db = fixtures::setup().await;
        insert(&db, &quote("doc-1", "Q-0001", 0, QuoteStatus::Pending)).await;

        let mut tx = db.pool().begin().await.unwrap();
        assert!(DocumentRepository::delete(&mut tx, "doc-1", DocumentStatus::Quote(QuoteStatus::Pending))
            .await
            .unwrap());
        tx.commit().await.unwrap();

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM line_items")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(remaining, 0);
        assert!(db.documents().get("doc-1").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_count_created_since_ignores_revisions() {
        let db = fixtures::setup().await;
        insert(&db, &quote("doc-a", "Q-0001", 0, QuoteStatus::Rejected)).await;
        insert(&db, &quote("doc-b", "Q-0001", 1, QuoteStatus::Pending)).await;
        insert(&db, &quote("doc-c", "Q-0002", 0, QuoteStatus::Pending)).await;

        let mut conn = db.pool().acquire().await.unwrap();
        let since = Utc::now() - Duration::hours(1);
        let count = DocumentRepository::count_created_since(&mut conn, fixtures::COMPANY_ID, DocumentKind::Quote, since)
            .await
            .unwrap();
        assert_eq!(count, 2);

        let future = Utc::now() + Duration::hours(1);
        let count = DocumentRepository::count_created_since(&mut conn, fixtures::COMPANY_ID, DocumentKind::Quote, future)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_find_due_on_filters_kind_status_and_date() {
        let db = fixtures::setup().await;
        insert(&db, &quote("doc-1", "Q-0001", 0, QuoteStatus::Sent)).await;
        insert(&db, &quote("doc-2", "Q-0002", 0, QuoteStatus::Pending)).await;

        let mut other_date = quote("doc-3", "Q-0003", 0, QuoteStatus::Sent);
        other_date.due_date = NaiveDate::from_ymd_opt(2026, 7, 2).unwrap();
        insert(&db, &other_date).await;

        let due = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        let found = db
            .documents()
            .find_due_on(DocumentKind::Quote, DocumentStatus::Quote(QuoteStatus::Sent), &[due], None, 100)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "doc-1");
        assert_eq!(found[0].line_items.len(), 1);

        let none = db
            .documents()
            .find_due_on(DocumentKind::Invoice, DocumentStatus::Invoice(InvoiceStatus::Sent), &[due], None, 100)
            .await
            .unwrap();
        assert!(none.is_empty());

        let empty = db
            .documents()
            .find_due_on(DocumentKind::Quote, DocumentStatus::Quote(QuoteStatus::Sent), &[], None, 100)
            .await
            .unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_find_due_on_pages_with_cursor() {
        let db = fixtures::setup().await;
        for (id, number) in [("doc-a", "Q-0001"), ("doc-b", "Q-0002"), ("doc-c", "Q-0003")] {
            insert(&db, &quote(id, number, 0, QuoteStatus::Sent)).await;
        }
        let due = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        let sent = DocumentStatus::Quote(QuoteStatus::Sent);

        let mut seen = Vec::new();
        let mut cursor: Option<(NaiveDate, String)> = None;
        loop {
            let page = db
                .documents()
                .find_due_on(DocumentKind::Quote, sent, &[due], cursor.as_ref().map(|(d, id)| (*d, id.as_str())), 2)
                .await
                .unwrap();
            seen.extend(page.iter().map(|d| d.id.clone()));
            match page.last() {
                Some(last) if page.len() == 2 => cursor = Some((last.due_date, last.id.clone())),
                _ => break,
            }
        }
        assert_eq!(seen, vec!["doc-a", "doc-b", "doc-c"]);
    }

    #[tokio::test]
    async fn test_find_due_on_skips_superseded_revisions() {
        let db = fixtures::setup().await;
        insert(&db, &quote("doc-a", "Q-0001", 0, QuoteStatus::Sent)).await;
        insert(&db, &quote("doc-b", "Q-0001", 1, QuoteStatus::Sent)).await;

        let due = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        let found = db
            .documents()
            .find_due_on(DocumentKind::Quote, DocumentStatus::Quote(QuoteStatus::Sent), &[due], None, 100)
            .await
            .unwrap();
        let ids: Vec<_> = found.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["doc-b"]);

        let mut conn = db.pool().acquire().await.unwrap();
        let latest = DocumentRepository::latest_revision_number_in(&mut conn, fixtures::COMPANY_ID, DocumentKind::Quote, "Q-0001")
            .await
            .unwrap();
        assert_eq!(latest, Some(1));
        let missing = DocumentRepository::latest_revision_number_in(&mut conn, fixtures::COMPANY_ID, DocumentKind::Quote, "Q-9999")
            .await
            .unwrap();
        assert_eq!(missing, None);
    }
}

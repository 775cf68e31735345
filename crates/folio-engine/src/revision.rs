//! # Revision Manager
//!
//! Creates, updates, revises and duplicates documents. All totals are
//! recomputed here; whatever the client submitted is discarded.
//!
//! ## Paths
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_or_update(draft)                                                │
//! │       │                                                                 │
//! │       ├── Create ──► allocate number ─► plan limit ─► insert rev 0      │
//! │       │                                                                 │
//! │       ├── Revise ──► latest revision of number ─► insert rev n+1        │
//! │       │              (PENDING, client notes cleared, old link revoked)  │
//! │       │                                                                 │
//! │       └── Update ──► only while PENDING / DRAFT and not superseded      │
//! │                                                                         │
//! │  revise_quote(id)  ──► copy of the latest revision as rev n+1           │
//! │  duplicate(id)     ──► copy as a brand-new document (new number)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each path runs in one transaction. On the create path the counter
//! increment is the first write, so a failure anywhere after it (plan limit,
//! unknown client) rolls the increment back too.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use folio_core::revision::{classify_draft, duplicate_draft, revision_draft, DraftIntent};
use folio_core::totals::compute_totals;
use folio_core::validation::validate_draft;
use folio_core::{
    Actor, Company, Document, DocumentDraft, DocumentKind, DocumentStatus, DocumentTotals, LineItem,
    ValidationError,
};
use folio_db::{ClientRepository, CompanyRepository, Database, DbError, DocumentRepository, TokenRepository};
use sqlx::SqliteConnection;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::{DocumentSettings, PlanLimits};
use crate::documents::{ensure_current_in, load_owned_in, modified_concurrently, transition_in};
use crate::error::{EngineError, EngineResult};
use crate::sequence::SequenceAllocator;

/// Identity fields of the row being written.
struct Placement<'a> {
    id: String,
    company_id: &'a str,
    document_number: String,
    revision_number: i64,
    status: DocumentStatus,
    created_by: String,
    created_at: DateTime<Utc>,
    client_notes: Option<String>,
}

#[derive(Clone)]
pub struct RevisionManager {
    db: Database,
    settings: DocumentSettings,
    plans: PlanLimits,
    clock: Arc<dyn Clock>,
}

impl RevisionManager {
    pub fn new(db: Database, settings: DocumentSettings, plans: PlanLimits, clock: Arc<dyn Clock>) -> Self {
        RevisionManager {
            db,
            settings,
            plans,
            clock,
        }
    }

    // =========================================================================
    // Entry points
    // =========================================================================

    /// Persists a draft as a new document, a new quote revision, or an
    /// in-place update, depending on what it carries.
    pub async fn create_or_update(
        &self,
        draft: DocumentDraft,
        company_id: &str,
        user_id: &str,
    ) -> EngineResult<Document> {
        validate_draft(&draft)?;
        let intent = classify_draft(&draft)?;

        if draft.total_price_cents.is_some() || draft.total_gst_cents.is_some() {
            debug!(
                submitted_total = ?draft.total_price_cents,
                submitted_gst = ?draft.total_gst_cents,
                "Discarding client-submitted totals"
            );
        }
        let totals = compute_totals(&draft.line_items, draft.discount_type, draft.discount_value)?;
        let now = self.clock.now();

        let mut tx = self.db.begin_write().await?;
        let document = match intent {
            DraftIntent::Create => self.create_in(&mut tx, &draft, &totals, company_id, user_id, now).await?,
            DraftIntent::Revise { document_number } => {
                let latest = Self::latest_for_revision_in(&mut tx, company_id, draft.kind, &document_number).await?;
                self.revise_in(&mut tx, &draft, &totals, &latest, user_id, now).await?
            }
            DraftIntent::Update { id } => self.update_in(&mut tx, &draft, &totals, company_id, &id, user_id, now).await?,
        };
        tx.commit().await?;

        Ok(document)
    }

    /// New revision copied from the latest revision of `id`'s quote number,
    /// whatever its status. The source row is never modified; from here on
    /// it is read-only.
    pub async fn revise_quote(&self, company_id: &str, id: &str, user_id: &str) -> EngineResult<Document> {
        let now = self.clock.now();
        let mut tx = self.db.begin_write().await?;

        let source = load_owned_in(&mut tx, company_id, id).await?;
        if source.kind != DocumentKind::Quote {
            return Err(EngineError::IllegalTransition(format!(
                "{} is an invoice; invoices cannot be revised",
                source.document_number
            )));
        }
        let latest = Self::latest_for_revision_in(&mut tx, company_id, source.kind, &source.document_number).await?;

        let draft = revision_draft(&latest);
        let totals = compute_totals(&draft.line_items, draft.discount_type, draft.discount_value)?;
        let revision = self.revise_in(&mut tx, &draft, &totals, &latest, user_id, now).await?;

        tx.commit().await?;
        Ok(revision)
    }

    /// Copies a quote or invoice into a wholly new document with its own
    /// number. Counts against the plan limit.
    pub async fn duplicate(&self, company_id: &str, id: &str, user_id: &str) -> EngineResult<Document> {
        let source = {
            let mut conn = self.db.pool().acquire().await?;
            load_owned_in(&mut conn, company_id, id).await?
        };

        let draft = duplicate_draft(&source);
        let totals = compute_totals(&draft.line_items, draft.discount_type, draft.discount_value)?;
        let now = self.clock.now();

        let mut tx = self.db.begin_write().await?;
        let copy = self.create_in(&mut tx, &draft, &totals, company_id, user_id, now).await?;
        tx.commit().await?;

        info!(source_id = %source.id, copy_id = %copy.id, number = %copy.document_number, "Document duplicated");
        Ok(copy)
    }

    /// Highest revision of a quote number.
    pub async fn latest_revision(&self, company_id: &str, document_number: &str) -> EngineResult<Document> {
        self.db
            .documents()
            .latest_revision(company_id, DocumentKind::Quote, document_number)
            .await?
            .ok_or_else(|| EngineError::not_found("Quote", document_number))
    }

    /// Every revision of a quote number, oldest first.
    pub async fn revision_history(&self, company_id: &str, document_number: &str) -> EngineResult<Vec<Document>> {
        let history = self
            .db
            .documents()
            .revision_history(company_id, DocumentKind::Quote, document_number)
            .await?;
        if history.is_empty() {
            return Err(EngineError::not_found("Quote", document_number));
        }
        Ok(history)
    }

    // =========================================================================
    // Transactional steps
    // =========================================================================

    async fn create_in(
        &self,
        conn: &mut SqliteConnection,
        draft: &DocumentDraft,
        totals: &DocumentTotals,
        company_id: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<Document> {
        // First write of the transaction: takes the lock.
        let allocated = SequenceAllocator::allocate_in(conn, company_id, draft.kind, now.date_naive()).await?;

        let company = CompanyRepository::get_in(conn, company_id).await?;
        self.check_plan_limit(conn, &company, draft.kind, now).await?;
        Self::check_client(conn, company_id, &draft.client_id).await?;

        let document = self.build(
            draft,
            totals,
            Placement {
                id: Uuid::new_v4().to_string(),
                company_id,
                document_number: allocated.formatted,
                revision_number: 0,
                status: DocumentStatus::initial(draft.kind),
                created_by: user_id.to_string(),
                created_at: now,
                client_notes: None,
            },
            None,
            now,
        )?;
        DocumentRepository::insert(conn, &document).await?;

        info!(
            document_id = %document.id,
            company_id = %company_id,
            number = %document.document_number,
            total_cents = document.total_price_cents,
            "Document created"
        );
        Ok(document)
    }

    async fn revise_in(
        &self,
        conn: &mut SqliteConnection,
        draft: &DocumentDraft,
        totals: &DocumentTotals,
        latest: &Document,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<Document> {
        Self::check_client(conn, &latest.company_id, &draft.client_id).await?;

        let revision = self.build(
            draft,
            totals,
            Placement {
                id: Uuid::new_v4().to_string(),
                company_id: &latest.company_id,
                document_number: latest.document_number.clone(),
                revision_number: latest.revision_number + 1,
                status: DocumentStatus::initial(latest.kind),
                created_by: user_id.to_string(),
                created_at: now,
                client_notes: None,
            },
            None,
            now,
        )?;

        match DocumentRepository::insert(conn, &revision).await {
            Ok(()) => {}
            Err(DbError::UniqueViolation { .. }) => return Err(modified_concurrently(latest)),
            Err(e) => return Err(e.into()),
        }

        // The superseded revision's public link dies with it.
        let revoked = TokenRepository::delete_for_document(
            conn,
            &latest.client_id,
            &latest.company_id,
            latest.kind.token_type(),
            &latest.id,
        )
        .await?;
        if revoked {
            debug!(document_id = %latest.id, "Approval link of superseded revision revoked");
        }

        info!(
            document_id = %revision.id,
            number = %revision.display_number(),
            previous = latest.revision_number,
            "Quote revised"
        );
        Ok(revision)
    }

    #[allow(clippy::too_many_arguments)]
    async fn update_in(
        &self,
        conn: &mut SqliteConnection,
        draft: &DocumentDraft,
        totals: &DocumentTotals,
        company_id: &str,
        id: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<Document> {
        let existing = load_owned_in(conn, company_id, id).await?;

        if existing.kind != draft.kind {
            return Err(ValidationError::invalid("kind", format!("document {} is a {}", id, existing.kind)).into());
        }
        ensure_current_in(conn, &existing).await?;
        if !existing.status.is_mutable() {
            let hint = match existing.kind {
                DocumentKind::Quote => "create a new revision instead",
                DocumentKind::Invoice => "cancel it and issue a new invoice instead",
            };
            return Err(EngineError::IllegalTransition(format!(
                "{} is {} and can no longer be edited; {}",
                existing.display_number(),
                existing.status,
                hint
            )));
        }
        Self::check_client(conn, company_id, &draft.client_id).await?;

        let updated = self.build(
            draft,
            totals,
            Placement {
                id: existing.id.clone(),
                company_id,
                document_number: existing.document_number.clone(),
                revision_number: existing.revision_number,
                status: existing.status,
                created_by: existing.created_by.clone(),
                created_at: existing.created_at,
                client_notes: existing.client_notes.clone(),
            },
            Some(&existing),
            now,
        )?;

        if !DocumentRepository::update(conn, &updated, existing.status).await? {
            return Err(modified_concurrently(&existing));
        }
        debug!(document_id = %updated.id, total_cents = updated.total_price_cents, "Document updated in place");

        match draft.status {
            Some(target) if target != existing.status => {
                transition_in(conn, &updated, target, &Actor::user(user_id), None, now).await
            }
            _ => Ok(updated),
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn latest_for_revision_in(
        conn: &mut SqliteConnection,
        company_id: &str,
        kind: DocumentKind,
        document_number: &str,
    ) -> EngineResult<Document> {
        DocumentRepository::latest_revision_in(conn, company_id, kind, document_number)
            .await?
            .ok_or_else(|| EngineError::not_found("Quote", document_number))
    }

    async fn check_client(conn: &mut SqliteConnection, company_id: &str, client_id: &str) -> EngineResult<()> {
        let client = ClientRepository::get_in(conn, client_id).await?;
        if client.company_id != company_id {
            return Err(EngineError::not_found("Client", client_id));
        }
        Ok(())
    }

    /// Brand-new documents of `kind` this UTC month must stay under the
    /// company's plan limit.
    async fn check_plan_limit(
        &self,
        conn: &mut SqliteConnection,
        company: &Company,
        kind: DocumentKind,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        let Some(limit) = self.plans.limit_for(company.plan) else {
            return Ok(());
        };

        let created = DocumentRepository::count_created_since(conn, &company.id, kind, month_start(now)).await?;
        if created >= i64::from(limit) {
            info!(company_id = %company.id, plan = %company.plan, limit, created, "Plan limit reached");
            return Err(EngineError::PlanLimitExceeded {
                plan: company.plan,
                limit,
            });
        }
        Ok(())
    }

    fn default_due_date(&self, kind: DocumentKind, issue_date: NaiveDate) -> NaiveDate {
        let days = match kind {
            DocumentKind::Quote => self.settings.quote_validity_days,
            DocumentKind::Invoice => self.settings.payment_terms_days,
        };
        issue_date + Duration::days(i64::from(days))
    }

    /// Assembles the row to write. Dates fall back to `existing` (updates)
    /// or to today plus the configured offset.
    fn build(
        &self,
        draft: &DocumentDraft,
        totals: &DocumentTotals,
        placement: Placement<'_>,
        existing: Option<&Document>,
        now: DateTime<Utc>,
    ) -> EngineResult<Document> {
        let issue_date = draft
            .issue_date
            .or(existing.map(|d| d.issue_date))
            .unwrap_or_else(|| now.date_naive());
        let due_date = draft
            .due_date
            .or(existing.map(|d| d.due_date))
            .unwrap_or_else(|| self.default_due_date(draft.kind, issue_date));

        if due_date < issue_date {
            return Err(ValidationError::invalid("due_date", "must not be before the issue date").into());
        }

        let line_items = draft
            .line_items
            .iter()
            .zip(&totals.lines)
            .enumerate()
            .map(|(position, (line, t))| LineItem {
                id: Uuid::new_v4().to_string(),
                document_id: placement.id.clone(),
                position: position as i64,
                description: line.description.trim().to_string(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price_cents,
                gst_rate_bps: i64::from(line.gst_rate_bps),
                line_total_cents: t.total.cents(),
                line_gst_cents: t.gst.cents(),
            })
            .collect();

        Ok(Document {
            id: placement.id,
            company_id: placement.company_id.to_string(),
            client_id: draft.client_id.clone(),
            kind: draft.kind,
            document_number: placement.document_number,
            revision_number: placement.revision_number,
            status: placement.status,
            issue_date,
            due_date,
            line_items,
            discount_type: draft.discount_type,
            discount_value: draft.discount_value,
            total_price_cents: totals.grand_total.cents(),
            total_gst_cents: totals.total_gst.cents(),
            notes: draft.notes.clone(),
            client_notes: placement.client_notes,
            created_by: placement.created_by,
            created_at: placement.created_at,
            updated_at: now,
        })
    }
}

/// 00:00 UTC on the first day of `now`'s month.
fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .with_day(1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use chrono::TimeZone;
    use folio_core::status::{InvoiceStatus, QuoteStatus};
    use folio_core::{DiscountType, LineItemDraft, PlanTier, TokenType};

    fn quote_draft() -> DocumentDraft {
        DocumentDraft::new(DocumentKind::Quote, testing::CLIENT_ID)
            .with_line(LineItemDraft::new("Consulting", 2, 5000, 1000))
            .with_discount(DiscountType::Percent, 1000)
    }

    async fn create(fx: &testing::Fixture, draft: DocumentDraft) -> EngineResult<Document> {
        fx.engine
            .revisions()
            .create_or_update(draft, testing::COMPANY_ID, testing::USER_ID)
            .await
    }

    async fn mark_sent(fx: &testing::Fixture, id: &str) -> Document {
        fx.engine
            .documents()
            .change_status(
                testing::COMPANY_ID,
                id,
                DocumentStatus::Quote(QuoteStatus::Sent),
                &Actor::user(testing::USER_ID),
            )
            .await
            .unwrap()
    }

    #[test]
    fn test_month_start() {
        let now = Utc.with_ymd_and_hms(2026, 2, 28, 23, 59, 59).unwrap();
        assert_eq!(month_start(now), Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_create_assigns_number_and_server_totals() {
        let fx = testing::engine().await;
        let mut draft = quote_draft();
        draft.total_price_cents = Some(1);
        draft.total_gst_cents = Some(1);

        let quote = create(&fx, draft).await.unwrap();

        assert_eq!(quote.document_number, "Q-0001");
        assert_eq!(quote.revision_number, 0);
        assert_eq!(quote.status, DocumentStatus::Quote(QuoteStatus::Pending));
        assert_eq!(quote.total_price_cents, 9900);
        assert_eq!(quote.total_gst_cents, 1000);
        assert_eq!(quote.line_items[0].line_total_cents, 11000);
        assert_eq!(quote.line_items[0].line_gst_cents, 1000);
        assert_eq!(quote.created_by, testing::USER_ID);

        let stored = fx.engine.documents().get(testing::COMPANY_ID, &quote.id).await.unwrap();
        assert_eq!(stored, quote);
    }

    #[tokio::test]
    async fn test_create_defaults_dates() {
        let fx = testing::engine().await;
        let today = fx.clock.today();

        let quote = create(&fx, quote_draft()).await.unwrap();
        assert_eq!(quote.issue_date, today);
        assert_eq!(quote.due_date, today + Duration::days(30));

        let invoice = create(
            &fx,
            DocumentDraft::new(DocumentKind::Invoice, testing::CLIENT_ID).with_line(LineItemDraft::new("Parts", 1, 100, 0)),
        )
        .await
        .unwrap();
        assert_eq!(invoice.document_number, "INV-0001");
        assert_eq!(invoice.status, DocumentStatus::Invoice(InvoiceStatus::Draft));
        assert_eq!(invoice.due_date, today + Duration::days(14));
    }

    #[tokio::test]
    async fn test_malformed_line_fails_without_consuming_number() {
        let fx = testing::engine().await;
        let bad = DocumentDraft::new(DocumentKind::Quote, testing::CLIENT_ID)
            .with_line(LineItemDraft::new("Fine", 1, 100, 0))
            .with_line(LineItemDraft::new("Broken", 0, 100, 0));

        assert!(matches!(create(&fx, bad).await, Err(EngineError::Validation(_))));

        let quote = create(&fx, quote_draft()).await.unwrap();
        assert_eq!(quote.document_number, "Q-0001");
    }

    #[tokio::test]
    async fn test_unknown_client_rolls_back_allocation() {
        let fx = testing::engine().await;
        let draft = DocumentDraft::new(DocumentKind::Quote, "no-such-client");

        assert!(matches!(create(&fx, draft).await, Err(EngineError::NotFound { .. })));

        let quote = create(&fx, quote_draft()).await.unwrap();
        assert_eq!(quote.document_number, "Q-0001");
    }

    #[tokio::test]
    async fn test_dollar_discount_can_make_total_negative() {
        let fx = testing::engine().await;
        let draft = DocumentDraft::new(DocumentKind::Quote, testing::CLIENT_ID)
            .with_line(LineItemDraft::new("Small job", 1, 1000, 0))
            .with_discount(DiscountType::Dollar, 2500);

        let quote = create(&fx, draft).await.unwrap();
        assert_eq!(quote.total_price_cents, -1500);
    }

    #[tokio::test]
    async fn test_update_pending_in_place() {
        let fx = testing::engine().await;
        let quote = create(&fx, quote_draft()).await.unwrap();

        let mut draft = quote_draft().with_line(LineItemDraft::new("Travel", 1, 2000, 0));
        draft.id = Some(quote.id.clone());
        draft.notes = Some("Valid for 30 days".to_string());

        let updated = create(&fx, draft).await.unwrap();
        assert_eq!(updated.id, quote.id);
        assert_eq!(updated.document_number, "Q-0001");
        assert_eq!(updated.line_items.len(), 2);
        // (11000 + 2000) - 10%
        assert_eq!(updated.total_price_cents, 11700);
        assert_eq!(updated.issue_date, quote.issue_date);

        let stored = fx.engine.documents().get(testing::COMPANY_ID, &quote.id).await.unwrap();
        assert_eq!(stored.line_items.len(), 2);
        assert_eq!(stored.notes.as_deref(), Some("Valid for 30 days"));
    }

    #[tokio::test]
    async fn test_update_can_change_status() {
        let fx = testing::engine().await;
        let quote = create(&fx, quote_draft()).await.unwrap();

        let mut draft = quote_draft();
        draft.id = Some(quote.id.clone());
        draft.status = Some(DocumentStatus::Quote(QuoteStatus::Sent));

        let updated = create(&fx, draft).await.unwrap();
        assert_eq!(updated.status, DocumentStatus::Quote(QuoteStatus::Sent));
    }

    #[tokio::test]
    async fn test_update_after_send_is_illegal() {
        let fx = testing::engine().await;
        let quote = create(&fx, quote_draft()).await.unwrap();
        mark_sent(&fx, &quote.id).await;

        let mut draft = quote_draft();
        draft.id = Some(quote.id.clone());

        match create(&fx, draft).await {
            Err(EngineError::IllegalTransition(msg)) => assert!(msg.contains("new revision")),
            other => panic!("expected IllegalTransition, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_revise_quote_leaves_source_untouched() {
        let fx = testing::engine().await;
        let quote = create(&fx, quote_draft()).await.unwrap();
        let sent = mark_sent(&fx, &quote.id).await;
        let before = fx.engine.documents().get(testing::COMPANY_ID, &quote.id).await.unwrap();

        let revision = fx
            .engine
            .revisions()
            .revise_quote(testing::COMPANY_ID, &quote.id, testing::USER_ID)
            .await
            .unwrap();

        assert_ne!(revision.id, quote.id);
        assert_eq!(revision.document_number, "Q-0001");
        assert_eq!(revision.revision_number, 1);
        assert_eq!(revision.status, DocumentStatus::Quote(QuoteStatus::Pending));
        assert_eq!(revision.total_price_cents, quote.total_price_cents);
        assert_eq!(revision.line_items.len(), quote.line_items.len());
        assert_eq!(revision.display_number(), "Q-0001 (rev 1)");

        let after = fx.engine.documents().get(testing::COMPANY_ID, &quote.id).await.unwrap();
        assert_eq!(after, before);
        assert_eq!(after.status, sent.status);
    }

    #[tokio::test]
    async fn test_revise_clears_client_notes() {
        let fx = testing::engine().await;
        let quote = create(&fx, quote_draft()).await.unwrap();
        let sent = fx
            .engine
            .documents()
            .send(testing::COMPANY_ID, &quote.id, testing::USER_ID)
            .await
            .unwrap();
        fx.engine.tokens().reject_quote(&sent.token, Some("Too slow")).await.unwrap();

        let revision = fx
            .engine
            .revisions()
            .revise_quote(testing::COMPANY_ID, &quote.id, testing::USER_ID)
            .await
            .unwrap();
        assert_eq!(revision.client_notes, None);
    }

    #[tokio::test]
    async fn test_revise_always_copies_latest_revision() {
        let fx = testing::engine().await;
        let quote = create(&fx, quote_draft()).await.unwrap();
        mark_sent(&fx, &quote.id).await;

        let rev1 = fx
            .engine
            .revisions()
            .revise_quote(testing::COMPANY_ID, &quote.id, testing::USER_ID)
            .await
            .unwrap();
        mark_sent(&fx, &rev1.id).await;

        // Asking from the original still produces rev 2.
        let rev2 = fx
            .engine
            .revisions()
            .revise_quote(testing::COMPANY_ID, &quote.id, testing::USER_ID)
            .await
            .unwrap();
        assert_eq!(rev2.revision_number, 2);

        let history = fx.engine.revisions().revision_history(testing::COMPANY_ID, "Q-0001").await.unwrap();
        let revisions: Vec<i64> = history.iter().map(|d| d.revision_number).collect();
        assert_eq!(revisions, vec![0, 1, 2]);

        let latest = fx.engine.revisions().latest_revision(testing::COMPANY_ID, "Q-0001").await.unwrap();
        assert_eq!(latest.id, rev2.id);
    }

    #[tokio::test]
    async fn test_revise_via_draft() {
        let fx = testing::engine().await;
        let quote = create(&fx, quote_draft()).await.unwrap();
        mark_sent(&fx, &quote.id).await;

        let mut draft = DocumentDraft::new(DocumentKind::Quote, testing::CLIENT_ID)
            .with_line(LineItemDraft::new("Consulting", 3, 5000, 1000));
        draft.document_number = Some("Q-0001".to_string());
        draft.status = Some(DocumentStatus::Quote(QuoteStatus::Sent));

        let revision = create(&fx, draft).await.unwrap();
        assert_eq!(revision.revision_number, 1);
        assert_eq!(revision.status, DocumentStatus::Quote(QuoteStatus::Pending));
        assert_eq!(revision.total_price_cents, 16500);
    }

    #[tokio::test]
    async fn test_revise_fresh_pending_quote() {
        let fx = testing::engine().await;
        let quote = create(&fx, quote_draft()).await.unwrap();
        assert_eq!(quote.document_number, "Q-0001");
        let before = fx.engine.documents().get(testing::COMPANY_ID, &quote.id).await.unwrap();

        let revision = fx
            .engine
            .revisions()
            .revise_quote(testing::COMPANY_ID, &quote.id, testing::USER_ID)
            .await
            .unwrap();

        assert_ne!(revision.id, quote.id);
        assert_eq!(revision.document_number, "Q-0001");
        assert_eq!(revision.revision_number, 1);
        assert_eq!(revision.status, DocumentStatus::Quote(QuoteStatus::Pending));
        assert_eq!(fx.engine.documents().get(testing::COMPANY_ID, &quote.id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_superseded_revision_is_read_only() {
        let fx = testing::engine().await;
        let quote = create(&fx, quote_draft()).await.unwrap();
        fx.engine
            .revisions()
            .revise_quote(testing::COMPANY_ID, &quote.id, testing::USER_ID)
            .await
            .unwrap();

        // Still PENDING, but no longer the current revision.
        let mut draft = quote_draft();
        draft.id = Some(quote.id.clone());
        match create(&fx, draft).await {
            Err(EngineError::IllegalTransition(msg)) => assert!(msg.contains("superseded")),
            other => panic!("expected IllegalTransition, got {other:?}"),
        }

        let err = fx
            .engine
            .documents()
            .change_status(
                testing::COMPANY_ID,
                &quote.id,
                DocumentStatus::Quote(QuoteStatus::Sent),
                &Actor::user(testing::USER_ID),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::IllegalTransition(_)));

        let err = fx.engine.documents().delete(testing::COMPANY_ID, &quote.id).await.unwrap_err();
        assert!(matches!(err, EngineError::IllegalTransition(_)));

        let unchanged = fx.engine.documents().get(testing::COMPANY_ID, &quote.id).await.unwrap();
        assert_eq!(unchanged.status, DocumentStatus::Quote(QuoteStatus::Pending));
    }

    #[tokio::test]
    async fn test_revise_revokes_source_link() {
        let fx = testing::engine().await;
        let quote = create(&fx, quote_draft()).await.unwrap();
        let sent = fx
            .engine
            .documents()
            .send(testing::COMPANY_ID, &quote.id, testing::USER_ID)
            .await
            .unwrap();

        let revision = fx
            .engine
            .revisions()
            .revise_quote(testing::COMPANY_ID, &quote.id, testing::USER_ID)
            .await
            .unwrap();

        assert!(matches!(
            fx.engine.tokens().validate(&sent.token, TokenType::QuoteToken).await,
            Err(EngineError::TokenInvalid)
        ));
        assert!(matches!(
            fx.engine.tokens().approve_quote(&sent.token).await,
            Err(EngineError::TokenInvalid)
        ));

        // Re-sending the superseded revision would hand out a fresh link to it.
        let err = fx
            .engine
            .documents()
            .send(testing::COMPANY_ID, &quote.id, testing::USER_ID)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::IllegalTransition(_)));
        assert_eq!(fx.mailer.sent().len(), 1);

        let history = fx.engine.revisions().revision_history(testing::COMPANY_ID, "Q-0001").await.unwrap();
        assert_eq!(history[0].status, DocumentStatus::Quote(QuoteStatus::Sent));
        assert_eq!(history[1].id, revision.id);
        assert_eq!(history[1].status, DocumentStatus::Quote(QuoteStatus::Pending));
    }

    #[tokio::test]
    async fn test_number_without_status_is_rejected() {
        let fx = testing::engine().await;
        let mut draft = quote_draft();
        draft.document_number = Some("Q-0001".to_string());

        assert!(matches!(create(&fx, draft).await, Err(EngineError::Validation(_))));
    }

    #[tokio::test]
    async fn test_duplicate_gets_new_number() {
        let fx = testing::engine().await;
        let quote = create(&fx, quote_draft()).await.unwrap();
        mark_sent(&fx, &quote.id).await;

        let copy = fx
            .engine
            .revisions()
            .duplicate(testing::COMPANY_ID, &quote.id, testing::USER_ID)
            .await
            .unwrap();

        assert_eq!(copy.document_number, "Q-0002");
        assert_eq!(copy.revision_number, 0);
        assert_eq!(copy.status, DocumentStatus::Quote(QuoteStatus::Pending));
        assert_eq!(copy.total_price_cents, quote.total_price_cents);
    }

    #[tokio::test]
    async fn test_plan_limit_applies_to_new_documents_only() {
        let fx = testing::engine().await;

        let mut first = None;
        for _ in 0..5 {
            let quote = create(&fx, quote_draft()).await.unwrap();
            first.get_or_insert(quote);
        }

        match create(&fx, quote_draft()).await {
            Err(EngineError::PlanLimitExceeded { plan, limit }) => {
                assert_eq!(plan, PlanTier::Free);
                assert_eq!(limit, 5);
            }
            other => panic!("expected PlanLimitExceeded, got {other:?}"),
        }

        // Revisions are exempt.
        let first = first.unwrap();
        mark_sent(&fx, &first.id).await;
        let revision = fx
            .engine
            .revisions()
            .revise_quote(testing::COMPANY_ID, &first.id, testing::USER_ID)
            .await
            .unwrap();
        assert_eq!(revision.revision_number, 1);

        // Duplicates are not.
        assert!(matches!(
            fx.engine
                .revisions()
                .duplicate(testing::COMPANY_ID, &first.id, testing::USER_ID)
                .await,
            Err(EngineError::PlanLimitExceeded { .. })
        ));

        // Next month the count starts over, and rejected attempts used no numbers.
        fx.clock.advance(Duration::days(31));
        let next = create(&fx, quote_draft()).await.unwrap();
        assert_eq!(next.document_number, "Q-0006");
    }

    #[tokio::test]
    async fn test_pro_plan_is_unlimited() {
        let fx = testing::engine().await;
        fx.db.companies().set_plan(testing::COMPANY_ID, PlanTier::Pro).await.unwrap();

        for _ in 0..7 {
            create(&fx, quote_draft()).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_client_of_other_company_is_not_found() {
        let fx = testing::engine().await;
        let draft = DocumentDraft::new(DocumentKind::Quote, testing::FOREIGN_CLIENT_ID)
            .with_line(LineItemDraft::new("Job", 1, 100, 0));

        assert!(matches!(create(&fx, draft).await, Err(EngineError::NotFound { .. })));
    }
}

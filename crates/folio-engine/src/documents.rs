//! # Document Service
//!
//! Status changes, sending and deletion of persisted documents.
//!
//! ## Lifecycle
//! ```text
//! Quote:    PENDING ──► SENT ──► ACCEPTED | REJECTED
//!             │ │                      ▲
//!             │ └──────────────────────┘
//!             └────────┴───────► CANCELLED
//!
//! Invoice:  DRAFT ──► SENT ──► PAID
//!             └────────┴─────► CANCELLED
//! ```
//!
//! Every status write is guarded by the status the caller read, so two
//! concurrent changes cannot both succeed. A quote reaching a terminal state
//! revokes its approval link in the same transaction. A quote revision that
//! has been superseded by a newer one is read-only: no status change, no
//! edit, no delete.
//!
//! ## Sending
//! ```text
//! ┌──────────────────────── transaction ────────────────────────┐
//! │  PENDING/DRAFT ──► SENT     (already SENT: left as is)      │
//! │  issue approval token       (supersedes the previous link)  │
//! └──────────────────────────── COMMIT ─────────────────────────┘
//!        │
//!        ▼  no locks held from here on
//!  render PDF ─► payment link (invoices) ─► mail
//! ```
//!
//! A delivery failure is returned as [`EngineError::Delivery`]; the document
//! stays SENT and can simply be sent again.

use chrono::{DateTime, Utc};
use folio_core::status::validate_transition_by;
use folio_core::{Actor, Document, DocumentKind, DocumentStatus};
use folio_db::{Database, DocumentRepository, TokenRepository};
use sqlx::SqliteConnection;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::delivery::DocumentDelivery;
use crate::error::{EngineError, EngineResult};
use crate::tokens::ApprovalTokenService;

/// Result of [`DocumentService::send`].
#[derive(Debug, Clone)]
pub struct SentDocument {
    pub document: Document,
    /// The approval/view token embedded in the email.
    pub token: String,
    pub public_url: String,
    pub recipient: String,
}

// =============================================================================
// Transitions
// =============================================================================

/// Moves `document` to `target` inside the caller's transaction.
///
/// Public clients may only accept or reject their own quotes. Returns the
/// document as it now stands.
pub(crate) async fn transition_in(
    conn: &mut SqliteConnection,
    document: &Document,
    target: DocumentStatus,
    actor: &Actor,
    client_note: Option<&str>,
    now: DateTime<Utc>,
) -> EngineResult<Document> {
    if let Actor::PublicClient { client_id } = actor {
        if client_id != &document.client_id {
            return Err(EngineError::AccessDenied);
        }
    }
    validate_transition_by(actor, document.status, target)?;
    ensure_current_in(conn, document).await?;

    let written = DocumentRepository::set_status(conn, &document.id, document.status, target, client_note, now).await?;
    if !written {
        return Err(modified_concurrently(document));
    }

    if document.kind == DocumentKind::Quote && target.is_terminal() {
        let revoked = TokenRepository::delete_for_document(
            conn,
            &document.client_id,
            &document.company_id,
            document.kind.token_type(),
            &document.id,
        )
        .await?;
        if revoked {
            debug!(document_id = %document.id, "Approval link revoked after decision");
        }
    }

    info!(
        document_id = %document.id,
        number = %document.display_number(),
        from = %document.status,
        to = %target,
        "Document status changed"
    );

    let mut updated = document.clone();
    updated.status = target;
    if let Some(note) = client_note {
        updated.client_notes = Some(note.to_string());
    }
    updated.updated_at = now;
    Ok(updated)
}

pub(crate) fn modified_concurrently(document: &Document) -> EngineError {
    EngineError::IllegalTransition(format!(
        "{} was modified by someone else; reload it and try again",
        document.display_number()
    ))
}

/// Whether `document` is the newest revision of its number. Invoices have
/// no revisions.
pub(crate) async fn is_current_in(conn: &mut SqliteConnection, document: &Document) -> EngineResult<bool> {
    if document.kind != DocumentKind::Quote {
        return Ok(true);
    }
    let latest = DocumentRepository::latest_revision_number_in(
        conn,
        &document.company_id,
        document.kind,
        &document.document_number,
    )
    .await?;
    Ok(latest.map_or(true, |n| n <= document.revision_number))
}

/// Fails with `IllegalTransition` when a newer revision of `document` exists.
pub(crate) async fn ensure_current_in(conn: &mut SqliteConnection, document: &Document) -> EngineResult<()> {
    if is_current_in(conn, document).await? {
        return Ok(());
    }
    Err(EngineError::IllegalTransition(format!(
        "{} has been superseded by a newer revision and is read-only",
        document.display_number()
    )))
}

/// Loads a document, treating another company's document as absent.
pub(crate) async fn load_owned_in(
    conn: &mut SqliteConnection,
    company_id: &str,
    id: &str,
) -> EngineResult<Document> {
    let document = DocumentRepository::get_in(conn, id).await?;
    if document.company_id != company_id {
        return Err(EngineError::not_found("Document", id));
    }
    Ok(document)
}

// =============================================================================
// Service
// =============================================================================

#[derive(Clone)]
pub struct DocumentService {
    db: Database,
    tokens: ApprovalTokenService,
    delivery: DocumentDelivery,
    clock: Arc<dyn Clock>,
}

impl DocumentService {
    pub fn new(
        db: Database,
        tokens: ApprovalTokenService,
        delivery: DocumentDelivery,
        clock: Arc<dyn Clock>,
    ) -> Self {
        DocumentService {
            db,
            tokens,
            delivery,
            clock,
        }
    }

    pub async fn get(&self, company_id: &str, id: &str) -> EngineResult<Document> {
        let mut conn = self.db.pool().acquire().await?;
        load_owned_in(&mut conn, company_id, id).await
    }

    /// Changes status on behalf of `actor`.
    pub async fn change_status(
        &self,
        company_id: &str,
        id: &str,
        target: DocumentStatus,
        actor: &Actor,
    ) -> EngineResult<Document> {
        let mut tx = self.db.begin_write().await?;
        let document = load_owned_in(&mut tx, company_id, id).await?;
        let updated = transition_in(&mut tx, &document, target, actor, None, self.clock.now()).await?;
        tx.commit().await?;
        Ok(updated)
    }

    /// Marks the document SENT, issues its public link and emails it to the
    /// client.
    pub async fn send(&self, company_id: &str, id: &str, user_id: &str) -> EngineResult<SentDocument> {
        let now = self.clock.now();
        let mut tx = self.db.begin_write().await?;

        let document = load_owned_in(&mut tx, company_id, id).await?;
        let document = if document.status.is_sent() {
            ensure_current_in(&mut tx, &document).await?;
            debug!(document_id = %document.id, "Re-sending document");
            document
        } else {
            let sent = DocumentStatus::sent(document.kind);
            transition_in(&mut tx, &document, sent, &Actor::user(user_id), None, now).await?
        };

        let token_type = document.kind.token_type();
        let token = self
            .tokens
            .issue_in(
                &mut tx,
                &document.client_id,
                &document.company_id,
                token_type,
                &document.id,
                self.tokens.ttl_for(token_type),
                now,
            )
            .await?;

        tx.commit().await?;

        let public_url = self.delivery.public_url(document.kind, &token.token);
        let company = self.db.companies().get(&document.company_id).await?;
        let client = self.db.clients().get(&document.client_id).await?;

        let subject = match document.kind {
            DocumentKind::Quote => format!("Quote {} from {}", document.display_number(), company.name),
            DocumentKind::Invoice => format!("Invoice {} from {}", document.display_number(), company.name),
        };

        let recipient = self
            .delivery
            .deliver(&company, &client, &document, &subject, Some(&public_url))
            .await
            .map_err(|e| {
                warn!(document_id = %document.id, error = %e, "Document marked sent but delivery failed");
                EngineError::Delivery(e)
            })?;

        info!(
            document_id = %document.id,
            number = %document.display_number(),
            to = %recipient,
            "Document sent"
        );

        Ok(SentDocument {
            document,
            token: token.token,
            public_url,
            recipient,
        })
    }

    /// Deletes a PENDING quote or DRAFT invoice.
    pub async fn delete(&self, company_id: &str, id: &str) -> EngineResult<()> {
        let mut tx = self.db.begin_write().await?;
        let document = load_owned_in(&mut tx, company_id, id).await?;

        if !document.status.is_mutable() {
            return Err(EngineError::IllegalTransition(format!(
                "{} is {} and cannot be deleted; cancel it instead",
                document.display_number(),
                document.status
            )));
        }
        ensure_current_in(&mut tx, &document).await?;

        if !DocumentRepository::delete(&mut tx, &document.id, document.status).await? {
            return Err(modified_concurrently(&document));
        }
        tx.commit().await?;

        info!(document_id = %document.id, number = %document.display_number(), "Document deleted");
        Ok(())
    }
}

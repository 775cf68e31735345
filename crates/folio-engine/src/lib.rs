//! # folio-engine: Document Numbering & Revision Engine
//!
//! Runs the quote/invoice rules from folio-core over the folio-db
//! repositories, inside transactions, and talks to the outside world through
//! narrow collaborator traits.
//!
//! ## Components
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                             FolioEngine                                 │
//! │                                                                         │
//! │  ┌──────────────────┐    ┌──────────────────┐    ┌──────────────────┐  │
//! │  │ RevisionManager  │───►│SequenceAllocator │    │ DocumentService  │  │
//! │  │ create / update  │    │ Q-0001, Q-0002   │    │ status, send,    │  │
//! │  │ revise / dup     │    │ (locked counter) │    │ delete           │  │
//! │  └────────┬─────────┘    └──────────────────┘    └────────┬─────────┘  │
//! │           │ compute_totals (folio-core)                   │            │
//! │           ▼                                               ▼            │
//! │  ┌──────────────────┐    ┌──────────────────┐    ┌──────────────────┐  │
//! │  │ReminderScheduler │───►│ DocumentDelivery │◄───│ApprovalToken     │  │
//! │  │ lease + tick     │    │ render, pay, mail│    │Service (links)   │  │
//! │  └──────────────────┘    └──────────────────┘    └──────────────────┘  │
//! │                                   │                                     │
//! │                    Mailer · DocumentRenderer · PaymentLinkProvider      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use folio_engine::{EngineConfig, FolioEngine, LoggingMailer, LoggingRenderer};
//!
//! let config = EngineConfig::load(None)?;
//! let engine = FolioEngine::open(config, Arc::new(LoggingMailer), Arc::new(LoggingRenderer), None).await?;
//!
//! let quote = engine.revisions().create_or_update(draft, "co-1", "user-1").await?;
//! let sent = engine.documents().send("co-1", &quote.id, "user-1").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod clock;
pub mod config;
pub mod delivery;
pub mod documents;
pub mod error;
pub mod reminders;
pub mod revision;
pub mod sequence;
pub mod tokens;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use delivery::{
    Attachment, DeliveryError, DocumentDelivery, DocumentRenderer, EmailMessage, LoggingMailer, LoggingRenderer,
    Mailer, PaymentLinkProvider, PaymentSessionRequest,
};
pub use documents::{DocumentService, SentDocument};
pub use error::{EngineError, EngineResult};
pub use reminders::{ReminderRunner, ReminderRunnerHandle, ReminderScheduler, TickReport};
pub use revision::RevisionManager;
pub use sequence::{AllocatedNumber, SequenceAllocator};
pub use tokens::{ApprovalClaims, ApprovalTokenService};

use folio_db::{Database, DbConfig};
use std::sync::Arc;
use tracing::info;

// =============================================================================
// Engine
// =============================================================================

/// All services wired over one database, configuration and clock.
///
/// Cloning is cheap; clones share the pool and collaborators.
#[derive(Clone)]
pub struct FolioEngine {
    db: Database,
    config: Arc<EngineConfig>,
    sequences: SequenceAllocator,
    revisions: RevisionManager,
    documents: DocumentService,
    tokens: ApprovalTokenService,
    reminders: ReminderScheduler,
}

impl FolioEngine {
    pub fn new(
        db: Database,
        config: EngineConfig,
        mailer: Arc<dyn Mailer>,
        renderer: Arc<dyn DocumentRenderer>,
        payments: Option<Arc<dyn PaymentLinkProvider>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let delivery = DocumentDelivery::new(
            mailer,
            renderer,
            payments,
            config.payments.clone(),
            &config.tokens,
            config.reminders.send_timeout(),
        );
        let tokens = ApprovalTokenService::new(db.clone(), &config.tokens, clock.clone());

        FolioEngine {
            sequences: SequenceAllocator::new(db.clone(), clock.clone()),
            revisions: RevisionManager::new(
                db.clone(),
                config.documents.clone(),
                config.plans.clone(),
                clock.clone(),
            ),
            documents: DocumentService::new(db.clone(), tokens.clone(), delivery.clone(), clock.clone()),
            reminders: ReminderScheduler::new(
                db.clone(),
                tokens.clone(),
                delivery,
                config.reminders.clone(),
                clock,
            ),
            tokens,
            config: Arc::new(config),
            db,
        }
    }

    /// Validates `config`, opens the database it names and wires the engine
    /// with the system clock.
    pub async fn open(
        config: EngineConfig,
        mailer: Arc<dyn Mailer>,
        renderer: Arc<dyn DocumentRenderer>,
        payments: Option<Arc<dyn PaymentLinkProvider>>,
    ) -> EngineResult<Self> {
        config.validate()?;

        let db_config = DbConfig::new(&config.database.path).max_connections(config.database.max_connections);
        let db = Database::new(db_config).await?;

        info!(path = ?config.database.path, "Folio engine ready");
        Ok(Self::new(db, config, mailer, renderer, payments, Arc::new(SystemClock)))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sequences(&self) -> &SequenceAllocator {
        &self.sequences
    }

    pub fn revisions(&self) -> &RevisionManager {
        &self.revisions
    }

    pub fn documents(&self) -> &DocumentService {
        &self.documents
    }

    pub fn tokens(&self) -> &ApprovalTokenService {
        &self.tokens
    }

    pub fn reminders(&self) -> &ReminderScheduler {
        &self.reminders
    }

    pub async fn close(&self) {
        self.db.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::status::QuoteStatus;
    use folio_core::{DocumentDraft, DocumentKind, DocumentStatus, LineItemDraft, TokenType};

    #[tokio::test]
    async fn test_quote_lifecycle_end_to_end() {
        let fx = testing::engine().await;
        let engine = &fx.engine;

        // New quote gets the first number.
        let draft = DocumentDraft::new(DocumentKind::Quote, testing::CLIENT_ID)
            .with_line(LineItemDraft::new("Bathroom refit", 1, 450000, 1000));
        let original = engine
            .revisions()
            .create_or_update(draft, testing::COMPANY_ID, testing::USER_ID)
            .await
            .unwrap();
        assert_eq!(original.document_number, "Q-0001");
        let before = engine.documents().get(testing::COMPANY_ID, &original.id).await.unwrap();

        // Revised straight away; the original row is untouched.
        let revision = engine
            .revisions()
            .revise_quote(testing::COMPANY_ID, &original.id, testing::USER_ID)
            .await
            .unwrap();
        assert_ne!(revision.id, original.id);
        assert_eq!(revision.document_number, "Q-0001");
        assert_eq!(revision.revision_number, 1);
        assert_eq!(
            engine.documents().get(testing::COMPANY_ID, &original.id).await.unwrap(),
            before
        );

        // The client approves the revision through its link.
        let token = engine
            .tokens()
            .issue(
                testing::CLIENT_ID,
                testing::COMPANY_ID,
                TokenType::QuoteToken,
                &revision.id,
                engine.tokens().ttl_for(TokenType::QuoteToken),
            )
            .await
            .unwrap();
        let approved = engine.tokens().approve_quote(&token.token).await.unwrap();
        assert_eq!(approved.id, revision.id);
        assert_eq!(approved.status, DocumentStatus::Quote(QuoteStatus::Accepted));

        // The link is dead afterwards.
        assert!(matches!(
            engine.tokens().validate(&token.token, TokenType::QuoteToken).await,
            Err(EngineError::TokenInvalid)
        ));

        let history = engine
            .revisions()
            .revision_history(testing::COMPANY_ID, "Q-0001")
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].status, DocumentStatus::Quote(QuoteStatus::Pending));
        assert_eq!(history[1].status, DocumentStatus::Quote(QuoteStatus::Accepted));
    }

    #[tokio::test]
    async fn test_open_rejects_invalid_config() {
        let config = EngineConfig::default();
        let result = FolioEngine::open(config, Arc::new(LoggingMailer), Arc::new(LoggingRenderer), None).await;
        assert!(matches!(result, Err(EngineError::Config(_))));
    }
}

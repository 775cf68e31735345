//! Shared test setup: a provisioned database, a fixed clock and recording
//! collaborators.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use folio_core::{Client, Company, DocumentKind, PlanTier, SequenceCounter};
use folio_db::{Database, DbConfig};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::clock::FixedClock;
use crate::config::EngineConfig;
use crate::delivery::{DeliveryError, DocumentRenderer, EmailMessage, Mailer, PaymentLinkProvider, PaymentSessionRequest};
use crate::FolioEngine;

pub const COMPANY_ID: &str = "co-1";
pub const OTHER_COMPANY_ID: &str = "co-2";
pub const CLIENT_ID: &str = "client-1";
pub const OTHER_CLIENT_ID: &str = "client-2";
pub const NO_EMAIL_CLIENT_ID: &str = "client-walk-in";
/// Belongs to `OTHER_COMPANY_ID`.
pub const FOREIGN_CLIENT_ID: &str = "client-foreign";
pub const USER_ID: &str = "user-1";

/// 2026-06-10 09:00 UTC.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 10, 9, 0, 0).unwrap()
}

pub fn company(id: &str, plan: PlanTier) -> Company {
    Company {
        id: id.to_string(),
        name: "Acme Plumbing".to_string(),
        plan,
        currency: "AUD".to_string(),
        merchant_account_id: None,
        created_at: start_time(),
    }
}

fn counters(company_id: &str) -> Vec<SequenceCounter> {
    vec![
        SequenceCounter::starting_at(company_id, DocumentKind::Quote, "Q-", "", 4, 1),
        SequenceCounter::starting_at(company_id, DocumentKind::Invoice, "INV-", "", 4, 1),
    ]
}

fn client(id: &str, company_id: &str, email: Option<&str>) -> Client {
    Client {
        id: id.to_string(),
        company_id: company_id.to_string(),
        name: "Jane Citizen".to_string(),
        email: email.map(str::to_string),
        created_at: start_time(),
    }
}

async fn provision(db: &Database) {
    db.companies()
        .provision(&company(COMPANY_ID, PlanTier::Free), &counters(COMPANY_ID))
        .await
        .unwrap();
    db.companies()
        .provision(&company(OTHER_COMPANY_ID, PlanTier::Free), &counters(OTHER_COMPANY_ID))
        .await
        .unwrap();

    for c in [
        client(CLIENT_ID, COMPANY_ID, Some("jane@example.com")),
        client(OTHER_CLIENT_ID, COMPANY_ID, Some("sam@example.com")),
        client(NO_EMAIL_CLIENT_ID, COMPANY_ID, None),
        client(FOREIGN_CLIENT_ID, OTHER_COMPANY_ID, Some("foreign@example.com")),
    ] {
        db.clients().insert(&c).await.unwrap();
    }
}

/// In-memory database, provisioned, with a clock at [`start_time`].
pub async fn setup() -> (Database, Arc<FixedClock>) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    provision(&db).await;
    (db, Arc::new(FixedClock::new(start_time())))
}

/// File-backed database for tests that need several connections.
pub async fn setup_file(path: &Path) -> (Database, Arc<FixedClock>) {
    let db = Database::new(DbConfig::new(path).max_connections(8)).await.unwrap();
    provision(&db).await;
    (db, Arc::new(FixedClock::new(start_time())))
}

// =============================================================================
// Recording collaborators
// =============================================================================

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), DeliveryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeliveryError::SendFailed("mailbox unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingRenderer {
    failing: AtomicBool,
}

impl RecordingRenderer {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentRenderer for RecordingRenderer {
    async fn render(&self, template_id: &str, _variables: &serde_json::Value) -> Result<Vec<u8>, DeliveryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeliveryError::Render(format!("template {template_id} unavailable")));
        }
        Ok(b"%PDF-1.7 test".to_vec())
    }
}

#[derive(Default)]
pub struct RecordingPayments {
    requests: Mutex<Vec<PaymentSessionRequest>>,
}

impl RecordingPayments {
    pub fn requests(&self) -> Vec<PaymentSessionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentLinkProvider for RecordingPayments {
    async fn create_payment_session(&self, request: &PaymentSessionRequest) -> Result<String, DeliveryError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(format!("https://pay.example/{}", request.document_id))
    }
}

// =============================================================================
// Engine fixture
// =============================================================================

pub struct Fixture {
    pub engine: FolioEngine,
    pub db: Database,
    pub clock: Arc<FixedClock>,
    pub config: EngineConfig,
    pub mailer: Arc<RecordingMailer>,
    pub renderer: Arc<RecordingRenderer>,
    pub payments: Arc<RecordingPayments>,
}

/// An engine over [`setup`] with recording collaborators.
pub async fn engine() -> Fixture {
    engine_with(|_| {}).await
}

/// Like [`engine`], with `configure` applied to the configuration first.
pub async fn engine_with(configure: impl FnOnce(&mut EngineConfig)) -> Fixture {
    let (db, clock) = setup().await;
    let mut config = EngineConfig::with_secret("test-signing-secret");
    configure(&mut config);
    let mailer = Arc::new(RecordingMailer::default());
    let renderer = Arc::new(RecordingRenderer::default());
    let payments = Arc::new(RecordingPayments::default());

    let engine = FolioEngine::new(
        db.clone(),
        config.clone(),
        mailer.clone(),
        renderer.clone(),
        Some(payments.clone() as Arc<dyn PaymentLinkProvider>),
        clock.clone(),
    );

    Fixture {
        engine,
        db,
        clock,
        config,
        mailer,
        renderer,
        payments,
    }
}

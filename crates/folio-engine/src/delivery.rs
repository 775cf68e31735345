//! # Delivery Collaborators
//!
//! The engine never talks to SMTP, a PDF service or a payment processor
//! directly. It calls three narrow traits and treats every call as fallible
//! and slow.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DocumentDelivery::deliver(company, client, document, subject, link)    │
//! │       │                                                                 │
//! │       ├── DocumentRenderer::render(template, vars)  → PDF bytes         │
//! │       │                                                                 │
//! │       ├── PaymentLinkProvider::create_payment_session(..)  (optional)   │
//! │       │     only for invoices of companies with a merchant account      │
//! │       │                                                                 │
//! │       └── Mailer::send(to, subject, body, attachment)                   │
//! │                                                                         │
//! │  Each call is wrapped in tokio::time::timeout(send_timeout).            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use folio_core::{Client, Company, Document, DocumentKind};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{PaymentSettings, TokenSettings};

// =============================================================================
// Errors & Messages
// =============================================================================

#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    #[error("Client {client_id} has no email address")]
    NoRecipient { client_id: String },

    #[error("Render failed: {0}")]
    Render(String),

    #[error("Payment link failed: {0}")]
    PaymentLink(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: &'static str, secs: u64 },
}

#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body_text: String,
    pub attachment: Option<Attachment>,
}

/// Everything a payment processor needs to open a checkout session.
#[derive(Debug, Clone)]
pub struct PaymentSessionRequest {
    pub document_id: String,
    pub amount_minor_units: i64,
    pub currency: String,
    pub description: String,
    pub merchant_account_id: String,
    pub payer_email: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
}

// =============================================================================
// Collaborator Traits
// =============================================================================

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), DeliveryError>;
}

#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    /// Renders `template_id` with `variables` into PDF bytes.
    async fn render(&self, template_id: &str, variables: &serde_json::Value) -> Result<Vec<u8>, DeliveryError>;
}

#[async_trait]
pub trait PaymentLinkProvider: Send + Sync {
    /// Returns the URL of a hosted checkout page.
    async fn create_payment_session(&self, request: &PaymentSessionRequest) -> Result<String, DeliveryError>;
}

// =============================================================================
// Logging Implementations
// =============================================================================

/// Logs instead of sending. Used by the worker binary when no transport is
/// wired up.
#[derive(Debug, Default)]
pub struct LoggingMailer;

#[async_trait]
impl Mailer for LoggingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), DeliveryError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            attachment = message.attachment.as_ref().map(|a| a.filename.as_str()),
            "[LOG] Email would be sent"
        );
        Ok(())
    }
}

/// Produces a placeholder document containing the rendered variables.
#[derive(Debug, Default)]
pub struct LoggingRenderer;

#[async_trait]
impl DocumentRenderer for LoggingRenderer {
    async fn render(&self, template_id: &str, variables: &serde_json::Value) -> Result<Vec<u8>, DeliveryError> {
        debug!(template = %template_id, "[LOG] Rendering document");
        serde_json::to_vec_pretty(variables).map_err(|e| DeliveryError::Render(e.to_string()))
    }
}

// =============================================================================
// Document Delivery
// =============================================================================

/// Runs `fut` with a deadline, turning expiry into [`DeliveryError::Timeout`].
pub(crate) async fn with_timeout<T, F>(operation: &'static str, limit: Duration, fut: F) -> Result<T, DeliveryError>
where
    F: Future<Output = Result<T, DeliveryError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(DeliveryError::Timeout {
            operation,
            secs: limit.as_secs(),
        }),
    }
}

/// Composes and sends document emails for both explicit sends and reminders.
#[derive(Clone)]
pub struct DocumentDelivery {
    mailer: Arc<dyn Mailer>,
    renderer: Arc<dyn DocumentRenderer>,
    payments: Option<Arc<dyn PaymentLinkProvider>>,
    payment_settings: PaymentSettings,
    public_base_url: String,
    timeout: Duration,
}

impl DocumentDelivery {
    pub fn new(
        mailer: Arc<dyn Mailer>,
        renderer: Arc<dyn DocumentRenderer>,
        payments: Option<Arc<dyn PaymentLinkProvider>>,
        payment_settings: PaymentSettings,
        tokens: &TokenSettings,
        timeout: Duration,
    ) -> Self {
        DocumentDelivery {
            mailer,
            renderer,
            payments,
            payment_settings,
            public_base_url: tokens.public_base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Public URL for an approval/view token.
    pub fn public_url(&self, kind: DocumentKind, token: &str) -> String {
        format!("{}/{}?token={}", self.public_base_url, kind.as_str(), token)
    }

    /// Renders, optionally attaches a payment link, and mails `document` to
    /// `client`. Returns the recipient address.
    pub async fn deliver(
        &self,
        company: &Company,
        client: &Client,
        document: &Document,
        subject: &str,
        public_url: Option<&str>,
    ) -> Result<String, DeliveryError> {
        let recipient = client
            .email
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| DeliveryError::NoRecipient {
                client_id: client.id.clone(),
            })?
            .to_string();

        let variables = json!({
            "company": company.name,
            "client": client.name,
            "kind": document.kind.as_str(),
            "number": document.display_number(),
            "issue_date": document.issue_date.to_string(),
            "due_date": document.due_date.to_string(),
            "total": document.total_price().to_string(),
            "gst": document.total_gst().to_string(),
            "currency": company.currency,
            "lines": document.line_items.iter().map(|li| json!({
                "description": li.description,
                "quantity": li.quantity,
                "unit_price_cents": li.unit_price_cents,
                "line_total_cents": li.line_total_cents,
            })).collect::<Vec<_>>(),
        });

        let pdf = with_timeout(
            "render",
            self.timeout,
            self.renderer.render(document.kind.as_str(), &variables),
        )
        .await?;

        let payment_url = self.payment_link(company, client, document).await?;

        let mut body = format!(
            "Hi {},\n\n{} has sent you {} {} for {}.\n",
            client.name,
            company.name,
            match document.kind {
                DocumentKind::Quote => "quote",
                DocumentKind::Invoice => "invoice",
            },
            document.display_number(),
            document.total_price(),
        );
        if let Some(url) = public_url {
            body.push_str(&format!("\nView it online: {}\n", url));
        }
        if let Some(url) = &payment_url {
            body.push_str(&format!("\nPay now: {}\n", url));
        }

        let message = EmailMessage {
            to: recipient.clone(),
            subject: subject.to_string(),
            body_text: body,
            attachment: Some(Attachment {
                filename: format!("{}.pdf", document.document_number),
                content_type: "application/pdf".to_string(),
                bytes: pdf,
            }),
        };

        with_timeout("mail", self.timeout, self.mailer.send(&message)).await?;

        debug!(document_id = %document.id, to = %recipient, "Document delivered");
        Ok(recipient)
    }

    /// A checkout URL for invoices of companies with a merchant account.
    /// No provider or no merchant account means no link.
    async fn payment_link(
        &self,
        company: &Company,
        client: &Client,
        document: &Document,
    ) -> Result<Option<String>, DeliveryError> {
        let (Some(provider), Some(merchant)) = (&self.payments, &company.merchant_account_id) else {
            return Ok(None);
        };
        if document.kind != DocumentKind::Invoice {
            return Ok(None);
        }

        let request = PaymentSessionRequest {
            document_id: document.id.clone(),
            amount_minor_units: document.total_price().to_minor_units(),
            currency: company.currency.clone(),
            description: format!("Invoice {}", document.display_number()),
            merchant_account_id: merchant.clone(),
            payer_email: client.email.clone(),
            success_url: self.payment_settings.success_url.clone(),
            cancel_url: self.payment_settings.cancel_url.clone(),
        };

        let url = with_timeout(
            "payment link",
            self.timeout,
            provider.create_payment_session(&request),
        )
        .await?;
        Ok(Some(url))
    }
}

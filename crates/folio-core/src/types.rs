//! # Domain Types
//!
//! Core domain types for quotes and invoices.
//!
//! ## Entity Relationships
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Folio Domain Model                               │
//! │                                                                         │
//! │  Company ──┬── SequenceCounter (one per document kind)                  │
//! │            │                                                            │
//! │            └── Client ──── Document (Quote | Invoice)                   │
//! │                              │  document_number + revision_number       │
//! │                              │                                          │
//! │                              └── LineItem[] (owned, ordered)            │
//! │                                                                         │
//! │  ApprovalToken: one live row per (client, company, token type)          │
//! │  ReminderRecord: one row per (document, reminder type)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Quote revisions are separate `Document` rows sharing a `document_number`.
//! Line items reference their parent by id only; there is no back-reference.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::{GstRate, Money};
use crate::status::DocumentStatus;

// =============================================================================
// Document Kind
// =============================================================================

/// Quote or invoice. Both are handled identically by numbering and totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Quote,
    Invoice,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 2] = [DocumentKind::Quote, DocumentKind::Invoice];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Quote => "quote",
            DocumentKind::Invoice => "invoice",
        }
    }

    /// The public-link token type for this kind.
    pub fn token_type(&self) -> TokenType {
        match self {
            DocumentKind::Quote => TokenType::QuoteToken,
            DocumentKind::Invoice => TokenType::InvoiceToken,
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Discount
// =============================================================================

/// How `discount_value` is interpreted.
///
/// | Type    | `discount_value` unit      |
/// |---------|----------------------------|
/// | None    | ignored                    |
/// | Percent | basis points (1000 = 10%)  |
/// | Dollar  | cents                      |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    #[default]
    None,
    Percent,
    Dollar,
}

// =============================================================================
// Plan Tier
// =============================================================================

/// Subscription tier; limits how many new documents a company may create per
/// calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    #[default]
    Free,
    Starter,
    Pro,
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanTier::Free => write!(f, "free"),
            PlanTier::Starter => write!(f, "starter"),
            PlanTier::Pro => write!(f, "pro"),
        }
    }
}

// =============================================================================
// Company & Client
// =============================================================================

/// A company issuing quotes and invoices.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Company {
    pub id: String,
    pub name: String,
    pub plan: PlanTier,
    /// ISO 4217 code, e.g. "AUD".
    pub currency: String,
    /// Payment links are only embedded when this is set.
    pub merchant_account_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A company's customer; the recipient of documents and reminders.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Client {
    pub id: String,
    pub company_id: String,
    pub name: String,
    pub email: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sequence Counter
// =============================================================================

/// Per-company, per-kind source of human-readable numbers.
///
/// `current_number` is the last number handed out and never decreases. The
/// formatted string is never parsed back; this integer is the only source of
/// truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SequenceCounter {
    pub company_id: String,
    pub document_kind: DocumentKind,
    /// May contain `{YYYY}`, `{YY}`, `{MM}` or `{DD}`.
    pub prefix: String,
    pub postfix: String,
    pub current_number: i64,
    /// Minimum digits; shorter numbers are zero-padded.
    pub number_padding: i64,
}

impl SequenceCounter {
    /// A counter whose first allocation yields `base_number`.
    pub fn starting_at(
        company_id: impl Into<String>,
        document_kind: DocumentKind,
        prefix: impl Into<String>,
        postfix: impl Into<String>,
        number_padding: i64,
        base_number: i64,
    ) -> Self {
        SequenceCounter {
            company_id: company_id.into(),
            document_kind,
            prefix: prefix.into(),
            postfix: postfix.into(),
            current_number: base_number - 1,
            number_padding,
        }
    }
}

// =============================================================================
// Line Items
// =============================================================================

/// A line as submitted by the caller. Nothing here is computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItemDraft {
    pub description: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// 0 for GST-free lines, otherwise the configured rate (1000 = 10%).
    pub gst_rate_bps: u32,
}

impl LineItemDraft {
    pub fn new(
        description: impl Into<String>,
        quantity: i64,
        unit_price_cents: i64,
        gst_rate_bps: u32,
    ) -> Self {
        LineItemDraft {
            description: description.into(),
            quantity,
            unit_price_cents,
            gst_rate_bps,
        }
    }

    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    pub fn gst_rate(&self) -> GstRate {
        GstRate::from_bps(self.gst_rate_bps)
    }
}

/// A persisted line. Owned by exactly one document and deleted with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct LineItem {
    pub id: String,
    pub document_id: String,
    /// Zero-based order on the document.
    pub position: i64,
    pub description: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub gst_rate_bps: i64,
    /// Inclusive of GST.
    pub line_total_cents: i64,
    pub line_gst_cents: i64,
}

impl LineItem {
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }

    /// Back to the submitted shape, for cloning into a revision or duplicate.
    pub fn to_draft(&self) -> LineItemDraft {
        LineItemDraft {
            description: self.description.clone(),
            quantity: self.quantity,
            unit_price_cents: self.unit_price_cents,
            gst_rate_bps: self.gst_rate_bps.clamp(0, u32::MAX as i64) as u32,
        }
    }
}

// =============================================================================
// Document
// =============================================================================

/// A quote or invoice as persisted.
///
/// `total_price_cents` and `total_gst_cents` are always server-computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Document {
    pub id: String,
    pub company_id: String,
    pub client_id: String,
    pub kind: DocumentKind,
    /// Stable across quote revisions.
    pub document_number: String,
    /// 0 for the original; always 0 for invoices.
    pub revision_number: i64,
    pub status: DocumentStatus,
    #[ts(as = "String")]
    pub issue_date: NaiveDate,
    /// Expiry date for quotes, payment due date for invoices.
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    pub line_items: Vec<LineItem>,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub total_price_cents: i64,
    pub total_gst_cents: i64,
    /// Internal / terms notes, copied into revisions.
    pub notes: Option<String>,
    /// Client-visible response (e.g. a rejection reason). Never copied.
    pub client_notes: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn total_price(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }

    pub fn total_gst(&self) -> Money {
        Money::from_cents(self.total_gst_cents)
    }

    /// "Q-0001" for originals, "Q-0001 (rev 2)" for revisions.
    pub fn display_number(&self) -> String {
        if self.revision_number == 0 {
            self.document_number.clone()
        } else {
            format!("{} (rev {})", self.document_number, self.revision_number)
        }
    }
}

// =============================================================================
// Document Draft
// =============================================================================

/// Inbound create/update request.
///
/// ```text
/// id: None,    document_number: None        → brand-new document
/// id: None,    document_number: Some, status non-initial → new quote revision
/// id: Some                                  → in-place update
/// ```
///
/// `total_price_cents` / `total_gst_cents` are accepted so clients can echo
/// what they display, but are discarded and recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DocumentDraft {
    #[serde(default)]
    pub id: Option<String>,
    pub kind: DocumentKind,
    pub client_id: String,
    #[serde(default)]
    pub document_number: Option<String>,
    #[serde(default)]
    pub status: Option<DocumentStatus>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub issue_date: Option<NaiveDate>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub line_items: Vec<LineItemDraft>,
    #[serde(default)]
    pub discount_type: DiscountType,
    #[serde(default)]
    pub discount_value: i64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub total_price_cents: Option<i64>,
    #[serde(default)]
    pub total_gst_cents: Option<i64>,
}

impl DocumentDraft {
    /// An empty brand-new draft.
    pub fn new(kind: DocumentKind, client_id: impl Into<String>) -> Self {
        DocumentDraft {
            id: None,
            kind,
            client_id: client_id.into(),
            document_number: None,
            status: None,
            issue_date: None,
            due_date: None,
            line_items: Vec::new(),
            discount_type: DiscountType::None,
            discount_value: 0,
            notes: None,
            total_price_cents: None,
            total_gst_cents: None,
        }
    }

    pub fn with_line(mut self, line: LineItemDraft) -> Self {
        self.line_items.push(line);
        self
    }

    pub fn with_discount(mut self, discount_type: DiscountType, value: i64) -> Self {
        self.discount_type = discount_type;
        self.discount_value = value;
        self
    }
}

// =============================================================================
// Approval Tokens
// =============================================================================

/// Which public link a token grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenType {
    QuoteToken,
    InvoiceToken,
}

impl TokenType {
    pub fn document_kind(&self) -> DocumentKind {
        match self {
            TokenType::QuoteToken => DocumentKind::Quote,
            TokenType::InvoiceToken => DocumentKind::Invoice,
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::QuoteToken => write!(f, "QUOTE_TOKEN"),
            TokenType::InvoiceToken => write!(f, "INVOICE_TOKEN"),
        }
    }
}

/// The single live token for a (client, company, token type) key.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ApprovalToken {
    pub client_id: String,
    pub company_id: String,
    pub token_type: TokenType,
    pub document_id: String,
    /// The signed token string exactly as handed to the client.
    pub token: String,
    /// Unix seconds.
    pub expires_at: i64,
}

// =============================================================================
// Reminder Records
// =============================================================================

/// Outcome of one reminder attempt for a (document, reminder type) pair.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ReminderRecord {
    pub id: String,
    pub document_id: String,
    pub reminder_type: crate::reminder::ReminderType,
    pub recipient: String,
    pub success: bool,
    pub error: Option<String>,
    #[ts(as = "String")]
    pub sent_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Document State Machine
//!
//! Lifecycle rules for quotes and invoices, expressed as explicit allow-lists.
//!
//! ## Quote Lifecycle
//! ```text
//!   PENDING ──► SENT ──┬──► ACCEPTED
//!      │         │     └──► REJECTED
//!      │         │
//!      └─────────┴────────► CANCELLED
//!
//!   PENDING may also go straight to ACCEPTED / REJECTED when a user records
//!   a decision taken outside the system.
//! ```
//!
//! ## Invoice Lifecycle
//! ```text
//!   DRAFT ──► SENT ──► PAID
//!     │        │
//!     └────────┴────► CANCELLED
//! ```
//!
//! Only PENDING / DRAFT are mutable in place. ACCEPTED, REJECTED, CANCELLED and
//! PAID are terminal. A public client (holding an approval link) may only move
//! a quote to ACCEPTED or REJECTED.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::DocumentKind;

// =============================================================================
// Quote Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Pending,
    Sent,
    Accepted,
    Rejected,
    Cancelled,
}

impl QuoteStatus {
    pub const INITIAL: QuoteStatus = QuoteStatus::Pending;

    /// Statuses reachable from `self`.
    pub fn allowed_targets(&self) -> &'static [QuoteStatus] {
        use QuoteStatus::*;
        match self {
            Pending => &[Sent, Accepted, Rejected, Cancelled],
            Sent => &[Accepted, Rejected, Cancelled],
            Accepted | Rejected | Cancelled => &[],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Pending => "pending",
            QuoteStatus::Sent => "sent",
            QuoteStatus::Accepted => "accepted",
            QuoteStatus::Rejected => "rejected",
            QuoteStatus::Cancelled => "cancelled",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(QuoteStatus::Pending),
            "sent" => Some(QuoteStatus::Sent),
            "accepted" => Some(QuoteStatus::Accepted),
            "rejected" => Some(QuoteStatus::Rejected),
            "cancelled" => Some(QuoteStatus::Cancelled),
            _ => None,
        }
    }
}

// =============================================================================
// Invoice Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    pub const INITIAL: InvoiceStatus = InvoiceStatus::Draft;

    /// Statuses reachable from `self`.
    pub fn allowed_targets(&self) -> &'static [InvoiceStatus] {
        use InvoiceStatus::*;
        match self {
            Draft => &[Sent, Cancelled],
            Sent => &[Paid, Cancelled],
            Paid | Cancelled => &[],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(InvoiceStatus::Draft),
            "sent" => Some(InvoiceStatus::Sent),
            "paid" => Some(InvoiceStatus::Paid),
            "cancelled" => Some(InvoiceStatus::Cancelled),
            _ => None,
        }
    }
}

// =============================================================================
// Document Status
// =============================================================================

/// Status of either document kind.
///
/// Serialized adjacently tagged so "sent" is never ambiguous:
/// `{"kind": "invoice", "value": "sent"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DocumentStatus {
    Quote(QuoteStatus),
    Invoice(InvoiceStatus),
}

impl DocumentStatus {
    /// PENDING for quotes, DRAFT for invoices.
    pub fn initial(kind: DocumentKind) -> Self {
        match kind {
            DocumentKind::Quote => DocumentStatus::Quote(QuoteStatus::INITIAL),
            DocumentKind::Invoice => DocumentStatus::Invoice(InvoiceStatus::INITIAL),
        }
    }

    /// SENT for either kind.
    pub fn sent(kind: DocumentKind) -> Self {
        match kind {
            DocumentKind::Quote => DocumentStatus::Quote(QuoteStatus::Sent),
            DocumentKind::Invoice => DocumentStatus::Invoice(InvoiceStatus::Sent),
        }
    }

    pub fn kind(&self) -> DocumentKind {
        match self {
            DocumentStatus::Quote(_) => DocumentKind::Quote,
            DocumentStatus::Invoice(_) => DocumentKind::Invoice,
        }
    }

    pub fn is_initial(&self) -> bool {
        *self == DocumentStatus::initial(self.kind())
    }

    /// Editable in place (PENDING / DRAFT). Also the only deletable states.
    pub fn is_mutable(&self) -> bool {
        self.is_initial()
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_targets().is_empty()
    }

    pub fn is_sent(&self) -> bool {
        *self == DocumentStatus::sent(self.kind())
    }

    pub fn allowed_targets(&self) -> Vec<DocumentStatus> {
        match self {
            DocumentStatus::Quote(s) => s
                .allowed_targets()
                .iter()
                .copied()
                .map(DocumentStatus::Quote)
                .collect(),
            DocumentStatus::Invoice(s) => s
                .allowed_targets()
                .iter()
                .copied()
                .map(DocumentStatus::Invoice)
                .collect(),
        }
    }

    pub fn can_transition_to(&self, target: DocumentStatus) -> bool {
        self.allowed_targets().contains(&target)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Quote(s) => s.as_str(),
            DocumentStatus::Invoice(s) => s.as_str(),
        }
    }

    /// Parses the stored column value for a document of `kind`.
    pub fn parse(kind: DocumentKind, s: &str) -> Option<Self> {
        match kind {
            DocumentKind::Quote => QuoteStatus::parse(s).map(DocumentStatus::Quote),
            DocumentKind::Invoice => InvoiceStatus::parse(s).map(DocumentStatus::Invoice),
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Actor & Transition Validation
// =============================================================================

/// Who is asking for a status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Actor {
    /// An authenticated company user.
    User { user_id: String },
    /// An unauthenticated client holding a valid approval link.
    PublicClient { client_id: String },
}

impl Actor {
    pub fn user(user_id: impl Into<String>) -> Self {
        Actor::User {
            user_id: user_id.into(),
        }
    }
}

/// Checks `from → to` against the allow-list for the document kind.
///
/// ## Example
/// ```rust
/// use folio_core::status::{validate_transition, DocumentStatus, QuoteStatus};
///
/// let sent = DocumentStatus::Quote(QuoteStatus::Sent);
/// assert!(validate_transition(sent, DocumentStatus::Quote(QuoteStatus::Accepted)).is_ok());
/// assert!(validate_transition(sent, DocumentStatus::Quote(QuoteStatus::Pending)).is_err());
/// ```
pub fn validate_transition(from: DocumentStatus, to: DocumentStatus) -> CoreResult<()> {
    if from.can_transition_to(to) {
        return Ok(());
    }

    Err(CoreError::InvalidStatusTransition {
        from: from.to_string(),
        to: to.to_string(),
        allowed: from
            .allowed_targets()
            .iter()
            .map(|s| s.to_string())
            .collect(),
    })
}

/// [`validate_transition`] plus the actor rule: public clients may only
/// accept or reject a quote.
pub fn validate_transition_by(
    actor: &Actor,
    from: DocumentStatus,
    to: DocumentStatus,
) -> CoreResult<()> {
    if let Actor::PublicClient { .. } = actor {
        let public_target = matches!(
            to,
            DocumentStatus::Quote(QuoteStatus::Accepted) | DocumentStatus::Quote(QuoteStatus::Rejected)
        );
        if !public_target {
            return Err(CoreError::IllegalTransition(format!(
                "A public link cannot move a document to {}",
                to
            )));
        }
    }

    validate_transition(from, to)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const PENDING: DocumentStatus = DocumentStatus::Quote(QuoteStatus::Pending);
    const Q_SENT: DocumentStatus = DocumentStatus::Quote(QuoteStatus::Sent);
    const ACCEPTED: DocumentStatus = DocumentStatus::Quote(QuoteStatus::Accepted);
    const REJECTED: DocumentStatus = DocumentStatus::Quote(QuoteStatus::Rejected);
    const Q_CANCELLED: DocumentStatus = DocumentStatus::Quote(QuoteStatus::Cancelled);
    const DRAFT: DocumentStatus = DocumentStatus::Invoice(InvoiceStatus::Draft);
    const I_SENT: DocumentStatus = DocumentStatus::Invoice(InvoiceStatus::Sent);
    const PAID: DocumentStatus = DocumentStatus::Invoice(InvoiceStatus::Paid);
    const I_CANCELLED: DocumentStatus = DocumentStatus::Invoice(InvoiceStatus::Cancelled);

    #[test]
    fn test_quote_allow_list() {
        assert!(PENDING.can_transition_to(Q_SENT));
        assert!(PENDING.can_transition_to(Q_CANCELLED));
        assert!(Q_SENT.can_transition_to(ACCEPTED));
        assert!(Q_SENT.can_transition_to(REJECTED));
        assert!(Q_SENT.can_transition_to(Q_CANCELLED));
        assert!(!Q_SENT.can_transition_to(PENDING));
        assert!(!ACCEPTED.can_transition_to(REJECTED));
    }

    #[test]
    fn test_invoice_allow_list() {
        assert!(DRAFT.can_transition_to(I_SENT));
        assert!(DRAFT.can_transition_to(I_CANCELLED));
        assert!(I_SENT.can_transition_to(PAID));
        assert!(!DRAFT.can_transition_to(PAID));
        assert!(!PAID.can_transition_to(I_CANCELLED));
    }

    #[test]
    fn test_kinds_never_mix() {
        assert!(!DRAFT.can_transition_to(Q_SENT));
        assert!(validate_transition(PENDING, I_SENT).is_err());
    }

    #[test]
    fn test_terminal_and_mutable_sets() {
        for s in [ACCEPTED, REJECTED, Q_CANCELLED, PAID, I_CANCELLED] {
            assert!(s.is_terminal(), "{s} should be terminal");
            assert!(!s.is_mutable());
        }
        assert!(PENDING.is_mutable());
        assert!(DRAFT.is_mutable());
        assert!(!Q_SENT.is_mutable());
        assert!(!I_SENT.is_terminal());
    }

    #[test]
    fn test_invalid_transition_lists_allowed() {
        let err = validate_transition(Q_SENT, PENDING).unwrap_err();
        match err {
            CoreError::InvalidStatusTransition { allowed, .. } => {
                assert_eq!(allowed, vec!["accepted", "rejected", "cancelled"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_public_client_can_only_decide_quotes() {
        let client = Actor::PublicClient {
            client_id: "client-1".to_string(),
        };
        assert!(validate_transition_by(&client, Q_SENT, ACCEPTED).is_ok());
        assert!(validate_transition_by(&client, Q_SENT, REJECTED).is_ok());
        assert!(matches!(
            validate_transition_by(&client, Q_SENT, Q_CANCELLED),
            Err(CoreError::IllegalTransition(_))
        ));
        assert!(matches!(
            validate_transition_by(&client, I_SENT, PAID),
            Err(CoreError::IllegalTransition(_))
        ));

        let user = Actor::user("user-1");
        assert!(validate_transition_by(&user, Q_SENT, Q_CANCELLED).is_ok());
    }

    #[test]
    fn test_parse_round_trips_stored_values() {
        assert_eq!(DocumentStatus::parse(DocumentKind::Invoice, "sent"), Some(I_SENT));
        assert_eq!(DocumentStatus::parse(DocumentKind::Quote, "sent"), Some(Q_SENT));
        assert_eq!(DocumentStatus::parse(DocumentKind::Quote, "paid"), None);
    }

    #[test]
    fn test_serialized_status_is_tagged() {
        let json = serde_json::to_string(&I_SENT).unwrap();
        assert_eq!(json, r#"{"kind":"invoice","value":"sent"}"#);
    }
}

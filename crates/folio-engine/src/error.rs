//! # Engine Error Types
//!
//! What callers of the engine see.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Engine Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────────┐  ┌─────────────────────┐  ┌─────────────────┐ │
//! │  │  Setup              │  │  Rules              │  │  Public links   │ │
//! │  │                     │  │                     │  │                 │ │
//! │  │  ConfigurationMissing│ │  IllegalTransition  │  │  TokenInvalid   │ │
//! │  │  Config             │  │  InvalidStatus...   │  │  AccessDenied   │ │
//! │  │                     │  │  PlanLimitExceeded  │  │                 │ │
//! │  │                     │  │  Validation         │  │                 │ │
//! │  └─────────────────────┘  └─────────────────────┘  └─────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────────┐  ┌─────────────────────┐                      │
//! │  │  Lookup             │  │  Infrastructure     │                      │
//! │  │  NotFound           │  │  Delivery, Database │                      │
//! │  └─────────────────────┘  └─────────────────────┘                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! None of these are retried inside the engine. Reminder delivery failures
//! never surface here at all; they are recorded and retried on the next tick.

use folio_core::{CoreError, DocumentKind, PlanTier, ValidationError};
use folio_db::DbError;
use thiserror::Error;

use crate::delivery::DeliveryError;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    // =========================================================================
    // Setup
    // =========================================================================
    /// No sequence counter provisioned for the pair.
    #[error("No {kind} numbering configured for company {company_id}; set up document numbering first")]
    ConfigurationMissing {
        company_id: String,
        kind: DocumentKind,
    },

    /// Invalid or unreadable engine configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    // =========================================================================
    // Rules
    // =========================================================================
    /// Mutation of a document outside its mutable states, or an actor not
    /// permitted to make a change.
    #[error("{0}")]
    IllegalTransition(String),

    /// Status change not on the allow-list.
    #[error("Cannot change status from {from} to {to}; allowed: [{}]", allowed.join(", "))]
    InvalidStatusTransition {
        from: String,
        to: String,
        allowed: Vec<String>,
    },

    /// Monthly new-document cap reached.
    #[error("The {plan} plan allows {limit} new documents per month; upgrade to create more")]
    PlanLimitExceeded { plan: PlanTier, limit: u32 },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    // =========================================================================
    // Public links
    // =========================================================================
    /// Token expired, superseded, revoked or malformed.
    #[error("This link is invalid or has expired")]
    TokenInvalid,

    /// Token is genuine but does not grant access to what was asked for.
    #[error("Access denied")]
    AccessDenied,

    // =========================================================================
    // Lookup & infrastructure
    // =========================================================================
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Sending a document failed after its state was committed.
    #[error("Delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Database error: {0}")]
    Database(DbError),
}

impl EngineError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// `TokenInvalid` or `AccessDenied`. An HTTP layer answers both the same
    /// way so callers cannot tell which check failed.
    pub fn is_authorization_failure(&self) -> bool {
        matches!(self, EngineError::TokenInvalid | EngineError::AccessDenied)
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidStatusTransition { from, to, allowed } => {
                EngineError::InvalidStatusTransition { from, to, allowed }
            }
            CoreError::IllegalTransition(msg) => EngineError::IllegalTransition(msg),
            CoreError::Validation(e) => EngineError::Validation(e),
        }
    }
}

impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            other => EngineError::Database(other),
        }
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        DbError::from(err).into()
    }
}

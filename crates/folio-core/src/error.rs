//! # Error Types
//!
//! Domain-specific error types for folio-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  folio-core errors (this file)                                         │
//! │  ├── CoreError        - Lifecycle / mutability rule violations         │
//! │  └── ValidationError  - Malformed drafts and line items                │
//! │                                                                         │
//! │  folio-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  folio-engine errors                                                   │
//! │  └── EngineError      - What callers see                               │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → HTTP layer          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Requested status is not reachable from the current one.
    ///
    /// ## User Workflow
    /// ```text
    /// Quote Q-0001 (ACCEPTED)
    ///      │
    ///      ▼
    /// change_status(SENT)
    ///      │
    ///      ▼
    /// InvalidStatusTransition { from: "accepted", to: "sent", allowed: [] }
    /// ```
    #[error("Cannot change status from {from} to {to}; allowed: [{}]", allowed.join(", "))]
    InvalidStatusTransition {
        from: String,
        to: String,
        allowed: Vec<String>,
    },

    /// Attempted mutation of a document that is no longer editable.
    #[error("{0}")]
    IllegalTransition(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// A single failing line item fails the whole draft: partial totals are never
/// computed or persisted.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format or combination (e.g. due date before issue date).
    #[error("{field} is invalid: {reason}")]
    Invalid { field: String, reason: String },

    /// Too many entries in a collection.
    #[error("{field} cannot have more than {max} entries")]
    TooMany { field: String, max: usize },

    /// Arithmetic overflow while totalling.
    #[error("{field} is too large to total")]
    Overflow { field: String },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Invalid`].
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

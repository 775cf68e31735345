//! # Validation Module
//!
//! Draft validation, run before any totals are computed or rows written.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Web client                                                   │
//! │  └── Immediate feedback, never trusted                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Line items: quantity, price, GST rate, description                │
//! │  ├── Discount: type / value combination                                │
//! │  └── Draft: client, dates, status kind                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── CHECK (quantity > 0)                                              │
//! │  └── UNIQUE (company, kind, number, revision)                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::{DiscountType, DocumentDraft, LineItemDraft};
use crate::{MAX_GST_RATE_BPS, MAX_LINE_ITEMS, MAX_LINE_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_DESCRIPTION_LEN: usize = 500;
const MAX_NOTES_LEN: usize = 5000;

// =============================================================================
// Line Items
// =============================================================================

/// Validates one line. `index` is used for the field path in errors.
pub fn validate_line_item(index: usize, line: &LineItemDraft) -> ValidationResult<()> {
    let field = |name: &str| format!("line_items[{}].{}", index, name);

    let description = line.description.trim();
    if description.is_empty() {
        return Err(ValidationError::Required {
            field: field("description"),
        });
    }
    if description.len() > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::TooLong {
            field: field("description"),
            max: MAX_DESCRIPTION_LEN,
        });
    }

    if line.quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field("quantity"),
        });
    }
    if line.quantity > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: field("quantity"),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    if line.unit_price_cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field("unit_price"),
        });
    }

    if line.gst_rate_bps > MAX_GST_RATE_BPS {
        return Err(ValidationError::OutOfRange {
            field: field("gst_rate"),
            min: 0,
            max: MAX_GST_RATE_BPS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Discount
// =============================================================================

/// Validates the discount pair.
///
/// Neither kind has an upper bound: a DOLLAR discount above the subtotal or
/// a PERCENT discount above 100% yields a negative grand total.
pub fn validate_discount(discount_type: DiscountType, value: i64) -> ValidationResult<()> {
    match discount_type {
        DiscountType::None => Ok(()),
        DiscountType::Dollar | DiscountType::Percent if value < 0 => {
            Err(ValidationError::MustNotBeNegative {
                field: "discount_value".to_string(),
            })
        }
        _ => Ok(()),
    }
}

// =============================================================================
// Drafts
// =============================================================================

/// Validates everything about a draft that does not need the database.
pub fn validate_draft(draft: &DocumentDraft) -> ValidationResult<()> {
    if draft.client_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "client_id".to_string(),
        });
    }

    if let Some(status) = draft.status {
        if status.kind() != draft.kind {
            return Err(ValidationError::invalid(
                "status",
                format!("{} is not a {} status", status, draft.kind),
            ));
        }
    }

    if let Some(number) = &draft.document_number {
        if number.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "document_number".to_string(),
            });
        }
    }

    if draft.line_items.len() > MAX_LINE_ITEMS {
        return Err(ValidationError::TooMany {
            field: "line_items".to_string(),
            max: MAX_LINE_ITEMS,
        });
    }

    if let Some(notes) = &draft.notes {
        if notes.len() > MAX_NOTES_LEN {
            return Err(ValidationError::TooLong {
                field: "notes".to_string(),
                max: MAX_NOTES_LEN,
            });
        }
    }

    if let (Some(issue), Some(due)) = (draft.issue_date, draft.due_date) {
        if due < issue {
            return Err(ValidationError::invalid(
                "due_date",
                "must not be before the issue date",
            ));
        }
    }

    for (index, line) in draft.line_items.iter().enumerate() {
        validate_line_item(index, line)?;
    }

    validate_discount(draft.discount_type, draft.discount_value)
}

/// Validates a client's free-text response note.
pub fn validate_client_note(note: &str) -> ValidationResult<()> {
    if note.len() > MAX_NOTES_LEN {
        return Err(ValidationError::TooLong {
            field: "note".to_string(),
            max: MAX_NOTES_LEN,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

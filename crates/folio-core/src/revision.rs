//! # Revision Rules
//!
//! Decides what a create/update request means, and builds the drafts used to
//! clone a document into a new revision or a wholly new document.
//!
//! ```text
//! ┌──────────────┬──────────────────┬──────────────────┬──────────────────┐
//! │ draft.id     │ document_number  │ status           │ intent           │
//! ├──────────────┼──────────────────┼──────────────────┼──────────────────┤
//! │ None         │ None             │ any / none       │ Create           │
//! │ None         │ Some             │ non-initial      │ Revise (quotes)  │
//! │ None         │ Some             │ initial / none   │ rejected         │
//! │ Some         │ ignored          │ any / none       │ Update in place  │
//! └──────────────┴──────────────────┴──────────────────┴──────────────────┘
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{Document, DocumentDraft, DocumentKind};

/// What a draft asks the revision manager to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftIntent {
    /// Brand-new document: allocate a number, revision 0.
    Create,
    /// New revision of an existing quote number.
    Revise { document_number: String },
    /// In-place update of a persisted document.
    Update { id: String },
}

/// Classifies a draft.
///
/// ## Example
/// ```rust
/// use folio_core::revision::{classify_draft, DraftIntent};
/// use folio_core::{DocumentDraft, DocumentKind};
///
/// let draft = DocumentDraft::new(DocumentKind::Quote, "client-1");
/// assert_eq!(classify_draft(&draft).unwrap(), DraftIntent::Create);
/// ```
pub fn classify_draft(draft: &DocumentDraft) -> CoreResult<DraftIntent> {
    if let Some(id) = &draft.id {
        return Ok(DraftIntent::Update { id: id.clone() });
    }

    let Some(number) = &draft.document_number else {
        return Ok(DraftIntent::Create);
    };

    if draft.kind == DocumentKind::Invoice {
        return Err(ValidationError::invalid(
            "document_number",
            "invoices are numbered by the server and cannot be revised",
        )
        .into());
    }

    match draft.status {
        Some(status) if !status.is_initial() => Ok(DraftIntent::Revise {
            document_number: number.clone(),
        }),
        _ => Err(CoreError::Validation(ValidationError::invalid(
            "document_number",
            "must be empty for a new quote; to revise, submit the current non-pending status",
        ))),
    }
}

/// Draft for the next revision of `source`.
///
/// Copies line items, discount and notes. Client-visible response notes and
/// dates are not copied: a revision is a fresh offer.
pub fn revision_draft(source: &Document) -> DocumentDraft {
    DocumentDraft {
        document_number: Some(source.document_number.clone()),
        ..copy_content(source)
    }
}

/// Draft for a wholly new document with the same content as `source`.
pub fn duplicate_draft(source: &Document) -> DocumentDraft {
    copy_content(source)
}

fn copy_content(source: &Document) -> DocumentDraft {
    DocumentDraft {
        id: None,
        kind: source.kind,
        client_id: source.client_id.clone(),
        document_number: None,
        status: None,
        issue_date: None,
        due_date: None,
        line_items: source.line_items.iter().map(|li| li.to_draft()).collect(),
        discount_type: source.discount_type,
        discount_value: source.discount_value,
        notes: source.notes.clone(),
        total_price_cents: None,
        total_gst_cents: None,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

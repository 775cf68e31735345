//! # folio-core: Pure Business Logic for Folio
//!
//! Everything about quotes and invoices that can be decided without touching
//! a database, a mail server or the system clock lives here.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Folio Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                folio-engine (services, transactions)            │   │
//! │  │  SequenceAllocator · RevisionManager · DocumentService          │   │
//! │  │  ApprovalTokenService · ReminderScheduler                       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ folio-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │  ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌─────────┐ ┌──────────┐ │   │
//! │  │  │  money  │ │ totals  │ │numbering │ │ status  │ │ revision │ │   │
//! │  │  │ Money   │ │ GST +   │ │ Q-0001   │ │ allow-  │ │ draft    │ │   │
//! │  │  │ GstRate │ │discount │ │ tokens   │ │ lists   │ │ intent   │ │   │
//! │  │  └─────────┘ └─────────┘ └──────────┘ └─────────┘ └──────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    folio-db (Database Layer)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Document, LineItem, SequenceCounter, ...)
//! - [`money`] - Money and GST rate with integer arithmetic
//! - [`totals`] - Line totals, aggregate GST and discounted grand total
//! - [`numbering`] - Human-readable sequence number formatting
//! - [`status`] - Quote and invoice lifecycle allow-lists
//! - [`revision`] - Classifying drafts and cloning revisions
//! - [`reminder`] - Reminder types and their day offsets
//! - [`validation`] - Draft validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use folio_core::totals::compute_totals;
//! use folio_core::{DiscountType, LineItemDraft};
//!
//! let lines = vec![LineItemDraft::new("Consulting", 2, 5000, 1000)];
//! let totals = compute_totals(&lines, DiscountType::Percent, 1000).unwrap();
//!
//! assert_eq!(totals.lines[0].total.cents(), 11000); // $110.00
//! assert_eq!(totals.total_gst.cents(), 1000);       // $10.00
//! assert_eq!(totals.grand_total.cents(), 9900);     // $99.00
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod numbering;
pub mod reminder;
pub mod revision;
pub mod status;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{GstRate, Money};
pub use reminder::ReminderType;
pub use status::{Actor, DocumentStatus, InvoiceStatus, QuoteStatus};
pub use totals::{DocumentTotals, LineTotals};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items on a single document.
pub const MAX_LINE_ITEMS: usize = 200;

/// Maximum quantity on a single line.
///
/// Catches accidental over-entry (typing 100000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 99_999;

/// Highest GST rate accepted, in basis points (100%).
pub const MAX_GST_RATE_BPS: u32 = 10_000;

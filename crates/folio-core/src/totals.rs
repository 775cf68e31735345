//! # Financial Calculator
//!
//! Computes line totals, aggregate GST and the discounted grand total for a
//! list of line items. Always run server-side; totals supplied by a client are
//! discarded.
//!
//! ## Calculation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  for each line:                                                         │
//! │      subtotal = quantity × unit_price                                   │
//! │      total    = round2(subtotal × (1 + gst_rate))    (half-up)          │
//! │      gst      = total − subtotal                                        │
//! │                                                                         │
//! │  subtotal  = Σ line totals            (GST inclusive, not re-rounded)   │
//! │  total_gst = Σ line gst                                                 │
//! │                                                                         │
//! │  discount, applied to the GST-inclusive subtotal:                       │
//! │      NONE    → 0                                                        │
//! │      DOLLAR  → discount_value cents                                     │
//! │      PERCENT → round2(subtotal × discount_value / 10000)                │
//! │                                                                         │
//! │  grand_total = subtotal − discount    (may be negative, never clamped)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Pure and deterministic: identical inputs always give identical outputs.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{DiscountType, LineItemDraft};
use crate::validation::{validate_discount, validate_line_item, ValidationResult};

/// Computed amounts for one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineTotals {
    /// quantity × unit price, before GST.
    pub subtotal: Money,
    pub gst: Money,
    /// GST inclusive.
    pub total: Money,
}

/// Computed amounts for a whole document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DocumentTotals {
    /// One entry per input line, same order.
    pub lines: Vec<LineTotals>,
    /// Sum of GST-inclusive line totals.
    pub subtotal: Money,
    pub total_gst: Money,
    pub discount: Money,
    /// `subtotal - discount`.
    pub grand_total: Money,
}

/// Totals for a single line.
///
/// ## Example
/// ```rust
/// use folio_core::totals::line_totals;
/// use folio_core::LineItemDraft;
///
/// let t = line_totals(&LineItemDraft::new("Widget", 2, 5000, 1000)).unwrap();
/// assert_eq!(t.total.cents(), 11000);
/// assert_eq!(t.gst.cents(), 1000);
/// ```
pub fn line_totals(line: &LineItemDraft) -> ValidationResult<LineTotals> {
    let subtotal = line
        .unit_price()
        .checked_multiply_quantity(line.quantity)
        .ok_or_else(|| ValidationError::Overflow {
            field: "line total".to_string(),
        })?;

    let total = if line.gst_rate().is_zero() {
        subtotal
    } else {
        subtotal
            .checked_add(subtotal.calculate_gst(line.gst_rate()))
            .ok_or_else(|| ValidationError::Overflow {
                field: "line total".to_string(),
            })?
    };

    Ok(LineTotals {
        subtotal,
        gst: total - subtotal,
        total,
    })
}

/// Totals for a document.
///
/// Every line is validated first; one malformed line fails the whole call.
pub fn compute_totals(
    lines: &[LineItemDraft],
    discount_type: DiscountType,
    discount_value: i64,
) -> ValidationResult<DocumentTotals> {
    validate_discount(discount_type, discount_value)?;

    let mut computed = Vec::with_capacity(lines.len());
    let mut subtotal = Money::zero();
    let mut total_gst = Money::zero();

    for (index, line) in lines.iter().enumerate() {
        validate_line_item(index, line)?;
        let t = line_totals(line)?;

        subtotal = subtotal.checked_add(t.total).ok_or_else(|| ValidationError::Overflow {
            field: "subtotal".to_string(),
        })?;
        total_gst += t.gst;
        computed.push(t);
    }

    let discount = match discount_type {
        DiscountType::None => Money::zero(),
        DiscountType::Dollar => Money::from_cents(discount_value),
        DiscountType::Percent => subtotal.checked_apply_rate_half_up(discount_value).ok_or_else(|| {
            ValidationError::Overflow {
                field: "discount".to_string(),
            }
        })?,
    };

    Ok(DocumentTotals {
        lines: computed,
        subtotal,
        total_gst,
        discount,
        grand_total: subtotal.checked_sub(discount).ok_or_else(|| ValidationError::Overflow {
            field: "grand_total".to_string(),
        })?,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

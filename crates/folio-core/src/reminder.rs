//! # Reminder Types
//!
//! Fixed day offsets relative to a document's due (invoice) or expiry (quote)
//! date. A document gets a reminder only on the exact day; every other day it
//! is skipped.
//!
//! ```text
//!              due − 3        due         due + 7       due + 14
//! invoice ────── ● ─────────── ● ────────── ● ─────────── ● ──────►
//!           DUE_IN_3_DAYS  DUE_TODAY  OVERDUE_7_DAYS  OVERDUE_14_DAYS
//!
//!            expiry − 3
//! quote ──────── ● ───────────────────────────────────────────────►
//!         EXPIRES_IN_3_DAYS
//! ```

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::types::DocumentKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReminderType {
    DueIn3Days,
    DueToday,
    Overdue7Days,
    Overdue14Days,
    ExpiresIn3Days,
}

const INVOICE_REMINDERS: [ReminderType; 4] = [
    ReminderType::DueIn3Days,
    ReminderType::DueToday,
    ReminderType::Overdue7Days,
    ReminderType::Overdue14Days,
];

const QUOTE_REMINDERS: [ReminderType; 1] = [ReminderType::ExpiresIn3Days];

impl ReminderType {
    /// Reminder types that apply to a document kind.
    pub fn for_kind(kind: DocumentKind) -> &'static [ReminderType] {
        match kind {
            DocumentKind::Invoice => &INVOICE_REMINDERS,
            DocumentKind::Quote => &QUOTE_REMINDERS,
        }
    }

    /// Days between the due/expiry date and the day the reminder fires.
    /// Negative means before the date.
    pub fn day_offset(&self) -> i64 {
        match self {
            ReminderType::DueIn3Days | ReminderType::ExpiresIn3Days => -3,
            ReminderType::DueToday => 0,
            ReminderType::Overdue7Days => 7,
            ReminderType::Overdue14Days => 14,
        }
    }

    /// The reminder due `today` for a document, if any.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::NaiveDate;
    /// use folio_core::{DocumentKind, ReminderType};
    ///
    /// let due = NaiveDate::from_ymd_opt(2026, 6, 10).unwrap();
    /// let today = NaiveDate::from_ymd_opt(2026, 6, 17).unwrap();
    /// assert_eq!(
    ///     ReminderType::classify(DocumentKind::Invoice, due, today),
    ///     Some(ReminderType::Overdue7Days)
    /// );
    /// ```
    pub fn classify(kind: DocumentKind, due_date: NaiveDate, today: NaiveDate) -> Option<ReminderType> {
        let days = (today - due_date).num_days();
        Self::for_kind(kind)
            .iter()
            .copied()
            .find(|r| r.day_offset() == days)
    }

    /// Due dates that make some reminder fire `today`, paired with the type.
    pub fn trigger_dates(kind: DocumentKind, today: NaiveDate) -> Vec<(NaiveDate, ReminderType)> {
        Self::for_kind(kind)
            .iter()
            .map(|r| (today - Duration::days(r.day_offset()), *r))
            .collect()
    }

    /// Email subject line.
    pub fn subject(&self, display_number: &str) -> String {
        match self {
            ReminderType::DueIn3Days => format!("Invoice {} is due in 3 days", display_number),
            ReminderType::DueToday => format!("Invoice {} is due today", display_number),
            ReminderType::Overdue7Days => format!("Invoice {} is 7 days overdue", display_number),
            ReminderType::Overdue14Days => format!("Invoice {} is 14 days overdue", display_number),
            ReminderType::ExpiresIn3Days => format!("Quote {} expires in 3 days", display_number),
        }
    }
}

impl fmt::Display for ReminderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReminderType::DueIn3Days => "DUE_IN_3_DAYS",
            ReminderType::DueToday => "DUE_TODAY",
            ReminderType::Overdue7Days => "OVERDUE_7_DAYS",
            ReminderType::Overdue14Days => "OVERDUE_14_DAYS",
            ReminderType::ExpiresIn3Days => "EXPIRES_IN_3_DAYS",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

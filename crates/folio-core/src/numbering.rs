//! # Sequence Number Formatting
//!
//! Turns a counter value into the wire-visible document number:
//!
//! ```text
//! prefix (date tokens resolved) + zero-padded(number, padding) + postfix
//!
//!   prefix "Q-{YYYY}-", number 7, padding 4, postfix ""  → "Q-2026-0007"
//!   prefix "INV",       number 12345, padding 4           → "INV12345"
//! ```
//!
//! Recognised tokens: `{YYYY}` `{YY}` `{MM}` `{DD}`. Everything else, including
//! unknown `{...}` groups, is copied verbatim. Numbers wider than the padding
//! are never truncated.

use chrono::{Datelike, NaiveDate};

/// Formats a sequence number as of `date`.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use folio_core::numbering::format_sequence_number;
///
/// let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
/// assert_eq!(format_sequence_number("Q-", 1, "", 4, date), "Q-0001");
/// assert_eq!(format_sequence_number("{YY}{MM}-", 42, "/A", 3, date), "2603-042/A");
/// ```
pub fn format_sequence_number(
    prefix: &str,
    number: i64,
    postfix: &str,
    padding: i64,
    date: NaiveDate,
) -> String {
    let width = padding.clamp(0, 32) as usize;
    format!(
        "{}{:0>width$}{}",
        resolve_date_tokens(prefix, date),
        number,
        resolve_date_tokens(postfix, date),
        width = width
    )
}

/// Substitutes date placeholders in a prefix or postfix.
pub fn resolve_date_tokens(template: &str, date: NaiveDate) -> String {
    if !template.contains('{') {
        return template.to_string();
    }

    let mut out = String::with_capacity(template.len() + 4);
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let candidate = &rest[start..];

        let replaced = [
            ("{YYYY}", format!("{:04}", date.year())),
            ("{YY}", format!("{:02}", date.year().rem_euclid(100))),
            ("{MM}", format!("{:02}", date.month())),
            ("{DD}", format!("{:02}", date.day())),
        ]
        .into_iter()
        .find(|(token, _)| candidate.starts_with(token));

        match replaced {
            Some((token, value)) => {
                out.push_str(&value);
                rest = &candidate[token.len()..];
            }
            None => {
                out.push('{');
                rest = &candidate[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

// =============================================================================
// Unit Tests
// =============================================================================

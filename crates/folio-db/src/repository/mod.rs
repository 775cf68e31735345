//! # Repository Module
//!
//! One repository per table family. Repositories are cheap handles over the
//! shared pool, obtained from [`crate::Database`].
//!
//! ## Two Calling Styles
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Standalone reads                                                       │
//! │      db.documents().get("doc-1")          ← acquires its own connection │
//! │                                                                         │
//! │  Inside a caller-owned transaction                                      │
//! │      let mut tx = db.begin_write().await?;                              │
//! │      CounterRepository::increment(&mut tx, co, kind) ─┐                 │
//! │      DocumentRepository::insert(&mut tx, &doc)        ├─ same tx        │
//! │      TokenRepository::upsert(&mut tx, &token)        ─┘                 │
//! │      tx.commit().await?;                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Associated functions that take `conn: &mut SqliteConnection` never begin
//! or commit a transaction themselves; the caller decides the boundary.
//!
//! ## Available Repositories
//!
//! - [`company::CompanyRepository`] - Companies and provisioning
//! - [`client::ClientRepository`] - Document recipients
//! - [`counter::CounterRepository`] - Sequence counters
//! - [`document::DocumentRepository`] - Quotes, invoices and their line items
//! - [`token::TokenRepository`] - Approval tokens
//! - [`reminder::ReminderRepository`] - Reminder records
//! - [`lease::LeaseRepository`] - Scheduler leases

pub mod client;
pub mod company;
pub mod counter;
pub mod document;
pub mod lease;
pub mod reminder;
pub mod token;

#[cfg(test)]
pub(crate) mod fixtures;

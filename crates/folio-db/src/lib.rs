//! # folio-db: Database Layer for Folio
//!
//! SQLite persistence for companies, clients, sequence counters, documents,
//! approval tokens, reminder records and scheduler leases.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Folio Data Flow                                 │
//! │                                                                         │
//! │  folio-engine (RevisionManager, ApprovalTokenService, ...)             │
//! │       │  begins transactions, passes &mut SqliteConnection down        │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     folio-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ CounterRepo    │   │  (embedded)  │  │   │
//! │  │   │               │◄───│ DocumentRepo   │   │ 001_init.sql │  │   │
//! │  │   │ SqlitePool    │    │ TokenRepo      │   │              │  │   │
//! │  │   │ WAL, FKs on   │    │ ReminderRepo   │   │              │  │   │
//! │  │   │               │    │ LeaseRepo ...  │   │              │  │   │
//! │  │   └───────────────┘    └────────────────┘   └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use folio_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("folio.db")).await?;
//!
//! let mut tx = db.begin_write().await?;
//! let counter = CounterRepository::increment(&mut tx, "co-1", DocumentKind::Quote).await?;
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::client::ClientRepository;
pub use repository::company::CompanyRepository;
pub use repository::counter::CounterRepository;
pub use repository::document::DocumentRepository;
pub use repository::lease::{LeaseRepository, SchedulerLease};
pub use repository::reminder::ReminderRepository;
pub use repository::token::TokenRepository;

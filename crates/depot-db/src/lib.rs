//! # depot-db: Store and Ledger Engine for Depot
//!
//! This crate provides database access and the stock ledger for Depot.
//! It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Depot Data Flow                                  │
//! │                                                                         │
//! │  Caller (route handler, depot-cli, seed)                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     depot-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  StockLedger  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │  (ledger.rs)  │    │  (embedded)  │  │   │
//! │  │   │               │    │ in/out/borrow │    │ 001_initial_ │  │   │
//! │  │   │ SqlitePool    │◄───│ /return       │    │  schema.sql  │  │   │
//! │  │   └───────┬───────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │           │                    │                                │   │
//! │  │           ▼                    ▼                                │   │
//! │  │   ┌─────────────────────────────────────────────────────────┐  │   │
//! │  │   │ Repositories: catalog, balance, movement, records, query│  │   │
//! │  │   └─────────────────────────────────────────────────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and ledger error types
//! - [`repository`] - Repository implementations
//! - [`ledger`] - The transaction recorders
//!
//! ## Usage
//!
//! ```rust,ignore
//! use depot_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/depot.db")).await?;
//!
//! let record = db.ledger().stock_out(request).await?;
//! let low = db.queries().list_low_stock().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult, LedgerError, LedgerResult};
pub use ledger::StockLedger;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::balance::{BalanceRepository, Decrement, Increment};
pub use repository::catalog::CatalogRepository;
pub use repository::movement::{MovementRepository, PairTotal};
pub use repository::query::QueryRepository;
pub use repository::records::RecordRepository;

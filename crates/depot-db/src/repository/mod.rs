//! # Repository Module
//!
//! Database repository implementations for Depot.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Layout                                    │
//! │                                                                         │
//! │  Caller                                                                 │
//! │       │  db.queries().list_stock()          (reads: &self, pool)       │
//! │       │  db.ledger().stock_out(request)     (writes: via StockLedger)  │
//! │       ▼                                                                 │
//! │  Repositories                                                           │
//! │  ├── CatalogRepository   items, locations, categories, users           │
//! │  ├── BalanceRepository   get / increment / decrement                   │
//! │  ├── MovementRepository  append / query / signed totals                │
//! │  ├── RecordRepository    stock-in, stock-out, borrow records           │
//! │  └── QueryRepository     stock views, flow, dashboard, audit           │
//! │       │                                                                 │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Writes that move stock are associated functions taking                │
//! │  `&mut SqliteConnection`, so the ledger can compose several of them    │
//! │  inside one transaction.                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod balance;
pub mod catalog;
pub mod movement;
pub mod query;
pub mod records;

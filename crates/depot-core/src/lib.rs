//! # depot-core: Pure Domain Logic for the Depot Stock Ledger
//!
//! This crate holds the types, error taxonomy and validation rules shared by
//! the store (`depot-db`) and its callers. It has zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Depot Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Callers (route handlers, depot-cli)                │   │
//! │  │    stock-in, stock-out, borrow, return, stock, flow, dashboard  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ depot-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   error   │  │ validation│  │   trend   │  │   │
//! │  │   │  Item     │  │ CoreError │  │   rules   │  │  30-day   │  │   │
//! │  │   │  Movement │  │ Validation│  │  checks   │  │  window   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                depot-db (Store + StockLedger)                   │   │
//! │  │       SQLite balances, movement log, detail records             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Item, Location, Balance, records, movements)
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//! - [`trend`] - Daily in/out trend window
//!
//! ## Example Usage
//!
//! ```rust
//! use depot_core::types::FlowType;
//!
//! // Stock-in adds to the destination, stock-out removes from the source
//! assert_eq!(FlowType::In.as_str(), "in");
//! assert_eq!("borrow".parse::<FlowType>().unwrap(), FlowType::Borrow);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod trend;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Number of calendar days covered by the dashboard in/out trend.
pub const TREND_DAYS: usize = 30;

/// Unit of measure used when an item is created without one.
pub const DEFAULT_UNIT: &str = "pcs";

/// Category label reported for items with neither a category nor a label.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Maximum length of item / location codes.
///
/// Codes are printed on labels and scanned, so they stay short.
pub const MAX_CODE_LEN: usize = 50;

/// Maximum length of display names.
pub const MAX_NAME_LEN: usize = 200;

/// Largest quantity a single record or movement may carry.
pub const MAX_QUANTITY: i64 = 1_000_000_000;

//! # Domain Types
//!
//! Core domain types used throughout Depot.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  CATALOG (referenced, never mutated by the ledger)                     │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐   │
//! │  │    Item     │  │  Location   │  │  Category   │  │    User     │   │
//! │  │ id, code    │  │ id, code    │  │ id, name    │  │ id, username│   │
//! │  │ min_stock   │  │ area        │  │ parent_id   │  │ role        │   │
//! │  └─────────────┘  └─────────────┘  └─────────────┘  └─────────────┘   │
//! │                                                                         │
//! │  LEDGER                                                                │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐   │
//! │  │  Balance    │  │StockInRecord│  │StockOutRec. │  │BorrowRecord │   │
//! │  │ (item, loc) │  │ supplier    │  │ recipient   │  │ kind/status │   │
//! │  │ quantity≥0  │  │ batch_no    │  │ purpose     │  │ borrower    │   │
//! │  └─────────────┘  └─────────────┘  └─────────────┘  └─────────────┘   │
//! │                                                                         │
//! │  ┌───────────────────────────────────────────────────────────────┐     │
//! │  │ MovementEntry (append-only audit trail)                       │     │
//! │  │ item, from_location?, to_location?, quantity, flow_type,      │     │
//! │  │ related_record_id                                             │     │
//! │  └───────────────────────────────────────────────────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business key: (`code`, `username`, ...) - human-readable, scannable

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Flow Type
// =============================================================================

/// The cause of a single movement in the audit trail.
///
/// ## Balance Effect
/// ```text
/// ┌──────────┬──────────────────┬─────────────────────────────────────────┐
/// │ flow     │ location side    │ effect on Balance(item, location)       │
/// ├──────────┼──────────────────┼─────────────────────────────────────────┤
/// │ in       │ to_location      │ + quantity                              │
/// │ out      │ from_location    │ - quantity                              │
/// │ borrow   │ from_location    │ - quantity                              │
/// │ return   │ to_location      │ + quantity                              │
/// │ transfer │ from → to        │ - at source, + at destination           │
/// └──────────┴──────────────────┴─────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum FlowType {
    In,
    Out,
    Transfer,
    Borrow,
    Return,
}

impl FlowType {
    /// All flow types, in declaration order.
    pub const ALL: [FlowType; 5] = [
        FlowType::In,
        FlowType::Out,
        FlowType::Transfer,
        FlowType::Borrow,
        FlowType::Return,
    ];

    /// Returns the stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowType::In => "in",
            FlowType::Out => "out",
            FlowType::Transfer => "transfer",
            FlowType::Borrow => "borrow",
            FlowType::Return => "return",
        }
    }
}

impl fmt::Display for FlowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlowType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "in" => Ok(FlowType::In),
            "out" => Ok(FlowType::Out),
            "transfer" => Ok(FlowType::Transfer),
            "borrow" => Ok(FlowType::Borrow),
            "return" => Ok(FlowType::Return),
            _ => Err(ValidationError::NotAllowed {
                field: "flow_type".to_string(),
                allowed: FlowType::ALL.iter().map(|f| f.to_string()).collect(),
            }),
        }
    }
}

// =============================================================================
// Borrow Kind / Status
// =============================================================================

/// Tag distinguishing the two rows of the borrow table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum BorrowKind {
    /// Items left the location with a borrower.
    Borrow,
    /// Items came back; mirrors an earlier borrow.
    Return,
}

impl BorrowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowKind::Borrow => "borrow",
            BorrowKind::Return => "return",
        }
    }
}

/// Status of a borrow record.
///
/// ## State Machine
/// ```text
///   borrowed ──► returned
///      │
///      └──────► overdue      (declared; nothing transitions here yet)
/// ```
/// No transition leads back to `borrowed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum BorrowStatus {
    Borrowed,
    Returned,
    Overdue,
}

impl BorrowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowStatus::Borrowed => "borrowed",
            BorrowStatus::Returned => "returned",
            BorrowStatus::Overdue => "overdue",
        }
    }

    /// Whether `self → next` is a legal one-way transition.
    pub fn can_transition_to(&self, next: BorrowStatus) -> bool {
        matches!(
            (self, next),
            (BorrowStatus::Borrowed, BorrowStatus::Returned)
                | (BorrowStatus::Borrowed, BorrowStatus::Overdue)
        )
    }
}

impl Default for BorrowStatus {
    fn default() -> Self {
        BorrowStatus::Borrowed
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A stock-keeping item.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Item {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Scannable business code (unique).
    pub code: String,

    pub name: String,

    /// Free-text category label, kept in step with `category_id`.
    pub category: Option<String>,

    /// Normalized category reference (authoritative when present).
    pub category_id: Option<String>,

    /// Unit of measure ("pcs", "box", "m", ...).
    pub unit: String,

    /// Balance at or below this value counts as low stock.
    pub min_stock: i64,

    pub brand: Option<String>,
    pub model: Option<String>,
    pub spec: Option<String>,
    pub description: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Input for creating an item.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewItem {
    pub code: String,
    pub name: String,
    pub category: Option<String>,
    pub category_id: Option<String>,
    pub unit: Option<String>,
    pub min_stock: Option<i64>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub spec: Option<String>,
    pub description: Option<String>,
}

/// A physical storage location.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Location {
    pub id: String,
    pub code: String,
    pub name: String,
    pub area: Option<String>,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Input for creating a location.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewLocation {
    pub code: String,
    pub name: String,
    pub area: Option<String>,
    pub description: Option<String>,
}

/// A normalized item category. Stored flat; callers assemble the tree.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Input for creating a category.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCategory {
    pub name: String,
    pub parent_id: Option<String>,
    pub description: Option<String>,
}

/// A person who operates, receives or borrows stock.
///
/// Credentials live with the authentication service, not here.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: String,
    pub username: String,
    pub name: String,
    pub role: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Input for creating a user.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewUser {
    pub username: String,
    pub name: String,
    pub role: Option<String>,
}

// =============================================================================
// References
// =============================================================================

/// How a caller names an item: internal id, or the scanned code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum ItemRef {
    Id(String),
    Code(String),
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemRef::Id(id) => write!(f, "id {}", id),
            ItemRef::Code(code) => write!(f, "code {}", code),
        }
    }
}

/// How a caller names a location: internal id, or the scanned code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum LocationRef {
    Id(String),
    Code(String),
}

impl fmt::Display for LocationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationRef::Id(id) => write!(f, "id {}", id),
            LocationRef::Code(code) => write!(f, "code {}", code),
        }
    }
}

// =============================================================================
// Balance
// =============================================================================

/// Current on-hand quantity for one (item, location) pair.
///
/// A cached projection of the movement log: it always equals the signed
/// sum of movements touching the pair.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Balance {
    pub id: String,
    pub item_id: String,
    pub location_id: String,
    pub quantity: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Detail Records
// =============================================================================

/// Optional device attributes captured on stock-in / stock-out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DeviceDetails {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub spec: Option<String>,
    pub serial_no: Option<String>,
    pub photo_url: Option<String>,
}

/// An immutable stock-in record. Corrections are new records.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockInRecord {
    pub id: String,
    pub item_id: String,
    pub location_id: String,
    pub quantity: i64,
    pub operator_id: String,
    pub supplier: Option<String>,
    pub batch_no: Option<String>,
    pub remark: Option<String>,
    /// Date the receipt is attributed to (may differ from `created_at`).
    #[ts(as = "String")]
    pub business_date: NaiveDate,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub spec: Option<String>,
    pub serial_no: Option<String>,
    pub photo_url: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// An immutable stock-out record.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockOutRecord {
    pub id: String,
    pub item_id: String,
    pub location_id: String,
    pub quantity: i64,
    pub operator_id: String,
    /// Registered recipient, when the receiver is a known user.
    pub recipient_id: Option<String>,
    /// Free-text recipient for people outside the user list.
    pub recipient_name: Option<String>,
    pub purpose: Option<String>,
    pub remark: Option<String>,
    #[ts(as = "String")]
    pub business_date: NaiveDate,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub spec: Option<String>,
    pub serial_no: Option<String>,
    pub photo_url: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// One row of the borrow table: either a borrow or the return mirroring it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct BorrowRecord {
    pub id: String,
    pub item_id: String,
    pub location_id: String,
    pub quantity: i64,
    pub borrower_id: String,
    pub operator_id: String,
    pub kind: BorrowKind,
    pub status: BorrowStatus,
    #[ts(as = "Option<String>")]
    pub borrow_date: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub expected_return_date: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub actual_return_date: Option<DateTime<Utc>>,
    /// On `kind = return` rows: the borrow this return closes.
    pub borrow_record_id: Option<String>,
    pub remark: Option<String>,
    pub photo_url: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl BorrowRecord {
    /// True for a borrow that can still be returned.
    pub fn is_outstanding(&self) -> bool {
        self.kind == BorrowKind::Borrow && self.status == BorrowStatus::Borrowed
    }
}

// =============================================================================
// Movement Entry
// =============================================================================

/// One audit-trail row recording a single quantity change and its cause.
///
/// Append-only: never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct MovementEntry {
    pub id: String,
    pub item_id: String,
    pub from_location_id: Option<String>,
    pub to_location_id: Option<String>,
    pub quantity: i64,
    pub operator_id: String,
    pub flow_type: FlowType,
    /// Id of the detail record that caused this movement.
    pub related_record_id: Option<String>,
    pub remark: Option<String>,
    pub serial_no: Option<String>,
    pub photo_url: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl MovementEntry {
    /// Signed effect of this movement on `Balance(self.item_id, location_id)`.
    ///
    /// ## Example
    /// ```rust
    /// # use depot_core::{MovementEntry, FlowType};
    /// # use chrono::Utc;
    /// let entry = MovementEntry {
    ///     id: "m1".into(),
    ///     item_id: "item".into(),
    ///     from_location_id: Some("A".into()),
    ///     to_location_id: Some("B".into()),
    ///     quantity: 4,
    ///     operator_id: "op".into(),
    ///     flow_type: FlowType::Transfer,
    ///     related_record_id: None,
    ///     remark: None,
    ///     serial_no: None,
    ///     photo_url: None,
    ///     created_at: Utc::now(),
    /// };
    /// assert_eq!(entry.signed_quantity_at("A"), -4);
    /// assert_eq!(entry.signed_quantity_at("B"), 4);
    /// assert_eq!(entry.signed_quantity_at("C"), 0);
    /// ```
    pub fn signed_quantity_at(&self, location_id: &str) -> i64 {
        let mut delta = 0;
        if self.to_location_id.as_deref() == Some(location_id) {
            delta += self.quantity;
        }
        if self.from_location_id.as_deref() == Some(location_id) {
            delta -= self.quantity;
        }
        delta
    }
}

// =============================================================================
// Recorder Requests
// =============================================================================

/// Input for a stock-in.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockInRequest {
    pub item: ItemRef,
    pub location: LocationRef,
    pub quantity: i64,
    pub operator_id: String,
    pub supplier: Option<String>,
    pub batch_no: Option<String>,
    pub remark: Option<String>,
    /// Defaults to today (UTC).
    #[ts(as = "Option<String>")]
    pub business_date: Option<NaiveDate>,
    #[serde(default)]
    pub device: DeviceDetails,
}

impl StockInRequest {
    pub fn new(
        item: ItemRef,
        location: LocationRef,
        quantity: i64,
        operator_id: impl Into<String>,
    ) -> Self {
        StockInRequest {
            item,
            location,
            quantity,
            operator_id: operator_id.into(),
            supplier: None,
            batch_no: None,
            remark: None,
            business_date: None,
            device: DeviceDetails::default(),
        }
    }
}

/// Input for a stock-out.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockOutRequest {
    pub item: ItemRef,
    pub location: LocationRef,
    pub quantity: i64,
    pub operator_id: String,
    pub recipient_id: Option<String>,
    pub recipient_name: Option<String>,
    pub purpose: Option<String>,
    pub remark: Option<String>,
    #[ts(as = "Option<String>")]
    pub business_date: Option<NaiveDate>,
    #[serde(default)]
    pub device: DeviceDetails,
}

impl StockOutRequest {
    pub fn new(
        item: ItemRef,
        location: LocationRef,
        quantity: i64,
        operator_id: impl Into<String>,
    ) -> Self {
        StockOutRequest {
            item,
            location,
            quantity,
            operator_id: operator_id.into(),
            recipient_id: None,
            recipient_name: None,
            purpose: None,
            remark: None,
            business_date: None,
            device: DeviceDetails::default(),
        }
    }
}

/// Input for a borrow.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BorrowRequest {
    pub item: ItemRef,
    pub location: LocationRef,
    pub quantity: i64,
    pub borrower_id: String,
    pub operator_id: String,
    #[ts(as = "Option<String>")]
    pub expected_return_date: Option<NaiveDate>,
    pub remark: Option<String>,
    pub photo_url: Option<String>,
}

impl BorrowRequest {
    pub fn new(
        item: ItemRef,
        location: LocationRef,
        quantity: i64,
        borrower_id: impl Into<String>,
        operator_id: impl Into<String>,
    ) -> Self {
        BorrowRequest {
            item,
            location,
            quantity,
            borrower_id: borrower_id.into(),
            operator_id: operator_id.into(),
            expected_return_date: None,
            remark: None,
            photo_url: None,
        }
    }
}

/// Input for returning a borrow. The whole borrowed quantity comes back.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReturnRequest {
    pub record_id: String,
    pub operator_id: String,
    pub remark: Option<String>,
    pub photo_url: Option<String>,
}

impl ReturnRequest {
    pub fn new(record_id: impl Into<String>, operator_id: impl Into<String>) -> Self {
        ReturnRequest {
            record_id: record_id.into(),
            operator_id: operator_id.into(),
            remark: None,
            photo_url: None,
        }
    }
}

// =============================================================================
// Query Filters
// =============================================================================

/// Filter for the movement log. Unset fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FlowFilter {
    pub item_id: Option<String>,
    /// Matches either side of the movement.
    pub location_id: Option<String>,
    pub flow_type: Option<FlowType>,
    /// First calendar day included (UTC).
    #[ts(as = "Option<String>")]
    pub from_date: Option<NaiveDate>,
    /// Last calendar day included (UTC).
    #[ts(as = "Option<String>")]
    pub to_date: Option<NaiveDate>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl FlowFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn item(mut self, item_id: impl Into<String>) -> Self {
        self.item_id = Some(item_id.into());
        self
    }

    pub fn location(mut self, location_id: impl Into<String>) -> Self {
        self.location_id = Some(location_id.into());
        self
    }

    pub fn flow_type(mut self, flow_type: FlowType) -> Self {
        self.flow_type = Some(flow_type);
        self
    }

    pub fn between(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.from_date = from;
        self.to_date = to;
        self
    }

    pub fn page(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }
}

/// Filter for borrow records.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BorrowFilter {
    pub borrower_id: Option<String>,
    pub item_id: Option<String>,
    pub kind: Option<BorrowKind>,
    pub status: Option<BorrowStatus>,
}

// =============================================================================
// Query Views
// =============================================================================

/// A balance joined with its item and location.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockRow {
    pub id: String,
    pub item_id: String,
    pub location_id: String,
    pub quantity: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    pub item_code: String,
    pub item_name: String,
    pub category: Option<String>,
    pub unit: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub spec: Option<String>,
    pub min_stock: i64,
    pub location_code: String,
    pub location_name: String,
    pub is_low_stock: bool,
}

impl StockRow {
    /// How far below (or at) the minimum this balance sits; 0 or less when healthy.
    pub fn shortage(&self) -> i64 {
        self.min_stock - self.quantity
    }
}

/// A movement joined with display fields of its item, locations and operator.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct FlowRow {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub entry: MovementEntry,
    pub item_code: String,
    pub item_name: String,
    pub unit: String,
    pub from_location_code: Option<String>,
    pub from_location_name: Option<String>,
    pub to_location_code: Option<String>,
    pub to_location_name: Option<String>,
    pub operator_username: Option<String>,
    pub operator_name: Option<String>,
}

/// Item / quantity totals for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CategoryStat {
    pub category: String,
    pub item_count: i64,
    pub total_quantity: i64,
}

/// In/out quantities for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TrendPoint {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub stock_in_qty: i64,
    pub stock_out_qty: i64,
}

/// Aggregates for the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DashboardSummary {
    pub total_items: i64,
    pub total_locations: i64,
    pub total_stock_quantity: i64,
    pub low_stock_count: i64,
    pub category_stats: Vec<CategoryStat>,
    /// Exactly `TREND_DAYS` entries, oldest first, ending today.
    pub in_out_trend: Vec<TrendPoint>,
}

/// A pair whose cached balance disagrees with its movement history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BalanceDiscrepancy {
    pub item_id: String,
    pub location_id: String,
    pub cached_quantity: i64,
    pub ledger_quantity: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_type_parsing() {
        assert_eq!("in".parse::<FlowType>().unwrap(), FlowType::In);
        assert_eq!("RETURN".parse::<FlowType>().unwrap(), FlowType::Return);
        assert_eq!(" transfer ".parse::<FlowType>().unwrap(), FlowType::Transfer);
        assert!("sideways".parse::<FlowType>().is_err());
    }

    #[test]
    fn test_flow_type_serde_matches_storage() {
        for flow in FlowType::ALL {
            let json = serde_json::to_string(&flow).unwrap();
            assert_eq!(json, format!("\"{}\"", flow.as_str()));
        }
    }

    #[test]
    fn test_borrow_status_is_one_way() {
        assert!(BorrowStatus::Borrowed.can_transition_to(BorrowStatus::Returned));
        assert!(BorrowStatus::Borrowed.can_transition_to(BorrowStatus::Overdue));
        assert!(!BorrowStatus::Returned.can_transition_to(BorrowStatus::Borrowed));
        assert!(!BorrowStatus::Returned.can_transition_to(BorrowStatus::Returned));
        assert!(!BorrowStatus::Overdue.can_transition_to(BorrowStatus::Borrowed));
        assert_eq!(BorrowStatus::default(), BorrowStatus::Borrowed);
    }

    #[test]
    fn test_item_ref_wire_format() {
        let by_code = ItemRef::Code("SCREW-M4".to_string());
        let json = serde_json::to_value(&by_code).unwrap();
        assert_eq!(json, serde_json::json!({"by": "code", "value": "SCREW-M4"}));

        let parsed: LocationRef =
            serde_json::from_value(serde_json::json!({"by": "id", "value": "abc"})).unwrap();
        assert_eq!(parsed, LocationRef::Id("abc".to_string()));
    }

    #[test]
    fn test_flow_filter_builder() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let filter = FlowFilter::new()
            .item("item-1")
            .flow_type(FlowType::Out)
            .between(Some(day), None)
            .page(20, 40);

        assert_eq!(filter.item_id.as_deref(), Some("item-1"));
        assert_eq!(filter.location_id, None);
        assert_eq!(filter.flow_type, Some(FlowType::Out));
        assert_eq!(filter.from_date, Some(day));
        assert_eq!(filter.limit, Some(20));
        assert_eq!(filter.offset, Some(40));
    }

    #[test]
    fn test_stock_in_request_defaults() {
        let request = StockInRequest::new(
            ItemRef::Code("BOLT".to_string()),
            LocationRef::Code("A-01".to_string()),
            4,
            "operator",
        );
        assert_eq!(request.device, DeviceDetails::default());
        assert!(request.business_date.is_none());

        // Device attributes are optional on the wire
        let parsed: StockInRequest = serde_json::from_value(serde_json::json!({
            "item": {"by": "code", "value": "BOLT"},
            "location": {"by": "code", "value": "A-01"},
            "quantity": 4,
            "operator_id": "operator",
            "supplier": null,
            "batch_no": null,
            "remark": null,
            "business_date": "2026-03-01"
        }))
        .unwrap();
        assert_eq!(parsed.business_date, NaiveDate::from_ymd_opt(2026, 3, 1));
        assert_eq!(parsed.device, DeviceDetails::default());
    }
}

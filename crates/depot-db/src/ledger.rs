//! # Stock Ledger
//!
//! The four transaction recorders. Each one composes a balance mutation, a
//! detail record and a movement-log append into a single SQLite
//! transaction.
//!
//! ## Recorder Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  request                                                                │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  validate input ─────────────────────────► Rejected(Validation)        │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  resolve item / location / user refs ────► Rejected(NotFound)          │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  pre-flight balance check (out, borrow) ─► Rejected(InsufficientStock) │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  BEGIN ─────────────────────────────────────────────────────────────┐  │
//! │  │ first statement is a write → write lock held from here on        │  │
//! │  │                                                                   │  │
//! │  │  in:     insert record → increment → append {to, in}             │  │
//! │  │  out:    guarded decrement → insert record → append {from, out}  │  │
//! │  │  borrow: guarded decrement → insert record → append {from, ...}  │  │
//! │  │  return: status flip → insert return row → increment → append    │  │
//! │  │                                                                   │  │
//! │  │  any error: transaction dropped → ROLLBACK                        │  │
//! │  └─ COMMIT ──────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The pre-flight check gives a fast answer; the guarded decrement inside
//! the transaction is what actually enforces the floor when two callers
//! race for the same stock.

use std::fmt::Display;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::repository::balance::{BalanceRepository, Decrement, Increment};
use crate::repository::catalog::CatalogRepository;
use crate::repository::movement::MovementRepository;
use crate::repository::records::RecordRepository;
use depot_core::validation::{validate_optional_text, validate_quantity, validate_reference};
use depot_core::{
    BorrowKind, BorrowRecord, BorrowRequest, BorrowStatus, CoreError, DeviceDetails, FlowType,
    Item, Location, MovementEntry, ReturnRequest, StockInRecord, StockInRequest, StockOutRecord,
    StockOutRequest, ValidationError,
};

/// Entry point for every write that moves stock.
///
/// ## Usage
/// ```rust,ignore
/// let ledger = db.ledger();
///
/// let receipt = ledger
///     .stock_in(StockInRequest::new(
///         ItemRef::Code("SCREW-M4".into()),
///         LocationRef::Code("A-01".into()),
///         100,
///         operator_id,
///     ))
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct StockLedger {
    pool: SqlitePool,
    catalog: CatalogRepository,
    balances: BalanceRepository,
    records: RecordRepository,
}

impl StockLedger {
    /// Creates a ledger over the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        StockLedger {
            catalog: CatalogRepository::new(pool.clone()),
            balances: BalanceRepository::new(pool.clone()),
            records: RecordRepository::new(pool.clone()),
            pool,
        }
    }

    // =========================================================================
    // Stock-in
    // =========================================================================

    /// Records items arriving at a location.
    ///
    /// ## Returns
    /// * `Ok(StockInRecord)` - committed record; its `id` is the receipt id
    /// * `Err(Rejected(Validation | NotFound))`
    /// * `Err(Store(_))` - nothing was applied
    pub async fn stock_in(&self, request: StockInRequest) -> LedgerResult<StockInRecord> {
        let result = self.record_stock_in(&request).await;
        report(
            "stock_in",
            format_args!("{} at {}", request.item, request.location),
            request.quantity,
            result,
        )
    }

    async fn record_stock_in(&self, request: &StockInRequest) -> LedgerResult<StockInRecord> {
        validate_quantity(request.quantity)?;
        validate_reference("operator_id", &request.operator_id)?;
        validate_optional_text("supplier", request.supplier.as_deref())?;
        validate_optional_text("batch_no", request.batch_no.as_deref())?;
        validate_optional_text("remark", request.remark.as_deref())?;
        validate_device(&request.device)?;

        let item = self.catalog.resolve_item(&request.item).await?;
        let location = self.catalog.resolve_location(&request.location).await?;

        let now = Utc::now();
        let device = &request.device;
        let record = StockInRecord {
            id: new_id(),
            item_id: item.id.clone(),
            location_id: location.id.clone(),
            quantity: request.quantity,
            operator_id: request.operator_id.clone(),
            supplier: request.supplier.clone(),
            batch_no: request.batch_no.clone(),
            remark: request.remark.clone(),
            business_date: request.business_date.unwrap_or_else(|| now.date_naive()),
            brand: device.brand.clone(),
            model: device.model.clone(),
            spec: device.spec.clone(),
            serial_no: device.serial_no.clone(),
            photo_url: device.photo_url.clone(),
            created_at: now,
        };
        let movement = MovementEntry {
            serial_no: device.serial_no.clone(),
            photo_url: device.photo_url.clone(),
            ..movement(&item, None, Some(&location), &record.id, request, FlowType::In, now)
        };

        let mut tx = self.pool.begin().await?;
        RecordRepository::insert_stock_in(&mut tx, &record).await?;
        guarded_increment(&mut tx, &item.id, &location.id, record.quantity).await?;
        MovementRepository::append(&mut tx, &movement).await?;
        tx.commit().await?;

        info!(
            record_id = %record.id,
            item = %item.code,
            location = %location.code,
            quantity = record.quantity,
            "Stock in recorded"
        );
        Ok(record)
    }

    // =========================================================================
    // Stock-out
    // =========================================================================

    /// Records items leaving a location.
    ///
    /// ## Returns
    /// * `Err(Rejected(InsufficientStock))` - balance below `quantity`;
    ///   the balance is unchanged
    pub async fn stock_out(&self, request: StockOutRequest) -> LedgerResult<StockOutRecord> {
        let result = self.record_stock_out(&request).await;
        report(
            "stock_out",
            format_args!("{} at {}", request.item, request.location),
            request.quantity,
            result,
        )
    }

    async fn record_stock_out(&self, request: &StockOutRequest) -> LedgerResult<StockOutRecord> {
        validate_quantity(request.quantity)?;
        validate_reference("operator_id", &request.operator_id)?;
        validate_optional_text("recipient_name", request.recipient_name.as_deref())?;
        validate_optional_text("purpose", request.purpose.as_deref())?;
        validate_optional_text("remark", request.remark.as_deref())?;
        validate_device(&request.device)?;

        let item = self.catalog.resolve_item(&request.item).await?;
        let location = self.catalog.resolve_location(&request.location).await?;
        if let Some(recipient_id) = &request.recipient_id {
            self.require_user(recipient_id).await?;
        }
        self.check_available(&item, &location, request.quantity).await?;

        let now = Utc::now();
        let device = &request.device;
        let record = StockOutRecord {
            id: new_id(),
            item_id: item.id.clone(),
            location_id: location.id.clone(),
            quantity: request.quantity,
            operator_id: request.operator_id.clone(),
            recipient_id: request.recipient_id.clone(),
            recipient_name: request.recipient_name.clone(),
            purpose: request.purpose.clone(),
            remark: request.remark.clone(),
            business_date: request.business_date.unwrap_or_else(|| now.date_naive()),
            brand: device.brand.clone(),
            model: device.model.clone(),
            spec: device.spec.clone(),
            serial_no: device.serial_no.clone(),
            photo_url: device.photo_url.clone(),
            created_at: now,
        };
        let movement = MovementEntry {
            serial_no: device.serial_no.clone(),
            photo_url: device.photo_url.clone(),
            ..movement(&item, Some(&location), None, &record.id, request, FlowType::Out, now)
        };

        let mut tx = self.pool.begin().await?;
        guarded_decrement(&mut tx, &item, &location, record.quantity).await?;
        RecordRepository::insert_stock_out(&mut tx, &record).await?;
        MovementRepository::append(&mut tx, &movement).await?;
        tx.commit().await?;

        info!(
            record_id = %record.id,
            item = %item.code,
            location = %location.code,
            quantity = record.quantity,
            "Stock out recorded"
        );
        Ok(record)
    }

    // =========================================================================
    // Borrow
    // =========================================================================

    /// Lends items from a location to a registered user.
    pub async fn borrow(&self, request: BorrowRequest) -> LedgerResult<BorrowRecord> {
        let result = self.record_borrow(&request).await;
        report(
            "borrow",
            format_args!("{} at {}", request.item, request.location),
            request.quantity,
            result,
        )
    }

    async fn record_borrow(&self, request: &BorrowRequest) -> LedgerResult<BorrowRecord> {
        validate_quantity(request.quantity)?;
        validate_reference("operator_id", &request.operator_id)?;
        validate_reference("borrower_id", &request.borrower_id)?;
        validate_optional_text("remark", request.remark.as_deref())?;
        validate_optional_text("photo_url", request.photo_url.as_deref())?;

        let item = self.catalog.resolve_item(&request.item).await?;
        let location = self.catalog.resolve_location(&request.location).await?;
        self.require_user(&request.borrower_id).await?;
        self.check_available(&item, &location, request.quantity).await?;

        let now = Utc::now();
        let record = BorrowRecord {
            id: new_id(),
            item_id: item.id.clone(),
            location_id: location.id.clone(),
            quantity: request.quantity,
            borrower_id: request.borrower_id.clone(),
            operator_id: request.operator_id.clone(),
            kind: BorrowKind::Borrow,
            status: BorrowStatus::Borrowed,
            borrow_date: Some(now),
            expected_return_date: request.expected_return_date,
            actual_return_date: None,
            borrow_record_id: None,
            remark: request.remark.clone(),
            photo_url: request.photo_url.clone(),
            created_at: now,
        };
        let movement = MovementEntry {
            photo_url: request.photo_url.clone(),
            ..movement(&item, Some(&location), None, &record.id, request, FlowType::Borrow, now)
        };

        let mut tx = self.pool.begin().await?;
        guarded_decrement(&mut tx, &item, &location, record.quantity).await?;
        RecordRepository::insert_borrow(&mut tx, &record).await?;
        MovementRepository::append(&mut tx, &movement).await?;
        tx.commit().await?;

        info!(
            record_id = %record.id,
            item = %item.code,
            location = %location.code,
            borrower_id = %record.borrower_id,
            quantity = record.quantity,
            "Borrow recorded"
        );
        Ok(record)
    }

    // =========================================================================
    // Return
    // =========================================================================

    /// Returns an outstanding borrow in full.
    ///
    /// ## Returns
    /// * `Ok(BorrowRecord)` - the new `kind = return` row
    /// * `Err(Rejected(NotFound))` - no borrow record with that id
    /// * `Err(Rejected(AlreadyReturned))` - the borrow is no longer
    ///   `borrowed`, including when a concurrent return won the race
    pub async fn return_borrowed(&self, request: ReturnRequest) -> LedgerResult<BorrowRecord> {
        let result = self.record_return(&request).await;
        report(
            "return",
            format_args!("borrow record {}", request.record_id),
            0,
            result,
        )
    }

    async fn record_return(&self, request: &ReturnRequest) -> LedgerResult<BorrowRecord> {
        validate_reference("record_id", &request.record_id)?;
        validate_reference("operator_id", &request.operator_id)?;
        validate_optional_text("remark", request.remark.as_deref())?;
        validate_optional_text("photo_url", request.photo_url.as_deref())?;

        let original = self
            .records
            .get_borrow_record(&request.record_id)
            .await?
            .filter(|r| r.kind == BorrowKind::Borrow)
            .ok_or_else(|| CoreError::not_found("Borrow record", request.record_id.clone()))?;
        if !original.is_outstanding() {
            return Err(already_returned(&original.id));
        }

        let now = Utc::now();
        let record = BorrowRecord {
            id: new_id(),
            item_id: original.item_id.clone(),
            location_id: original.location_id.clone(),
            quantity: original.quantity,
            borrower_id: original.borrower_id.clone(),
            operator_id: request.operator_id.clone(),
            kind: BorrowKind::Return,
            status: BorrowStatus::Returned,
            borrow_date: original.borrow_date,
            expected_return_date: original.expected_return_date,
            actual_return_date: Some(now),
            borrow_record_id: Some(original.id.clone()),
            remark: request.remark.clone(),
            photo_url: request.photo_url.clone(),
            created_at: now,
        };
        let movement = MovementEntry {
            id: new_id(),
            item_id: original.item_id.clone(),
            from_location_id: None,
            to_location_id: Some(original.location_id.clone()),
            quantity: original.quantity,
            operator_id: request.operator_id.clone(),
            flow_type: FlowType::Return,
            related_record_id: Some(record.id.clone()),
            remark: request.remark.clone(),
            serial_no: None,
            photo_url: request.photo_url.clone(),
            created_at: now,
        };

        let mut tx = self.pool.begin().await?;
        if !RecordRepository::mark_returned(&mut tx, &original.id, now).await? {
            // Lost the race to another return; dropping tx rolls back
            return Err(already_returned(&original.id));
        }
        RecordRepository::insert_borrow(&mut tx, &record).await?;
        guarded_increment(&mut tx, &record.item_id, &record.location_id, record.quantity).await?;
        MovementRepository::append(&mut tx, &movement).await?;
        tx.commit().await?;

        info!(
            record_id = %record.id,
            borrow_record_id = %original.id,
            quantity = record.quantity,
            "Return recorded"
        );
        Ok(record)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn require_user(&self, user_id: &str) -> LedgerResult<()> {
        match self.catalog.get_user(user_id).await? {
            Some(_) => Ok(()),
            None => Err(CoreError::not_found("User", user_id).into()),
        }
    }

    /// Fast rejection before any write; not a guarantee.
    async fn check_available(
        &self,
        item: &Item,
        location: &Location,
        requested: i64,
    ) -> LedgerResult<()> {
        let available = self
            .balances
            .get_balance(&item.id, &location.id)
            .await?
            .unwrap_or(0);

        if available < requested {
            return Err(insufficient(item, location, available, requested));
        }
        Ok(())
    }
}

// =============================================================================
// Free helpers
// =============================================================================

/// Request fields shared by every recorder's movement entry.
trait MovementSource {
    fn operator_id(&self) -> &str;
    fn quantity(&self) -> i64;
    fn remark(&self) -> Option<&str>;
}

impl MovementSource for StockInRequest {
    fn operator_id(&self) -> &str {
        &self.operator_id
    }
    fn quantity(&self) -> i64 {
        self.quantity
    }
    fn remark(&self) -> Option<&str> {
        self.remark.as_deref()
    }
}

impl MovementSource for StockOutRequest {
    fn operator_id(&self) -> &str {
        &self.operator_id
    }
    fn quantity(&self) -> i64 {
        self.quantity
    }
    fn remark(&self) -> Option<&str> {
        self.remark.as_deref()
    }
}

impl MovementSource for BorrowRequest {
    fn operator_id(&self) -> &str {
        &self.operator_id
    }
    fn quantity(&self) -> i64 {
        self.quantity
    }
    fn remark(&self) -> Option<&str> {
        self.remark.as_deref()
    }
}

fn movement(
    item: &Item,
    from: Option<&Location>,
    to: Option<&Location>,
    record_id: &str,
    source: &impl MovementSource,
    flow_type: FlowType,
    at: DateTime<Utc>,
) -> MovementEntry {
    MovementEntry {
        id: new_id(),
        item_id: item.id.clone(),
        from_location_id: from.map(|l| l.id.clone()),
        to_location_id: to.map(|l| l.id.clone()),
        quantity: source.quantity(),
        operator_id: source.operator_id().to_string(),
        flow_type,
        related_record_id: Some(record_id.to_string()),
        remark: source.remark().map(str::to_string),
        serial_no: None,
        photo_url: None,
        created_at: at,
    }
}

async fn guarded_decrement(
    conn: &mut sqlx::SqliteConnection,
    item: &Item,
    location: &Location,
    qty: i64,
) -> LedgerResult<()> {
    match BalanceRepository::decrement(conn, &item.id, &location.id, qty).await? {
        Decrement::Applied => Ok(()),
        Decrement::Insufficient { available } => {
            Err(insufficient(item, location, available, qty))
        }
    }
}

async fn guarded_increment(
    conn: &mut sqlx::SqliteConnection,
    item_id: &str,
    location_id: &str,
    qty: i64,
) -> LedgerResult<()> {
    match BalanceRepository::increment(conn, item_id, location_id, qty).await? {
        Increment::Applied => Ok(()),
        Increment::Overflow { current } => {
            warn!(item_id, location_id, current, qty, "Balance would overflow");
            Err(ValidationError::OutOfRange {
                field: "balance".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into())
        }
    }
}

fn insufficient(item: &Item, location: &Location, available: i64, requested: i64) -> LedgerError {
    CoreError::InsufficientStock {
        item_id: item.id.clone(),
        location_id: location.id.clone(),
        available,
        requested,
    }
    .into()
}

fn already_returned(record_id: &str) -> LedgerError {
    CoreError::AlreadyReturned {
        record_id: record_id.to_string(),
    }
    .into()
}

fn validate_device(device: &DeviceDetails) -> LedgerResult<()> {
    validate_optional_text("brand", device.brand.as_deref())?;
    validate_optional_text("model", device.model.as_deref())?;
    validate_optional_text("spec", device.spec.as_deref())?;
    validate_optional_text("serial_no", device.serial_no.as_deref())?;
    validate_optional_text("photo_url", device.photo_url.as_deref())?;
    Ok(())
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Logs the outcome of a recorder. Store failures are logged at `error`
/// with the request context; they are never retried here.
fn report<T>(
    operation: &'static str,
    subject: impl Display,
    quantity: i64,
    result: LedgerResult<T>,
) -> LedgerResult<T> {
    match &result {
        Err(LedgerError::Store(err)) => {
            error!(operation, subject = %subject, quantity, error = %err, "Ledger store failure");
        }
        Err(LedgerError::Rejected(reason)) => {
            warn!(operation, subject = %subject, quantity, reason = %reason, "Ledger request rejected");
        }
        Ok(_) => {}
    }
    result
}

// =============================================================================
// Unit Tests
// =============================================================================

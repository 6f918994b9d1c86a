//! # Record Repository
//!
//! Detail records written by the ledger: stock-in, stock-out and the
//! borrow table (borrow and return rows).
//!
//! Inserts take a `&mut SqliteConnection` and are only called from inside
//! a ledger transaction. Records are immutable once written; the single
//! exception is the one-way `borrowed → returned` status flip.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::error::DbResult;
use depot_core::{BorrowFilter, BorrowKind, BorrowRecord, BorrowStatus, StockInRecord, StockOutRecord};

const STOCK_IN_COLUMNS: &str = "id, item_id, location_id, quantity, operator_id, supplier, \
                                batch_no, remark, business_date, brand, model, spec, serial_no, \
                                photo_url, created_at";

const STOCK_OUT_COLUMNS: &str = "id, item_id, location_id, quantity, operator_id, recipient_id, \
                                 recipient_name, purpose, remark, business_date, brand, model, \
                                 spec, serial_no, photo_url, created_at";

const BORROW_COLUMNS: &str = "id, item_id, location_id, quantity, borrower_id, operator_id, \
                              kind, status, borrow_date, expected_return_date, \
                              actual_return_date, borrow_record_id, remark, photo_url, created_at";

/// Repository for detail records.
#[derive(Debug, Clone)]
pub struct RecordRepository {
    pool: SqlitePool,
}

impl RecordRepository {
    /// Creates a new RecordRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RecordRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Stock-in
    // -------------------------------------------------------------------------

    pub async fn insert_stock_in(conn: &mut SqliteConnection, record: &StockInRecord) -> DbResult<()> {
        sqlx::query(&format!(
            "INSERT INTO stock_in ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            STOCK_IN_COLUMNS
        ))
        .bind(&record.id)
        .bind(&record.item_id)
        .bind(&record.location_id)
        .bind(record.quantity)
        .bind(&record.operator_id)
        .bind(&record.supplier)
        .bind(&record.batch_no)
        .bind(&record.remark)
        .bind(record.business_date)
        .bind(&record.brand)
        .bind(&record.model)
        .bind(&record.spec)
        .bind(&record.serial_no)
        .bind(&record.photo_url)
        .bind(record.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn get_stock_in(&self, id: &str) -> DbResult<Option<StockInRecord>> {
        let record = sqlx::query_as::<_, StockInRecord>(&format!(
            "SELECT {} FROM stock_in WHERE id = ?",
            STOCK_IN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    // -------------------------------------------------------------------------
    // Stock-out
    // -------------------------------------------------------------------------

    pub async fn insert_stock_out(
        conn: &mut SqliteConnection,
        record: &StockOutRecord,
    ) -> DbResult<()> {
        sqlx::query(&format!(
            "INSERT INTO stock_out ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            STOCK_OUT_COLUMNS
        ))
        .bind(&record.id)
        .bind(&record.item_id)
        .bind(&record.location_id)
        .bind(record.quantity)
        .bind(&record.operator_id)
        .bind(&record.recipient_id)
        .bind(&record.recipient_name)
        .bind(&record.purpose)
        .bind(&record.remark)
        .bind(record.business_date)
        .bind(&record.brand)
        .bind(&record.model)
        .bind(&record.spec)
        .bind(&record.serial_no)
        .bind(&record.photo_url)
        .bind(record.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn get_stock_out(&self, id: &str) -> DbResult<Option<StockOutRecord>> {
        let record = sqlx::query_as::<_, StockOutRecord>(&format!(
            "SELECT {} FROM stock_out WHERE id = ?",
            STOCK_OUT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    // -------------------------------------------------------------------------
    // Borrow / Return
    // -------------------------------------------------------------------------

    pub async fn insert_borrow(conn: &mut SqliteConnection, record: &BorrowRecord) -> DbResult<()> {
        sqlx::query(&format!(
            "INSERT INTO borrow_records ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            BORROW_COLUMNS
        ))
        .bind(&record.id)
        .bind(&record.item_id)
        .bind(&record.location_id)
        .bind(record.quantity)
        .bind(&record.borrower_id)
        .bind(&record.operator_id)
        .bind(record.kind)
        .bind(record.status)
        .bind(record.borrow_date)
        .bind(record.expected_return_date)
        .bind(record.actual_return_date)
        .bind(&record.borrow_record_id)
        .bind(&record.remark)
        .bind(&record.photo_url)
        .bind(record.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Flips an outstanding borrow to `returned`.
    ///
    /// ## Returns
    /// * `Ok(true)` - this call closed the borrow
    /// * `Ok(false)` - no outstanding borrow with that id (missing, not a
    ///   borrow row, or already returned)
    ///
    /// The `WHERE status = 'borrowed'` guard makes this the arbiter between
    /// two concurrent returns of the same record: exactly one sees `true`.
    pub async fn mark_returned(
        conn: &mut SqliteConnection,
        borrow_id: &str,
        returned_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE borrow_records SET status = ?, actual_return_date = ? \
             WHERE id = ? AND kind = ? AND status = ?",
        )
        .bind(BorrowStatus::Returned)
        .bind(returned_at)
        .bind(borrow_id)
        .bind(BorrowKind::Borrow)
        .bind(BorrowStatus::Borrowed)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn get_borrow_record(&self, id: &str) -> DbResult<Option<BorrowRecord>> {
        let record = sqlx::query_as::<_, BorrowRecord>(&format!(
            "SELECT {} FROM borrow_records WHERE id = ?",
            BORROW_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Borrow-table rows matching `filter`, newest first.
    pub async fn list_borrow_records(&self, filter: &BorrowFilter) -> DbResult<Vec<BorrowRecord>> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM borrow_records WHERE 1 = 1",
            BORROW_COLUMNS
        ));

        if let Some(borrower_id) = &filter.borrower_id {
            builder.push(" AND borrower_id = ").push_bind(borrower_id.clone());
        }
        if let Some(item_id) = &filter.item_id {
            builder.push(" AND item_id = ").push_bind(item_id.clone());
        }
        if let Some(kind) = filter.kind {
            builder.push(" AND kind = ").push_bind(kind);
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status);
        }
        builder.push(" ORDER BY created_at DESC, rowid DESC");

        let records = builder
            .build_query_as::<BorrowRecord>()
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    /// The return row that closed `borrow_id`, if any.
    pub async fn find_return_for(&self, borrow_id: &str) -> DbResult<Option<BorrowRecord>> {
        let record = sqlx::query_as::<_, BorrowRecord>(&format!(
            "SELECT {} FROM borrow_records WHERE borrow_record_id = ? AND kind = ?",
            BORROW_COLUMNS
        ))
        .bind(borrow_id)
        .bind(BorrowKind::Return)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}

//! # Query Repository
//!
//! Read-only projections over balances, the movement log and the detail
//! records. Nothing here writes.
//!
//! ## Views
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  list_stock()        balance ⋈ item ⋈ location, low-stock rows first    │
//! │  list_low_stock()    quantity <= min_stock, largest shortage first      │
//! │  list_flow(filter)   movement ⋈ item ⋈ locations ⋈ operator             │
//! │  dashboard_summary() totals, per-category stats, 30-day in/out trend    │
//! │  audit_balances()    cached balance vs signed movement sum              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbResult, LedgerResult};
use crate::repository::movement::{push_flow_filter, push_page, MovementRepository};
use depot_core::trend::{build_trend, window_start};
use depot_core::validation::validate_date_range;
use depot_core::{
    BalanceDiscrepancy, CategoryStat, DashboardSummary, FlowFilter, FlowRow, StockRow,
    UNCATEGORIZED,
};

const STOCK_SELECT: &str = r#"
    SELECT
        s.id,
        s.item_id,
        s.location_id,
        s.quantity,
        s.updated_at,
        i.code AS item_code,
        i.name AS item_name,
        i.category,
        i.unit,
        i.brand,
        i.model,
        i.spec,
        i.min_stock,
        l.code AS location_code,
        l.name AS location_name
    FROM stock_balances s
    JOIN items i ON i.id = s.item_id
    JOIN locations l ON l.id = s.location_id
"#;

/// Row for the stock views; `is_low_stock` is derived afterwards.
#[derive(Debug, sqlx::FromRow)]
struct StockRecord {
    id: String,
    item_id: String,
    location_id: String,
    quantity: i64,
    updated_at: DateTime<Utc>,
    item_code: String,
    item_name: String,
    category: Option<String>,
    unit: String,
    brand: Option<String>,
    model: Option<String>,
    spec: Option<String>,
    min_stock: i64,
    location_code: String,
    location_name: String,
}

impl From<StockRecord> for StockRow {
    fn from(r: StockRecord) -> Self {
        StockRow {
            is_low_stock: r.quantity <= r.min_stock,
            id: r.id,
            item_id: r.item_id,
            location_id: r.location_id,
            quantity: r.quantity,
            updated_at: r.updated_at,
            item_code: r.item_code,
            item_name: r.item_name,
            category: r.category,
            unit: r.unit,
            brand: r.brand,
            model: r.model,
            spec: r.spec,
            min_stock: r.min_stock,
            location_code: r.location_code,
            location_name: r.location_name,
        }
    }
}

/// Repository for read-side projections.
#[derive(Debug, Clone)]
pub struct QueryRepository {
    pool: SqlitePool,
}

impl QueryRepository {
    /// Creates a new QueryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        QueryRepository { pool }
    }

    /// Every balance with its item and location; low-stock rows first,
    /// then most recently updated.
    pub async fn list_stock(&self) -> DbResult<Vec<StockRow>> {
        let rows = sqlx::query_as::<_, StockRecord>(&format!(
            "{} ORDER BY (s.quantity <= i.min_stock) DESC, s.updated_at DESC, s.rowid DESC",
            STOCK_SELECT
        ))
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Listed stock");
        Ok(rows.into_iter().map(StockRow::from).collect())
    }

    /// Only balances at or below their item's minimum, largest shortage first.
    pub async fn list_low_stock(&self) -> DbResult<Vec<StockRow>> {
        let rows = sqlx::query_as::<_, StockRecord>(&format!(
            "{} WHERE s.quantity <= i.min_stock \
             ORDER BY (i.min_stock - s.quantity) DESC, i.code, l.code",
            STOCK_SELECT
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(StockRow::from).collect())
    }

    /// The movement log with display fields, most recent first.
    ///
    /// ## Returns
    /// * `Err(Rejected(Validation))` - `from_date` is after `to_date`
    pub async fn list_flow(&self, filter: &FlowFilter) -> LedgerResult<Vec<FlowRow>> {
        validate_date_range(filter.from_date, filter.to_date)?;

        let mut builder = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT
                m.id,
                m.item_id,
                m.from_location_id,
                m.to_location_id,
                m.quantity,
                m.operator_id,
                m.flow_type,
                m.related_record_id,
                m.remark,
                m.serial_no,
                m.photo_url,
                m.created_at,
                i.code AS item_code,
                i.name AS item_name,
                i.unit,
                fl.code AS from_location_code,
                fl.name AS from_location_name,
                tl.code AS to_location_code,
                tl.name AS to_location_name,
                u.username AS operator_username,
                u.name AS operator_name
            FROM stock_movements m
            JOIN items i ON i.id = m.item_id
            LEFT JOIN locations fl ON fl.id = m.from_location_id
            LEFT JOIN locations tl ON tl.id = m.to_location_id
            LEFT JOIN users u ON u.id = m.operator_id
            WHERE 1 = 1
            "#,
        );
        push_flow_filter(&mut builder, filter, "m.");
        builder.push(" ORDER BY m.created_at DESC, m.rowid DESC");
        push_page(&mut builder, filter);

        let rows = builder
            .build_query_as::<FlowRow>()
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Listed flow");
        Ok(rows)
    }

    /// Dashboard aggregates with the trend ending today (UTC).
    pub async fn dashboard_summary(&self) -> DbResult<DashboardSummary> {
        self.dashboard_summary_on(Utc::now().date_naive()).await
    }

    /// Dashboard aggregates with the trend ending on `today`.
    ///
    /// ## Low-stock count
    /// Counted per item: an item is low when the sum of its balances over
    /// all locations (0 if it has none) is at or below `min_stock`.
    pub async fn dashboard_summary_on(&self, today: NaiveDate) -> DbResult<DashboardSummary> {
        let total_items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items")
            .fetch_one(&self.pool)
            .await?;

        let total_locations: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM locations")
            .fetch_one(&self.pool)
            .await?;

        let total_stock_quantity: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(quantity), 0) FROM stock_balances")
                .fetch_one(&self.pool)
                .await?;

        let low_stock_count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM (
                SELECT i.id
                FROM items i
                LEFT JOIN stock_balances s ON s.item_id = i.id
                GROUP BY i.id, i.min_stock
                HAVING COALESCE(SUM(s.quantity), 0) <= i.min_stock
            )
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let category_stats = sqlx::query_as::<_, CategoryStat>(
            r#"
            SELECT
                COALESCE(c.name, i.category, ?) AS category,
                COUNT(DISTINCT i.id) AS item_count,
                COALESCE(SUM(s.quantity), 0) AS total_quantity
            FROM items i
            LEFT JOIN categories c ON c.id = i.category_id
            LEFT JOIN stock_balances s ON s.item_id = i.id
            GROUP BY 1
            ORDER BY total_quantity DESC, category
            "#,
        )
        .bind(UNCATEGORIZED)
        .fetch_all(&self.pool)
        .await?;

        let since = window_start(today).to_string();
        let stock_in = self.daily_quantities("stock_in", &since).await?;
        let stock_out = self.daily_quantities("stock_out", &since).await?;
        let in_out_trend = build_trend(today, &stock_in, &stock_out);

        Ok(DashboardSummary {
            total_items,
            total_locations,
            total_stock_quantity,
            low_stock_count,
            category_stats,
            in_out_trend,
        })
    }

    /// `(creation day, quantity)` for every record of `table` created on or after `since`.
    async fn daily_quantities(&self, table: &str, since: &str) -> DbResult<Vec<(NaiveDate, i64)>> {
        let rows: Vec<(DateTime<Utc>, i64)> = sqlx::query_as(&format!(
            "SELECT created_at, quantity FROM {} WHERE created_at >= ?",
            table
        ))
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(created_at, qty)| (created_at.date_naive(), qty))
            .collect())
    }

    /// Pairs whose cached balance differs from the movement-log signed sum.
    ///
    /// Empty when the store is consistent.
    pub async fn audit_balances(&self) -> DbResult<Vec<BalanceDiscrepancy>> {
        let cached: Vec<(String, String, i64)> = sqlx::query_as(
            "SELECT item_id, location_id, quantity FROM stock_balances",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut pairs: BTreeMap<(String, String), (i64, i64)> = cached
            .into_iter()
            .map(|(item, location, qty)| ((item, location), (qty, 0)))
            .collect();

        let totals = MovementRepository::new(self.pool.clone())
            .signed_totals()
            .await?;
        for total in totals {
            pairs
                .entry((total.item_id, total.location_id))
                .or_insert((0, 0))
                .1 = total.quantity;
        }

        let discrepancies: Vec<BalanceDiscrepancy> = pairs
            .into_iter()
            .filter(|(_, (cached, ledger))| cached != ledger)
            .map(|((item_id, location_id), (cached, ledger))| BalanceDiscrepancy {
                item_id,
                location_id,
                cached_quantity: cached,
                ledger_quantity: ledger,
            })
            .collect();

        if !discrepancies.is_empty() {
            warn!(count = discrepancies.len(), "Balance audit found discrepancies");
        }
        Ok(discrepancies)
    }
}

//! # Movement Repository
//!
//! The append-only audit trail. Rows are inserted by the ledger inside its
//! atomic units and never updated or deleted.
//!
//! ## Filtering
//! ```text
//! FlowFilter                      SQL
//! ─────────────────────────────   ─────────────────────────────────────────
//! item_id       = X               item_id = X
//! location_id   = L               (from_location_id = L OR to_location_id = L)
//! flow_type     = out             flow_type = 'out'
//! from_date     = 2026-03-01      created_at >= '2026-03-01'
//! to_date       = 2026-03-31      created_at <  '2026-04-01'
//! limit/offset                    LIMIT n OFFSET m
//!
//! ORDER BY created_at DESC, rowid DESC   (most recent first)
//! ```
//! `created_at` is RFC 3339 UTC text, so a bare `YYYY-MM-DD` compares as the
//! first instant of that day.

use chrono::Days;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use depot_core::{FlowFilter, MovementEntry};

const MOVEMENT_COLUMNS: &str = "id, item_id, from_location_id, to_location_id, quantity, \
                                operator_id, flow_type, related_record_id, remark, serial_no, \
                                photo_url, created_at";

/// Signed movement total for one (item, location) pair.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PairTotal {
    pub item_id: String,
    pub location_id: String,
    pub quantity: i64,
}

/// Repository for the movement log.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    /// Creates a new MovementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// Appends one entry on the caller's transaction.
    pub async fn append(conn: &mut SqliteConnection, entry: &MovementEntry) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_movements (
                id, item_id, from_location_id, to_location_id, quantity, operator_id,
                flow_type, related_record_id, remark, serial_no, photo_url, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.item_id)
        .bind(&entry.from_location_id)
        .bind(&entry.to_location_id)
        .bind(entry.quantity)
        .bind(&entry.operator_id)
        .bind(entry.flow_type)
        .bind(&entry.related_record_id)
        .bind(&entry.remark)
        .bind(&entry.serial_no)
        .bind(&entry.photo_url)
        .bind(entry.created_at)
        .execute(&mut *conn)
        .await?;

        debug!(
            id = %entry.id,
            flow_type = %entry.flow_type,
            quantity = entry.quantity,
            "Movement appended"
        );
        Ok(())
    }

    /// Movements matching `filter`, most recent first.
    pub async fn query(&self, filter: &FlowFilter) -> DbResult<Vec<MovementEntry>> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM stock_movements WHERE 1 = 1",
            MOVEMENT_COLUMNS
        ));
        push_flow_filter(&mut builder, filter, "");
        builder.push(" ORDER BY created_at DESC, rowid DESC");
        push_page(&mut builder, filter);

        let entries = builder
            .build_query_as::<MovementEntry>()
            .fetch_all(&self.pool)
            .await?;

        debug!(count = entries.len(), "Movement query returned entries");
        Ok(entries)
    }

    /// Movements caused by one detail record, oldest first.
    pub async fn list_for_record(&self, related_record_id: &str) -> DbResult<Vec<MovementEntry>> {
        let entries = sqlx::query_as::<_, MovementEntry>(&format!(
            "SELECT {} FROM stock_movements WHERE related_record_id = ? \
             ORDER BY created_at, rowid",
            MOVEMENT_COLUMNS
        ))
        .bind(related_record_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Signed sum of movements per (item, location): `+qty` on the
    /// destination side, `-qty` on the source side.
    pub async fn signed_totals(&self) -> DbResult<Vec<PairTotal>> {
        let totals = sqlx::query_as::<_, PairTotal>(
            r#"
            SELECT item_id, location_id, SUM(delta) AS quantity
            FROM (
                SELECT item_id, to_location_id AS location_id, quantity AS delta
                FROM stock_movements
                WHERE to_location_id IS NOT NULL
                UNION ALL
                SELECT item_id, from_location_id AS location_id, -quantity AS delta
                FROM stock_movements
                WHERE from_location_id IS NOT NULL
            )
            GROUP BY item_id, location_id
            ORDER BY item_id, location_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(totals)
    }

    /// Total number of movements.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock_movements")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Appends the `WHERE` conditions of `filter`. `prefix` qualifies the
/// movement columns when the query joins other tables (e.g. `"m."`).
pub(crate) fn push_flow_filter(
    builder: &mut QueryBuilder<'static, Sqlite>,
    filter: &FlowFilter,
    prefix: &str,
) {
    if let Some(item_id) = &filter.item_id {
        builder
            .push(format!(" AND {}item_id = ", prefix))
            .push_bind(item_id.clone());
    }

    if let Some(location_id) = &filter.location_id {
        builder
            .push(format!(" AND ({}from_location_id = ", prefix))
            .push_bind(location_id.clone())
            .push(format!(" OR {}to_location_id = ", prefix))
            .push_bind(location_id.clone())
            .push(")");
    }

    if let Some(flow_type) = filter.flow_type {
        builder
            .push(format!(" AND {}flow_type = ", prefix))
            .push_bind(flow_type.as_str());
    }

    if let Some(from) = filter.from_date {
        builder
            .push(format!(" AND {}created_at >= ", prefix))
            .push_bind(from.to_string());
    }

    // No upper bound when to_date is NaiveDate::MAX
    if let Some(next_day) = filter
        .to_date
        .and_then(|to| to.checked_add_days(Days::new(1)))
    {
        builder
            .push(format!(" AND {}created_at < ", prefix))
            .push_bind(next_day.to_string());
    }
}

/// Appends `LIMIT` / `OFFSET`. SQLite needs a LIMIT before OFFSET, and
/// `LIMIT -1` means unbounded.
pub(crate) fn push_page(builder: &mut QueryBuilder<'static, Sqlite>, filter: &FlowFilter) {
    match (filter.limit, filter.offset) {
        (None, None) => {}
        (limit, offset) => {
            builder
                .push(" LIMIT ")
                .push_bind(limit.map(i64::from).unwrap_or(-1))
                .push(" OFFSET ")
                .push_bind(i64::from(offset.unwrap_or(0)));
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use depot_core::{FlowType, NewItem, NewLocation};
    use uuid::Uuid;

    struct Fixture {
        db: Database,
        item: String,
        a: String,
        b: String,
    }

    async fn setup() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = db.catalog();
        let item = catalog
            .create_item(&NewItem {
                code: "CABLE".to_string(),
                name: "Cable".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let mut ids = Vec::new();
        for code in ["A", "B"] {
            let location = catalog
                .create_location(&NewLocation {
                    code: code.to_string(),
                    name: format!("Location {}", code),
                    ..Default::default()
                })
                .await
                .unwrap();
            ids.push(location.id);
        }
        let b = ids.pop().unwrap();
        let a = ids.pop().unwrap();
        Fixture {
            db,
            item: item.id,
            a,
            b,
        }
    }

    fn entry(
        item: &str,
        from: Option<&str>,
        to: Option<&str>,
        quantity: i64,
        flow_type: FlowType,
        at: DateTime<Utc>,
    ) -> MovementEntry {
        MovementEntry {
            id: Uuid::new_v4().to_string(),
            item_id: item.to_string(),
            from_location_id: from.map(str::to_string),
            to_location_id: to.map(str::to_string),
            quantity,
            operator_id: "op".to_string(),
            flow_type,
            related_record_id: Some("rec-1".to_string()),
            remark: None,
            serial_no: None,
            photo_url: None,
            created_at: at,
        }
    }

    async fn append_all(db: &Database, entries: &[MovementEntry]) {
        let mut tx = db.pool().begin().await.unwrap();
        for e in entries {
            MovementRepository::append(&mut tx, e).await.unwrap();
        }
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_filters_and_ordering() {
        let f = setup().await;
        let day1 = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let day2 = Utc.with_ymd_and_hms(2026, 3, 2, 23, 59, 59).unwrap();
        let day3 = Utc.with_ymd_and_hms(2026, 3, 3, 0, 0, 0).unwrap();

        append_all(
            &f.db,
            &[
                entry(&f.item, None, Some(&f.a), 10, FlowType::In, day1),
                entry(&f.item, Some(&f.a), Some(&f.b), 4, FlowType::Transfer, day2),
                entry(&f.item, Some(&f.b), None, 1, FlowType::Out, day3),
            ],
        )
        .await;

        let repo = f.db.movements();

        let all = repo.query(&FlowFilter::new()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].flow_type, FlowType::Out);
        assert_eq!(all[2].flow_type, FlowType::In);

        // Location matches either side
        let at_b = repo.query(&FlowFilter::new().location(f.b.clone())).await.unwrap();
        assert_eq!(at_b.len(), 2);

        let outs = repo
            .query(&FlowFilter::new().flow_type(FlowType::Out))
            .await
            .unwrap();
        assert_eq!(outs.len(), 1);

        // Inclusive calendar days: 03-01 .. 03-02 includes 23:59:59 on the 2nd
        let range = repo
            .query(&FlowFilter::new().between(
                NaiveDate::from_ymd_opt(2026, 3, 1),
                NaiveDate::from_ymd_opt(2026, 3, 2),
            ))
            .await
            .unwrap();
        assert_eq!(range.len(), 2);

        let page = repo.query(&FlowFilter::new().page(1, 1)).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].flow_type, FlowType::Transfer);
    }

    #[tokio::test]
    async fn test_offset_without_limit() {
        let f = setup().await;
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        append_all(
            &f.db,
            &[
                entry(&f.item, None, Some(&f.a), 1, FlowType::In, at),
                entry(&f.item, None, Some(&f.a), 2, FlowType::In, at),
            ],
        )
        .await;

        let filter = FlowFilter {
            offset: Some(1),
            ..Default::default()
        };
        let rest = f.db.movements().query(&filter).await.unwrap();
        assert_eq!(rest.len(), 1);
        // Same timestamp: insertion order breaks the tie, newest first
        assert_eq!(rest[0].quantity, 1);
    }

    #[tokio::test]
    async fn test_signed_totals() {
        let f = setup().await;
        let at = Utc::now();
        append_all(
            &f.db,
            &[
                entry(&f.item, None, Some(&f.a), 10, FlowType::In, at),
                entry(&f.item, Some(&f.a), Some(&f.b), 4, FlowType::Transfer, at),
                entry(&f.item, Some(&f.b), None, 1, FlowType::Borrow, at),
            ],
        )
        .await;

        let totals = f.db.movements().signed_totals().await.unwrap();
        let at_a = totals.iter().find(|t| t.location_id == f.a).unwrap();
        let at_b = totals.iter().find(|t| t.location_id == f.b).unwrap();
        assert_eq!(at_a.quantity, 6);
        assert_eq!(at_b.quantity, 3);

        assert_eq!(f.db.movements().list_for_record("rec-1").await.unwrap().len(), 3);
        assert_eq!(f.db.movements().count().await.unwrap(), 3);
    }
}

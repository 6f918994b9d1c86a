//! # Balance Repository
//!
//! Current on-hand quantity per (item, location).
//!
//! ## Mutation Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  increment(item, loc, qty)          decrement(item, loc, qty)           │
//! │                                                                         │
//! │  INSERT ... (quantity 0)            INSERT ... (quantity 0)             │
//! │  ON CONFLICT DO NOTHING             ON CONFLICT DO NOTHING              │
//! │       │                                  │                              │
//! │       ▼                                  ▼                              │
//! │  UPDATE quantity = quantity + qty   UPDATE quantity = quantity - qty    │
//! │  WHERE quantity <= MAX - qty        WHERE quantity >= qty               │
//! │       │                                  │                              │
//! │       ├── 1 row  → Applied               ├── 1 row  → Applied           │
//! │       └── 0 rows → Overflow              └── 0 rows → Insufficient      │
//! │                    { current }                        { available }     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both mutations take a `&mut SqliteConnection` so they run on the
//! caller's transaction, next to the detail-record insert and the movement
//! append. The first statement is a write, so the transaction holds the
//! SQLite write lock before it reads anything.
//!
//! The floor is the `WHERE quantity >= ?` guard plus the
//! `CHECK (quantity >= 0)` constraint on the table. The ceiling guard keeps
//! `quantity + ?` inside `i64`; SQLite would otherwise store the overflowed
//! sum as a REAL that no longer decodes.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use depot_core::Balance;

/// Outcome of a guarded decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decrement {
    /// The balance was reduced.
    Applied,
    /// The balance was below the requested quantity; nothing changed.
    Insufficient { available: i64 },
}

/// Outcome of a guarded increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Increment {
    Applied,
    /// `current + qty` would not fit in an `i64`; nothing changed.
    Overflow { current: i64 },
}

/// Repository for stock balances.
#[derive(Debug, Clone)]
pub struct BalanceRepository {
    pool: SqlitePool,
}

impl BalanceRepository {
    /// Creates a new BalanceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BalanceRepository { pool }
    }

    /// Current quantity for a pair, `None` if the pair has never held stock.
    pub async fn get_balance(&self, item_id: &str, location_id: &str) -> DbResult<Option<i64>> {
        let quantity: Option<i64> = sqlx::query_scalar(
            "SELECT quantity FROM stock_balances WHERE item_id = ? AND location_id = ?",
        )
        .bind(item_id)
        .bind(location_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(quantity)
    }

    /// Full balance row for a pair.
    pub async fn get(&self, item_id: &str, location_id: &str) -> DbResult<Option<Balance>> {
        let balance = sqlx::query_as::<_, Balance>(
            "SELECT id, item_id, location_id, quantity, updated_at \
             FROM stock_balances WHERE item_id = ? AND location_id = ?",
        )
        .bind(item_id)
        .bind(location_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(balance)
    }

    /// All balances of one item, across locations.
    pub async fn list_for_item(&self, item_id: &str) -> DbResult<Vec<Balance>> {
        let balances = sqlx::query_as::<_, Balance>(
            "SELECT id, item_id, location_id, quantity, updated_at \
             FROM stock_balances WHERE item_id = ? ORDER BY location_id",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(balances)
    }

    // -------------------------------------------------------------------------
    // Transactional mutations
    // -------------------------------------------------------------------------

    /// Adds `qty` (> 0) to the pair, creating it at 0 first if needed.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let mut tx = pool.begin().await?;
    /// BalanceRepository::increment(&mut tx, &item.id, &location.id, 4).await?;
    /// tx.commit().await?;
    /// ```
    pub async fn increment(
        conn: &mut SqliteConnection,
        item_id: &str,
        location_id: &str,
        qty: i64,
    ) -> DbResult<Increment> {
        Self::ensure_row(conn, item_id, location_id).await?;

        let result = sqlx::query(
            "UPDATE stock_balances SET quantity = quantity + ?, updated_at = ? \
             WHERE item_id = ? AND location_id = ? AND quantity <= ? - ?",
        )
        .bind(qty)
        .bind(Utc::now())
        .bind(item_id)
        .bind(location_id)
        .bind(i64::MAX)
        .bind(qty)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            let current = Self::current(conn, item_id, location_id).await?;
            debug!(item_id, location_id, qty, current, "Balance increment refused");
            return Ok(Increment::Overflow { current });
        }

        debug!(item_id, location_id, qty, "Balance incremented");
        Ok(Increment::Applied)
    }

    /// Subtracts `qty` from the pair only if the balance covers it.
    ///
    /// ## Returns
    /// * `Ok(Decrement::Applied)` - balance reduced
    /// * `Ok(Decrement::Insufficient { available })` - guard failed; the
    ///   caller must roll back (a row created by this call goes with it)
    pub async fn decrement(
        conn: &mut SqliteConnection,
        item_id: &str,
        location_id: &str,
        qty: i64,
    ) -> DbResult<Decrement> {
        Self::ensure_row(conn, item_id, location_id).await?;

        let result = sqlx::query(
            "UPDATE stock_balances SET quantity = quantity - ?, updated_at = ? \
             WHERE item_id = ? AND location_id = ? AND quantity >= ?",
        )
        .bind(qty)
        .bind(Utc::now())
        .bind(item_id)
        .bind(location_id)
        .bind(qty)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            let available = Self::current(conn, item_id, location_id).await?;

            debug!(item_id, location_id, qty, available, "Balance decrement refused");
            return Ok(Decrement::Insufficient { available });
        }

        debug!(item_id, location_id, qty, "Balance decremented");
        Ok(Decrement::Applied)
    }

    async fn current(
        conn: &mut SqliteConnection,
        item_id: &str,
        location_id: &str,
    ) -> DbResult<i64> {
        let quantity: i64 = sqlx::query_scalar(
            "SELECT quantity FROM stock_balances WHERE item_id = ? AND location_id = ?",
        )
        .bind(item_id)
        .bind(location_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(quantity)
    }

    async fn ensure_row(
        conn: &mut SqliteConnection,
        item_id: &str,
        location_id: &str,
    ) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO stock_balances (id, item_id, location_id, quantity, updated_at) \
             VALUES (?, ?, ?, 0, ?) \
             ON CONFLICT (item_id, location_id) DO NOTHING",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(item_id)
        .bind(location_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use depot_core::{NewItem, NewLocation};

    async fn setup() -> (Database, String, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let item = db
            .catalog()
            .create_item(&NewItem {
                code: "BOLT".to_string(),
                name: "Bolt".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let location = db
            .catalog()
            .create_location(&NewLocation {
                code: "A-01".to_string(),
                name: "Shelf A1".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        (db, item.id, location.id)
    }

    #[tokio::test]
    async fn test_increment_creates_pair() {
        let (db, item, loc) = setup().await;
        assert_eq!(db.balances().get_balance(&item, &loc).await.unwrap(), None);

        let mut tx = db.pool().begin().await.unwrap();
        BalanceRepository::increment(&mut tx, &item, &loc, 4).await.unwrap();
        BalanceRepository::increment(&mut tx, &item, &loc, 6).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(db.balances().get_balance(&item, &loc).await.unwrap(), Some(10));
        assert_eq!(db.balances().list_for_item(&item).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_decrement_guard() {
        let (db, item, loc) = setup().await;

        let mut tx = db.pool().begin().await.unwrap();
        BalanceRepository::increment(&mut tx, &item, &loc, 10).await.unwrap();
        let applied = BalanceRepository::decrement(&mut tx, &item, &loc, 7).await.unwrap();
        let refused = BalanceRepository::decrement(&mut tx, &item, &loc, 5).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(applied, Decrement::Applied);
        assert_eq!(refused, Decrement::Insufficient { available: 3 });
        assert_eq!(db.balances().get_balance(&item, &loc).await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_decrement_on_fresh_pair_rolls_back_cleanly() {
        let (db, item, loc) = setup().await;

        let mut tx = db.pool().begin().await.unwrap();
        let outcome = BalanceRepository::decrement(&mut tx, &item, &loc, 1).await.unwrap();
        assert_eq!(outcome, Decrement::Insufficient { available: 0 });
        tx.rollback().await.unwrap();

        // The zero row created inside the transaction is gone
        assert_eq!(db.balances().get_balance(&item, &loc).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_increment_refuses_to_overflow() {
        let (db, item, loc) = setup().await;

        let mut tx = db.pool().begin().await.unwrap();
        let first = BalanceRepository::increment(&mut tx, &item, &loc, i64::MAX - 1)
            .await
            .unwrap();
        let exact = BalanceRepository::increment(&mut tx, &item, &loc, 1).await.unwrap();
        let over = BalanceRepository::increment(&mut tx, &item, &loc, 1).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(first, Increment::Applied);
        assert_eq!(exact, Increment::Applied);
        assert_eq!(over, Increment::Overflow { current: i64::MAX });

        // Still an integer column value, so reads keep decoding
        assert_eq!(
            db.balances().get_balance(&item, &loc).await.unwrap(),
            Some(i64::MAX)
        );
        let kind: String = sqlx::query_scalar("SELECT typeof(quantity) FROM stock_balances")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(kind, "integer");
    }

    #[tokio::test]
    async fn test_check_constraint_blocks_negative_balance() {
        let (db, item, loc) = setup().await;

        let mut tx = db.pool().begin().await.unwrap();
        BalanceRepository::increment(&mut tx, &item, &loc, 2).await.unwrap();
        tx.commit().await.unwrap();

        let err = sqlx::query("UPDATE stock_balances SET quantity = -1 WHERE item_id = ?")
            .bind(&item)
            .execute(db.pool())
            .await
            .unwrap_err();
        assert!(matches!(
            crate::DbError::from(err),
            crate::DbError::CheckViolation { .. }
        ));
    }
}

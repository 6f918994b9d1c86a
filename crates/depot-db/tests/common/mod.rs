//! Shared fixtures for depot-db integration tests.

#![allow(dead_code)]

use depot_core::{
    BorrowRequest, Item, ItemRef, Location, LocationRef, NewItem, NewLocation, NewUser,
    StockInRequest, StockOutRequest, User,
};
use depot_db::{Database, DbConfig};

pub struct Warehouse {
    pub db: Database,
    pub item: Item,
    pub shelf: Location,
    pub cabinet: Location,
    pub keeper: User,
    pub borrower: User,
}

impl Warehouse {
    /// One item (min_stock 5), two locations, a keeper and a borrower.
    pub async fn in_memory() -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        Self::populate(db).await
    }

    pub async fn populate(db: Database) -> Self {
        let catalog = db.catalog();
        let item = catalog
            .create_item(&NewItem {
                code: "SCREW-M4".to_string(),
                name: "M4 screw".to_string(),
                category: Some("Consumables".to_string()),
                min_stock: Some(5),
                ..Default::default()
            })
            .await
            .unwrap();
        let shelf = catalog
            .create_location(&NewLocation {
                code: "A-01".to_string(),
                name: "Shelf A1".to_string(),
                area: Some("Main store".to_string()),
                description: None,
            })
            .await
            .unwrap();
        let cabinet = catalog
            .create_location(&NewLocation {
                code: "B-01".to_string(),
                name: "Cabinet B1".to_string(),
                area: Some("Lab".to_string()),
                description: None,
            })
            .await
            .unwrap();
        let keeper = catalog
            .create_user(&NewUser {
                username: "keeper".to_string(),
                name: "Store Keeper".to_string(),
                role: Some("warehouse".to_string()),
            })
            .await
            .unwrap();
        let borrower = catalog
            .create_user(&NewUser {
                username: "alice".to_string(),
                name: "Alice".to_string(),
                role: None,
            })
            .await
            .unwrap();

        Warehouse {
            db,
            item,
            shelf,
            cabinet,
            keeper,
            borrower,
        }
    }

    pub fn item_ref(&self) -> ItemRef {
        ItemRef::Id(self.item.id.clone())
    }

    pub fn at(location: &Location) -> LocationRef {
        LocationRef::Id(location.id.clone())
    }

    pub fn stock_in(&self, location: &Location, quantity: i64) -> StockInRequest {
        StockInRequest::new(self.item_ref(), Self::at(location), quantity, &self.keeper.id)
    }

    pub fn stock_out(&self, location: &Location, quantity: i64) -> StockOutRequest {
        StockOutRequest::new(self.item_ref(), Self::at(location), quantity, &self.keeper.id)
    }

    pub fn borrow(&self, location: &Location, quantity: i64) -> BorrowRequest {
        BorrowRequest::new(
            self.item_ref(),
            Self::at(location),
            quantity,
            &self.borrower.id,
            &self.keeper.id,
        )
    }

    pub async fn balance(&self, location: &Location) -> Option<i64> {
        self.db
            .balances()
            .get_balance(&self.item.id, &location.id)
            .await
            .unwrap()
    }

    pub async fn assert_consistent(&self) {
        let discrepancies = self.db.queries().audit_balances().await.unwrap();
        assert!(
            discrepancies.is_empty(),
            "balances disagree with movement log: {:?}",
            discrepancies
        );
    }
}

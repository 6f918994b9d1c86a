//! Stock views, flow listing and dashboard aggregates.

mod common;

use chrono::{Days, Utc};
use common::Warehouse;
use depot_core::{
    CategoryStat, CoreError, FlowFilter, FlowType, Item, ItemRef, NewItem, StockInRequest,
    TREND_DAYS, UNCATEGORIZED,
};
use depot_db::LedgerError;

/// Screws: 16 on the shelf, 3 in the cabinet (min 5).
/// Cable: 2 on the shelf (min 10, no category).
/// Tape: never stocked (min 0, no category).
struct Stocked {
    w: Warehouse,
    cable: Item,
    tape: Item,
}

async fn stocked() -> Stocked {
    let w = Warehouse::in_memory().await;
    let catalog = w.db.catalog();
    let cable = catalog
        .create_item(&NewItem {
            code: "CABLE-01".to_string(),
            name: "Cat6 cable".to_string(),
            unit: Some("m".to_string()),
            min_stock: Some(10),
            ..Default::default()
        })
        .await
        .unwrap();
    let tape = catalog
        .create_item(&NewItem {
            code: "TAPE-01".to_string(),
            name: "Insulation tape".to_string(),
            min_stock: Some(0),
            ..Default::default()
        })
        .await
        .unwrap();

    let ledger = w.db.ledger();
    ledger.stock_in(w.stock_in(&w.shelf, 20)).await.unwrap();
    ledger.stock_in(w.stock_in(&w.cabinet, 3)).await.unwrap();
    ledger
        .stock_in(StockInRequest::new(
            ItemRef::Id(cable.id.clone()),
            Warehouse::at(&w.shelf),
            2,
            &w.keeper.id,
        ))
        .await
        .unwrap();
    ledger.stock_out(w.stock_out(&w.shelf, 4)).await.unwrap();

    Stocked { w, cable, tape }
}

#[tokio::test]
async fn list_stock_puts_low_rows_first() {
    let s = stocked().await;
    let rows = s.w.db.queries().list_stock().await.unwrap();

    let summary: Vec<(&str, &str, i64, bool)> = rows
        .iter()
        .map(|r| {
            (
                r.item_code.as_str(),
                r.location_code.as_str(),
                r.quantity,
                r.is_low_stock,
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            ("CABLE-01", "A-01", 2, true),
            ("SCREW-M4", "B-01", 3, true),
            ("SCREW-M4", "A-01", 16, false),
        ]
    );

    let cable = &rows[0];
    assert_eq!(cable.unit, "m");
    assert_eq!(cable.location_name, "Shelf A1");
    assert_eq!(rows[1].category.as_deref(), Some("Consumables"));
}

#[tokio::test]
async fn balance_equal_to_minimum_is_low() {
    let w = Warehouse::in_memory().await;
    w.db.ledger().stock_in(w.stock_in(&w.shelf, 5)).await.unwrap();

    let rows = w.db.queries().list_stock().await.unwrap();
    assert!(rows[0].is_low_stock);
    assert_eq!(rows[0].shortage(), 0);
    assert_eq!(w.db.queries().list_low_stock().await.unwrap().len(), 1);
}

#[tokio::test]
async fn list_low_stock_orders_by_shortage() {
    let s = stocked().await;
    let rows = s.w.db.queries().list_low_stock().await.unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].item_id, s.cable.id);
    assert_eq!(rows[0].shortage(), 8);
    assert_eq!(rows[1].item_id, s.w.item.id);
    assert_eq!(rows[1].location_id, s.w.cabinet.id);
    assert_eq!(rows[1].shortage(), 2);
    assert!(rows.iter().all(|r| r.is_low_stock));
}

#[tokio::test]
async fn list_flow_joins_display_fields() {
    let s = stocked().await;
    let queries = s.w.db.queries();

    let all = queries.list_flow(&FlowFilter::new()).await.unwrap();
    assert_eq!(all.len(), 4);
    let latest = &all[0];
    assert_eq!(latest.entry.flow_type, FlowType::Out);
    assert_eq!(latest.entry.quantity, 4);
    assert_eq!(latest.item_code, "SCREW-M4");
    assert_eq!(latest.item_name, "M4 screw");
    assert_eq!(latest.from_location_code.as_deref(), Some("A-01"));
    assert_eq!(latest.from_location_name.as_deref(), Some("Shelf A1"));
    assert_eq!(latest.to_location_code, None);
    assert_eq!(latest.operator_username.as_deref(), Some("keeper"));
    assert_eq!(latest.operator_name.as_deref(), Some("Store Keeper"));

    let outs = queries
        .list_flow(&FlowFilter::new().flow_type(FlowType::Out))
        .await
        .unwrap();
    assert_eq!(outs.len(), 1);

    let at_cabinet = queries
        .list_flow(&FlowFilter::new().location(&s.w.cabinet.id))
        .await
        .unwrap();
    assert_eq!(at_cabinet.len(), 1);
    assert_eq!(at_cabinet[0].to_location_code.as_deref(), Some("B-01"));

    let cable = queries
        .list_flow(&FlowFilter::new().item(&s.cable.id))
        .await
        .unwrap();
    assert_eq!(cable.len(), 1);
    assert_eq!(cable[0].unit, "m");

    let first_page = queries
        .list_flow(&FlowFilter::new().page(2, 0))
        .await
        .unwrap();
    let second_page = queries
        .list_flow(&FlowFilter::new().page(2, 2))
        .await
        .unwrap();
    assert_eq!(first_page.len(), 2);
    assert_eq!(second_page.len(), 2);
    assert_eq!(first_page[0].entry.id, all[0].entry.id);
    assert_eq!(second_page[1].entry.id, all[3].entry.id);
}

#[tokio::test]
async fn list_flow_keeps_rows_of_unregistered_operators() {
    let w = Warehouse::in_memory().await;
    w.db.ledger()
        .stock_in(StockInRequest::new(
            w.item_ref(),
            Warehouse::at(&w.shelf),
            1,
            "scanner-07",
        ))
        .await
        .unwrap();

    let rows = w.db.queries().list_flow(&FlowFilter::new()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].entry.operator_id, "scanner-07");
    assert_eq!(rows[0].operator_username, None);
}

#[tokio::test]
async fn list_flow_date_range() {
    let s = stocked().await;
    let queries = s.w.db.queries();
    let today = Utc::now().date_naive();
    let yesterday = today - Days::new(1);

    let todays = queries
        .list_flow(&FlowFilter::new().between(Some(today), Some(today)))
        .await
        .unwrap();
    assert_eq!(todays.len(), 4);

    let before = queries
        .list_flow(&FlowFilter::new().between(None, Some(yesterday)))
        .await
        .unwrap();
    assert!(before.is_empty());

    let err = queries
        .list_flow(&FlowFilter::new().between(Some(today), Some(yesterday)))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Rejected(CoreError::Validation(_))));
}

#[tokio::test]
async fn dashboard_totals_and_categories() {
    let s = stocked().await;
    let summary = s.w.db.queries().dashboard_summary().await.unwrap();

    assert_eq!(summary.total_items, 3);
    assert_eq!(summary.total_locations, 2);
    assert_eq!(summary.total_stock_quantity, 21);
    // Screws total 19 across locations, above 5; cable 2 <= 10; tape 0 <= 0
    assert_eq!(summary.low_stock_count, 2);

    assert_eq!(
        summary.category_stats,
        vec![
            CategoryStat {
                category: "Consumables".to_string(),
                item_count: 1,
                total_quantity: 19,
            },
            CategoryStat {
                category: UNCATEGORIZED.to_string(),
                item_count: 2,
                total_quantity: 2,
            },
        ]
    );
    assert!(s.tape.category.is_none());
}

#[tokio::test]
async fn dashboard_trend_covers_thirty_days_ending_today() {
    let s = stocked().await;
    let today = Utc::now().date_naive();
    let summary = s.w.db.queries().dashboard_summary_on(today).await.unwrap();

    let trend = &summary.in_out_trend;
    assert_eq!(trend.len(), TREND_DAYS);
    assert_eq!(trend[0].date, today - Days::new(TREND_DAYS as u64 - 1));
    let last = trend.last().unwrap();
    assert_eq!(last.date, today);
    assert_eq!(last.stock_in_qty, 25);
    assert_eq!(last.stock_out_qty, 4);
    assert!(trend[..trend.len() - 1]
        .iter()
        .all(|p| p.stock_in_qty == 0 && p.stock_out_qty == 0));

    // Seen from well after the window, today's records drop out
    let later = today + Days::new(40);
    let summary = s.w.db.queries().dashboard_summary_on(later).await.unwrap();
    assert_eq!(summary.in_out_trend.len(), TREND_DAYS);
    assert!(summary
        .in_out_trend
        .iter()
        .all(|p| p.stock_in_qty == 0 && p.stock_out_qty == 0));
}

#[tokio::test]
async fn dashboard_on_empty_store() {
    let w = Warehouse::in_memory().await;
    let summary = w.db.queries().dashboard_summary().await.unwrap();

    assert_eq!(summary.total_items, 1);
    assert_eq!(summary.total_stock_quantity, 0);
    // An item with no balances counts as 0 on hand
    assert_eq!(summary.low_stock_count, 1);
    assert_eq!(summary.category_stats.len(), 1);
    assert_eq!(summary.category_stats[0].total_quantity, 0);
}

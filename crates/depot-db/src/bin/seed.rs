//! # Seed Data Generator
//!
//! Populates the database with a small warehouse for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./depot_dev.db
//! cargo run -p depot-db --bin seed
//!
//! # Specify database path and opening quantity per (item, location)
//! cargo run -p depot-db --bin seed -- --db ./data/depot.db --opening 25
//! ```
//!
//! ## Generated Data
//! - Categories: Tools, Cables, Consumables, Devices
//! - Items: a handful per category, codes `{CATEGORY}-{INDEX}`
//! - Locations: two shelves per area
//! - Users: an admin, a warehouse keeper and two borrowers
//! - Opening stock: one stock-in per (item, location) through the ledger,
//!   so balances and the movement log start consistent

use std::env;

use depot_core::{
    ItemRef, LocationRef, NewCategory, NewItem, NewLocation, NewUser, StockInRequest,
};
use depot_db::{Database, DbConfig};

/// (category, code prefix, unit, min_stock, items)
const CATALOG: &[(&str, &str, &str, i64, &[&str])] = &[
    (
        "Tools",
        "TL",
        "pcs",
        2,
        &["Cordless drill", "Torque wrench", "Crimping tool", "Multimeter"],
    ),
    (
        "Cables",
        "CB",
        "m",
        50,
        &["Cat6 cable", "HDMI cable", "Power cord", "Fiber patch cord"],
    ),
    (
        "Consumables",
        "CS",
        "box",
        10,
        &["M4 screws", "Cable ties", "Insulation tape", "Thermal paste"],
    ),
    (
        "Devices",
        "DV",
        "pcs",
        1,
        &["Laptop", "Barcode scanner", "Label printer"],
    ),
];

/// (code, name, area)
const LOCATIONS: &[(&str, &str, &str)] = &[
    ("A-01", "Shelf A1", "Main store"),
    ("A-02", "Shelf A2", "Main store"),
    ("B-01", "Cabinet B1", "Lab"),
    ("B-02", "Cabinet B2", "Lab"),
];

/// (username, name, role)
const USERS: &[(&str, &str, &str)] = &[
    ("admin", "Administrator", "admin"),
    ("keeper", "Store Keeper", "warehouse"),
    ("alice", "Alice Chen", "user"),
    ("bob", "Bob Wang", "user"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./depot_dev.db");
    let mut opening: i64 = 20;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--opening" | "-o" => {
                if i + 1 < args.len() {
                    opening = args[i + 1].parse().unwrap_or(20);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Depot Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>        Database file path (default: ./depot_dev.db)");
                println!("  -o, --opening <QTY>    Opening stock per item and location (default: 20)");
                println!("  -h, --help             Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Depot Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!("Opening stock: {}", opening);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let catalog = db.catalog();
    let existing = catalog.count_items().await?;
    if existing > 0 {
        println!("⚠ Database already has {} items", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();

    let mut operator_id = String::new();
    for (username, name, role) in USERS {
        let user = catalog
            .create_user(&NewUser {
                username: username.to_string(),
                name: name.to_string(),
                role: Some(role.to_string()),
            })
            .await?;
        if *username == "keeper" {
            operator_id = user.id;
        }
    }
    println!("✓ Created {} users", USERS.len());

    for (code, name, area) in LOCATIONS {
        catalog
            .create_location(&NewLocation {
                code: code.to_string(),
                name: name.to_string(),
                area: Some(area.to_string()),
                description: None,
            })
            .await?;
    }
    println!("✓ Created {} locations", LOCATIONS.len());

    let mut item_codes = Vec::new();
    for (category_name, prefix, unit, min_stock, names) in CATALOG {
        let category = catalog
            .create_category(&NewCategory {
                name: category_name.to_string(),
                parent_id: None,
                description: None,
            })
            .await?;

        for (idx, name) in names.iter().enumerate() {
            let code = format!("{}-{:03}", prefix, idx + 1);
            catalog
                .create_item(&NewItem {
                    code: code.clone(),
                    name: name.to_string(),
                    category_id: Some(category.id.clone()),
                    unit: Some(unit.to_string()),
                    min_stock: Some(*min_stock),
                    ..Default::default()
                })
                .await?;
            item_codes.push(code);
        }
    }
    println!("✓ Created {} categories, {} items", CATALOG.len(), item_codes.len());

    println!();
    println!("Recording opening stock...");

    let ledger = db.ledger();
    let mut receipts = 0;
    for code in &item_codes {
        for (location_code, _, _) in LOCATIONS {
            let mut request = StockInRequest::new(
                ItemRef::Code(code.clone()),
                LocationRef::Code(location_code.to_string()),
                opening,
                &operator_id,
            );
            request.remark = Some("Opening balance".to_string());

            if let Err(e) = ledger.stock_in(request).await {
                eprintln!("Failed to stock {} at {}: {}", code, location_code, e);
                continue;
            }
            receipts += 1;
        }
    }

    let elapsed = start.elapsed();
    println!("✓ Recorded {} stock-in receipts in {:?}", receipts, elapsed);

    println!();
    println!("Verifying balances...");
    let discrepancies = db.queries().audit_balances().await?;
    println!("  Audit discrepancies: {}", discrepancies.len());
    let summary = db.queries().dashboard_summary().await?;
    println!("  Total stock quantity: {}", summary.total_stock_quantity);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

//! # Commands
//!
//! Argument definitions and handlers for every `depot` subcommand. Each
//! handler returns the JSON document printed on stdout.
//!
//! ```text
//! depot
//! ├── init                      create the store, apply migrations
//! ├── catalog add-item | add-location | add-category | add-user
//! │           items | locations | categories | users
//! ├── stock-in / stock-out      receipts and issues
//! ├── borrow / return           loans, returned in full
//! ├── borrows                   borrow records by borrower/item/kind/status
//! ├── stock / low-stock         balance views
//! ├── flow                      movement log with display fields
//! ├── dashboard                 totals, categories, 30-day trend
//! └── audit                     balances vs movement log
//! ```

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};
use serde_json::{json, Value};
use thiserror::Error;

use depot_core::{
    BalanceDiscrepancy, BorrowFilter, BorrowKind, BorrowRequest, BorrowStatus, CoreError,
    DeviceDetails, FlowFilter, FlowType, ItemRef, LocationRef, NewCategory, NewItem,
    NewLocation, NewUser, ReturnRequest, StockInRequest, StockOutRequest,
};
use depot_db::{migrations, Database, LedgerError};

use crate::config::DepotConfig;

// =============================================================================
// Arguments
// =============================================================================

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the database file and apply pending migrations
    Init,

    /// Register or list items, locations, categories and users
    #[command(subcommand)]
    Catalog(CatalogCommand),

    /// Record items arriving at a location
    StockIn(StockInArgs),

    /// Record items leaving a location
    StockOut(StockOutArgs),

    /// Lend items to a registered user
    Borrow(BorrowArgs),

    /// Return an outstanding borrow in full
    Return(ReturnArgs),

    /// List borrow records
    Borrows(BorrowsArgs),

    /// Every balance, low-stock rows first
    Stock,

    /// Balances at or below their item's minimum
    LowStock,

    /// Movement history
    Flow(FlowArgs),

    /// Dashboard summary
    Dashboard {
        /// Last day of the trend window (default: today, UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Compare cached balances with the movement log
    Audit,
}

#[derive(Debug, Subcommand)]
pub enum CatalogCommand {
    AddItem {
        #[arg(long)]
        code: String,
        #[arg(long)]
        name: String,
        /// Category name; linked when a category with this name exists
        #[arg(long)]
        category: Option<String>,
        #[arg(long, conflicts_with = "category")]
        category_id: Option<String>,
        #[arg(long)]
        unit: Option<String>,
        #[arg(long)]
        min_stock: Option<i64>,
        #[arg(long)]
        brand: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        spec: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    AddLocation {
        #[arg(long)]
        code: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        area: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    AddCategory {
        #[arg(long)]
        name: String,
        #[arg(long)]
        parent_id: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    AddUser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        role: Option<String>,
    },
    Items,
    Locations,
    Categories,
    Users,
}

/// `--item-id` or `--item-code`, exactly one.
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct ItemArgs {
    #[arg(long)]
    item_id: Option<String>,
    /// Scanned item code
    #[arg(long)]
    item_code: Option<String>,
}

impl ItemArgs {
    fn to_ref(&self) -> anyhow::Result<ItemRef> {
        match (&self.item_id, &self.item_code) {
            (Some(id), _) => Ok(ItemRef::Id(id.clone())),
            (None, Some(code)) => Ok(ItemRef::Code(code.clone())),
            (None, None) => bail!("one of --item-id or --item-code is required"),
        }
    }
}

/// `--location-id` or `--location-code`, exactly one.
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct LocationArgs {
    #[arg(long)]
    location_id: Option<String>,
    /// Scanned location code
    #[arg(long)]
    location_code: Option<String>,
}

impl LocationArgs {
    fn to_ref(&self) -> anyhow::Result<LocationRef> {
        match (&self.location_id, &self.location_code) {
            (Some(id), _) => Ok(LocationRef::Id(id.clone())),
            (None, Some(code)) => Ok(LocationRef::Code(code.clone())),
            (None, None) => bail!("one of --location-id or --location-code is required"),
        }
    }
}

#[derive(Debug, Args)]
pub struct OperatorArgs {
    /// Operator user id (default: `operator` from config)
    #[arg(long)]
    operator: Option<String>,
}

impl OperatorArgs {
    fn resolve(&self, config: &DepotConfig) -> anyhow::Result<String> {
        match self.operator.as_ref().or(config.operator.as_ref()) {
            Some(op) => Ok(op.clone()),
            None => bail!("no operator: pass --operator or set DEPOT_OPERATOR"),
        }
    }
}

#[derive(Debug, Args)]
pub struct DeviceArgs {
    #[arg(long)]
    brand: Option<String>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    spec: Option<String>,
    #[arg(long)]
    serial_no: Option<String>,
    #[arg(long)]
    photo_url: Option<String>,
}

impl From<DeviceArgs> for DeviceDetails {
    fn from(args: DeviceArgs) -> Self {
        DeviceDetails {
            brand: args.brand,
            model: args.model,
            spec: args.spec,
            serial_no: args.serial_no,
            photo_url: args.photo_url,
        }
    }
}

#[derive(Debug, Args)]
pub struct StockInArgs {
    #[command(flatten)]
    item: ItemArgs,
    #[command(flatten)]
    location: LocationArgs,
    #[arg(long, short = 'q')]
    quantity: i64,
    #[command(flatten)]
    operator: OperatorArgs,
    #[arg(long)]
    supplier: Option<String>,
    #[arg(long)]
    batch_no: Option<String>,
    /// Business date (default: today)
    #[arg(long)]
    date: Option<NaiveDate>,
    #[arg(long)]
    remark: Option<String>,
    #[command(flatten)]
    device: DeviceArgs,
}

#[derive(Debug, Args)]
pub struct StockOutArgs {
    #[command(flatten)]
    item: ItemArgs,
    #[command(flatten)]
    location: LocationArgs,
    #[arg(long, short = 'q')]
    quantity: i64,
    #[command(flatten)]
    operator: OperatorArgs,
    /// Registered recipient user id
    #[arg(long)]
    recipient_id: Option<String>,
    #[arg(long)]
    recipient_name: Option<String>,
    #[arg(long)]
    purpose: Option<String>,
    #[arg(long)]
    date: Option<NaiveDate>,
    #[arg(long)]
    remark: Option<String>,
    #[command(flatten)]
    device: DeviceArgs,
}

#[derive(Debug, Args)]
pub struct BorrowArgs {
    #[command(flatten)]
    item: ItemArgs,
    #[command(flatten)]
    location: LocationArgs,
    #[arg(long, short = 'q')]
    quantity: i64,
    /// Borrowing user id
    #[arg(long)]
    borrower: String,
    #[command(flatten)]
    operator: OperatorArgs,
    #[arg(long)]
    expected_return: Option<NaiveDate>,
    #[arg(long)]
    remark: Option<String>,
    #[arg(long)]
    photo_url: Option<String>,
}

#[derive(Debug, Args)]
pub struct ReturnArgs {
    /// Id of the borrow record being returned
    record_id: String,
    #[command(flatten)]
    operator: OperatorArgs,
    #[arg(long)]
    remark: Option<String>,
    #[arg(long)]
    photo_url: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindArg {
    Borrow,
    Return,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Borrowed,
    Returned,
    Overdue,
}

#[derive(Debug, Args)]
pub struct BorrowsArgs {
    #[arg(long)]
    borrower: Option<String>,
    #[arg(long)]
    item_id: Option<String>,
    #[arg(long, value_enum)]
    kind: Option<KindArg>,
    #[arg(long, value_enum)]
    status: Option<StatusArg>,
}

impl From<BorrowsArgs> for BorrowFilter {
    fn from(args: BorrowsArgs) -> Self {
        BorrowFilter {
            borrower_id: args.borrower,
            item_id: args.item_id,
            kind: args.kind.map(|k| match k {
                KindArg::Borrow => BorrowKind::Borrow,
                KindArg::Return => BorrowKind::Return,
            }),
            status: args.status.map(|s| match s {
                StatusArg::Borrowed => BorrowStatus::Borrowed,
                StatusArg::Returned => BorrowStatus::Returned,
                StatusArg::Overdue => BorrowStatus::Overdue,
            }),
        }
    }
}

#[derive(Debug, Args)]
pub struct FlowArgs {
    #[arg(long, conflicts_with = "item_code")]
    item_id: Option<String>,
    #[arg(long)]
    item_code: Option<String>,
    /// Movements from or to this location
    #[arg(long, conflicts_with = "location_code")]
    location_id: Option<String>,
    #[arg(long)]
    location_code: Option<String>,
    /// in | out | transfer | borrow | return
    #[arg(long = "type")]
    flow_type: Option<FlowType>,
    /// First day included
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Last day included
    #[arg(long)]
    to: Option<NaiveDate>,
    #[arg(long)]
    limit: Option<u32>,
    #[arg(long)]
    offset: Option<u32>,
}

// =============================================================================
// Errors
// =============================================================================

/// `depot audit` found balances that disagree with the movement log.
#[derive(Debug, Error)]
#[error("{} balance(s) disagree with the movement log", discrepancies.len())]
pub struct AuditMismatch {
    pub discrepancies: Vec<BalanceDiscrepancy>,
}

// =============================================================================
// Execution
// =============================================================================

/// Runs one command against an open store.
pub async fn execute(command: Command, db: &Database, config: &DepotConfig) -> anyhow::Result<Value> {
    match command {
        Command::Init => {
            let (total, applied) = migrations::migration_status(db.pool()).await?;
            Ok(json!({
                "database": config.database.path,
                "migrations_total": total,
                "migrations_applied": applied,
            }))
        }
        Command::Catalog(command) => catalog(command, db).await,
        Command::StockIn(args) => {
            let mut request = StockInRequest::new(
                args.item.to_ref()?,
                args.location.to_ref()?,
                args.quantity,
                args.operator.resolve(config)?,
            );
            request.supplier = args.supplier;
            request.batch_no = args.batch_no;
            request.business_date = args.date;
            request.remark = args.remark;
            request.device = args.device.into();
            Ok(serde_json::to_value(db.ledger().stock_in(request).await?)?)
        }
        Command::StockOut(args) => {
            let mut request = StockOutRequest::new(
                args.item.to_ref()?,
                args.location.to_ref()?,
                args.quantity,
                args.operator.resolve(config)?,
            );
            request.recipient_id = args.recipient_id;
            request.recipient_name = args.recipient_name;
            request.purpose = args.purpose;
            request.business_date = args.date;
            request.remark = args.remark;
            request.device = args.device.into();
            Ok(serde_json::to_value(db.ledger().stock_out(request).await?)?)
        }
        Command::Borrow(args) => {
            let mut request = BorrowRequest::new(
                args.item.to_ref()?,
                args.location.to_ref()?,
                args.quantity,
                args.borrower,
                args.operator.resolve(config)?,
            );
            request.expected_return_date = args.expected_return;
            request.remark = args.remark;
            request.photo_url = args.photo_url;
            Ok(serde_json::to_value(db.ledger().borrow(request).await?)?)
        }
        Command::Return(args) => {
            let mut request = ReturnRequest::new(args.record_id, args.operator.resolve(config)?);
            request.remark = args.remark;
            request.photo_url = args.photo_url;
            Ok(serde_json::to_value(db.ledger().return_borrowed(request).await?)?)
        }
        Command::Borrows(args) => {
            let records = db.records().list_borrow_records(&args.into()).await?;
            Ok(serde_json::to_value(records)?)
        }
        Command::Stock => Ok(serde_json::to_value(db.queries().list_stock().await?)?),
        Command::LowStock => Ok(serde_json::to_value(db.queries().list_low_stock().await?)?),
        Command::Flow(args) => {
            let filter = flow_filter(args, db).await?;
            Ok(serde_json::to_value(db.queries().list_flow(&filter).await?)?)
        }
        Command::Dashboard { date } => {
            let summary = match date {
                Some(day) => db.queries().dashboard_summary_on(day).await?,
                None => db.queries().dashboard_summary().await?,
            };
            Ok(serde_json::to_value(summary)?)
        }
        Command::Audit => {
            let discrepancies = db.queries().audit_balances().await?;
            if !discrepancies.is_empty() {
                return Err(AuditMismatch { discrepancies }.into());
            }
            Ok(json!({ "consistent": true }))
        }
    }
}

async fn catalog(command: CatalogCommand, db: &Database) -> anyhow::Result<Value> {
    let catalog = db.catalog();
    let value = match command {
        CatalogCommand::AddItem {
            code,
            name,
            category,
            category_id,
            unit,
            min_stock,
            brand,
            model,
            spec,
            description,
        } => serde_json::to_value(
            catalog
                .create_item(&NewItem {
                    code,
                    name,
                    category,
                    category_id,
                    unit,
                    min_stock,
                    brand,
                    model,
                    spec,
                    description,
                })
                .await?,
        )?,
        CatalogCommand::AddLocation {
            code,
            name,
            area,
            description,
        } => serde_json::to_value(
            catalog
                .create_location(&NewLocation {
                    code,
                    name,
                    area,
                    description,
                })
                .await?,
        )?,
        CatalogCommand::AddCategory {
            name,
            parent_id,
            description,
        } => serde_json::to_value(
            catalog
                .create_category(&NewCategory {
                    name,
                    parent_id,
                    description,
                })
                .await?,
        )?,
        CatalogCommand::AddUser {
            username,
            name,
            role,
        } => serde_json::to_value(
            catalog
                .create_user(&NewUser {
                    username,
                    name,
                    role,
                })
                .await?,
        )?,
        CatalogCommand::Items => serde_json::to_value(catalog.list_items().await?)?,
        CatalogCommand::Locations => serde_json::to_value(catalog.list_locations().await?)?,
        CatalogCommand::Categories => serde_json::to_value(catalog.list_categories().await?)?,
        CatalogCommand::Users => serde_json::to_value(catalog.list_users().await?)?,
    };
    Ok(value)
}

/// Builds the flow filter, resolving scanned codes to ids.
async fn flow_filter(args: FlowArgs, db: &Database) -> anyhow::Result<FlowFilter> {
    let catalog = db.catalog();

    let item_id = match (args.item_id, args.item_code) {
        (Some(id), _) => Some(id),
        (None, Some(code)) => Some(
            catalog
                .resolve_item(&ItemRef::Code(code))
                .await
                .context("resolving --item-code")?
                .id,
        ),
        (None, None) => None,
    };

    let location_id = match (args.location_id, args.location_code) {
        (Some(id), _) => Some(id),
        (None, Some(code)) => Some(
            catalog
                .resolve_location(&LocationRef::Code(code))
                .await
                .context("resolving --location-code")?
                .id,
        ),
        (None, None) => None,
    };

    Ok(FlowFilter {
        item_id,
        location_id,
        flow_type: args.flow_type,
        from_date: args.from,
        to_date: args.to,
        limit: args.limit,
        offset: args.offset,
    })
}

/// True when `err` is a request the ledger refused rather than a failure.
pub fn is_rejection(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(cause.downcast_ref::<LedgerError>(), Some(e) if e.is_rejection())
            || cause.downcast_ref::<CoreError>().is_some()
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cli;
    use clap::Parser;
    use depot_db::DbConfig;
    use tempfile::TempDir;

    async fn open() -> (TempDir, Database, DepotConfig) {
        let dir = TempDir::new().unwrap();
        let mut config = DepotConfig::default();
        config.database.path = dir.path().join("depot.db");
        let db = Database::new(DbConfig::new(config.database.path.clone()))
            .await
            .unwrap();
        (dir, db, config)
    }

    async fn run(db: &Database, config: &DepotConfig, args: &[&str]) -> anyhow::Result<Value> {
        let cli = Cli::try_parse_from(std::iter::once("depot").chain(args.iter().copied()))?;
        execute(cli.command, db, config).await
    }

    #[test]
    fn test_item_reference_is_exclusive() {
        let both = Cli::try_parse_from([
            "depot", "stock-in", "--item-id", "a", "--item-code", "b", "--location-code", "A-01",
            "-q", "1",
        ]);
        assert!(both.is_err());

        let neither = Cli::try_parse_from(["depot", "stock-in", "--location-code", "A-01", "-q", "1"]);
        assert!(neither.is_err());

        let ok = Cli::try_parse_from([
            "depot", "stock-in", "--item-code", "b", "--location-code", "A-01", "-q", "1",
        ]);
        assert!(ok.is_ok());
    }

    #[test]
    fn test_flow_type_parses() {
        let cli = Cli::try_parse_from(["depot", "flow", "--type", "borrow"]).unwrap();
        match cli.command {
            Command::Flow(args) => assert_eq!(args.flow_type, Some(FlowType::Borrow)),
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(Cli::try_parse_from(["depot", "flow", "--type", "sideways"]).is_err());
    }

    #[tokio::test]
    async fn test_operator_falls_back_to_config() {
        let (_dir, db, mut config) = open().await;
        let write = [
            "stock-in", "--item-code", "SCREW-M4", "--location-code", "A-01", "-q", "3",
        ];

        let err = run(&db, &config, &write).await.unwrap_err();
        assert!(err.to_string().contains("no operator"));

        config.operator = Some("keeper".to_string());
        run(&db, &config, &["catalog", "add-item", "--code", "SCREW-M4", "--name", "M4 screw"])
            .await
            .unwrap();
        run(&db, &config, &["catalog", "add-location", "--code", "A-01", "--name", "Shelf A1"])
            .await
            .unwrap();

        let record = run(&db, &config, &write).await.unwrap();
        assert_eq!(record["quantity"], 3);
        assert_eq!(record["operator_id"], "keeper");
    }

    #[tokio::test]
    async fn test_command_round_trip() {
        let (_dir, db, mut config) = open().await;

        let init = run(&db, &config, &["init"]).await.unwrap();
        assert_eq!(init["migrations_total"], init["migrations_applied"]);

        let user = run(&db, &config, &["catalog", "add-user", "--username", "keeper", "--name", "Keeper"])
            .await
            .unwrap();
        let user_id = user["id"].as_str().unwrap().to_string();
        config.operator = Some(user_id.clone());

        run(&db, &config, &["catalog", "add-item", "--code", "CB-001", "--name", "Cat6", "--min-stock", "5"])
            .await
            .unwrap();
        run(&db, &config, &["catalog", "add-location", "--code", "A-01", "--name", "Shelf A1"])
            .await
            .unwrap();

        run(&db, &config, &["stock-in", "--item-code", "CB-001", "--location-code", "A-01", "-q", "10"])
            .await
            .unwrap();
        let borrow = run(
            &db,
            &config,
            &[
                "borrow", "--item-code", "CB-001", "--location-code", "A-01", "-q", "4",
                "--borrower", user_id.as_str(),
            ],
        )
        .await
        .unwrap();

        let err = run(&db, &config, &["stock-out", "--item-code", "CB-001", "--location-code", "A-01", "-q", "7"])
            .await
            .unwrap_err();
        assert!(is_rejection(&err));

        let low = run(&db, &config, &["low-stock"]).await.unwrap();
        assert_eq!(low.as_array().unwrap().len(), 0);

        let borrow_id = borrow["id"].as_str().unwrap().to_string();
        run(&db, &config, &["return", borrow_id.as_str()]).await.unwrap();
        let err = run(&db, &config, &["return", borrow_id.as_str()]).await.unwrap_err();
        assert!(is_rejection(&err));

        let outstanding = run(&db, &config, &["borrows", "--status", "borrowed"]).await.unwrap();
        assert_eq!(outstanding.as_array().unwrap().len(), 0);

        let flow = run(&db, &config, &["flow", "--item-code", "CB-001", "--type", "return"])
            .await
            .unwrap();
        assert_eq!(flow.as_array().unwrap().len(), 1);
        assert_eq!(flow[0]["item_code"], "CB-001");

        let dashboard = run(&db, &config, &["dashboard"]).await.unwrap();
        assert_eq!(dashboard["total_stock_quantity"], 10);
        assert_eq!(dashboard["in_out_trend"].as_array().unwrap().len(), 30);

        let audit = run(&db, &config, &["audit"]).await.unwrap();
        assert_eq!(audit["consistent"], true);
    }

    #[tokio::test]
    async fn test_unknown_flow_code_is_rejection() {
        let (_dir, db, config) = open().await;
        let err = run(&db, &config, &["flow", "--item-code", "NOPE"]).await.unwrap_err();
        assert!(is_rejection(&err));
    }
}

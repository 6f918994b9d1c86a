//! # depot
//!
//! Operator command line for the Depot stock ledger.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           depot (binary)                                │
//! │                                                                         │
//! │  args ──► DepotConfig::load ──► tracing (stderr)                       │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │           Database::new ──► commands::execute ──► JSON (stdout)        │
//! │                                                                         │
//! │  Exit codes: 0 ok, 1 failure, 2 rejected request                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```bash
//! depot init
//! depot stock-in --item-code SCREW-M4 --location-code A-01 -q 100 --operator <id>
//! depot flow --type out --from 2026-01-01 --to 2026-01-31
//! RUST_LOG=depot_db=debug depot dashboard
//! ```

mod commands;
mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use depot_db::Database;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::commands::{AuditMismatch, Command};
use crate::config::DepotConfig;

#[derive(Debug, Parser)]
#[command(name = "depot")]
#[command(about = "Stock ledger for items, locations and loans")]
#[command(version)]
struct Cli {
    /// Config file (default: platform config dir, depot.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overriding config and DEPOT_DB_PATH
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match DepotConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(db) = cli.db {
        config.database.path = db;
    }

    init_tracing(&config.log.level);

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(mismatch) = err.downcast_ref::<AuditMismatch>() {
                if let Ok(body) = serde_json::to_string_pretty(&mismatch.discrepancies) {
                    println!("{}", body);
                }
            }
            eprintln!("error: {:#}", err);
            if commands::is_rejection(&err) {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

async fn run(command: Command, config: &DepotConfig) -> anyhow::Result<()> {
    let path = &config.database.path;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let db = Database::new(config.db_config())
        .await
        .with_context(|| format!("opening {}", path.display()))?;
    info!(path = %path.display(), "Store opened");

    let output = commands::execute(command, &db, config).await;
    db.close().await;

    println!("{}", serde_json::to_string_pretty(&output?)?);
    Ok(())
}

/// Logs go to stderr; `RUST_LOG` wins over the configured level.
fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_db_flag() {
        let cli = Cli::try_parse_from(["depot", "stock", "--db", "/tmp/depot.db"]).unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/depot.db")));
        assert!(matches!(cli.command, Command::Stock));
    }
}

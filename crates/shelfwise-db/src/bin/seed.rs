//! # Master Data Seeder
//!
//! Creates (or opens) a database, applies migrations and seeds master data.
//!
//! ## Usage
//! ```bash
//! # Seed ./shelfwise.db
//! cargo run -p shelfwise-db --bin seed
//!
//! # Specify database path and member count
//! cargo run -p shelfwise-db --bin seed -- --db ./data/store.db --customers 100
//! ```
//!
//! Refuses to seed a database that already has products.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use shelfwise_db::seed::{seed_master_data_with, SeedOptions};
use shelfwise_db::{Database, DbConfig, DbResult};

#[derive(Debug, Parser)]
#[command(name = "seed", about = "Seed Shelfwise master data")]
struct Args {
    /// Database file path
    #[arg(short, long, env = "SHELFWISE_DB", default_value = "./shelfwise.db")]
    db: PathBuf,

    /// Number of loyalty members to create
    #[arg(short, long, default_value_t = 30)]
    customers: usize,

    /// Seed for price and shelf-life variation
    #[arg(long, default_value_t = 7)]
    rng_seed: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,shelfwise=debug,sqlx=warn")),
        )
        .init();

    let args = Args::parse();
    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Seeding failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> DbResult<()> {
    info!(path = %args.db.display(), "Opening database");
    let db = Database::new(DbConfig::new(&args.db)).await?;

    let options = SeedOptions {
        customers: args.customers,
        rng_seed: args.rng_seed,
    };
    let report = seed_master_data_with(&db, &options).await?;

    if report.skipped {
        info!("Database already has products; delete it to regenerate");
    } else {
        info!(
            categories = report.categories,
            suppliers = report.suppliers,
            shelves = report.shelves,
            employees = report.employees,
            customers = report.customers,
            products = report.products,
            discount_rules = report.discount_rules,
            "Seed complete"
        );
    }

    db.close().await;
    Ok(())
}

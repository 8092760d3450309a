//! # Simulation Driver
//!
//! Runs the replenishment and sales simulation over a date range.
//!
//! ## Usage
//! ```bash
//! # Thirty days against ./shelfwise.db, seeding master data if needed
//! cargo run -p shelfwise-engine --bin simulate -- \
//!     --start 2025-09-01 --end 2025-09-30 --seed
//!
//! # Re-run the same month from scratch, reproducibly, as JSON
//! cargo run -p shelfwise-engine --bin simulate -- \
//!     --start 2025-09-01 --end 2025-09-30 --clear --rng-seed 42 --json
//! ```
//!
//! Settings come from defaults, then `engine.toml`, then `SHELFWISE_*`
//! variables, then the flags below.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use shelfwise_core::validation::parse_date;
use shelfwise_db::{seed_master_data, Database};
use shelfwise_engine::{EngineConfig, EngineResult, ReplenishmentController};

#[derive(Debug, Parser)]
#[command(name = "simulate", about = "Run the Shelfwise inventory simulation")]
struct Args {
    /// First simulated day (YYYY-MM-DD)
    #[arg(long)]
    start: Option<String>,

    /// Last simulated day, inclusive (YYYY-MM-DD)
    #[arg(long)]
    end: Option<String>,

    /// Database file path (`:memory:` for a throwaway run)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Engine config file (defaults to the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Delete earlier simulation output before running
    #[arg(long)]
    clear: bool,

    /// Seed master data when the product table is empty
    #[arg(long)]
    seed: bool,

    /// Fixed seed for a reproducible run
    #[arg(long)]
    rng_seed: Option<u64>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
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
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, config_error = e.is_config_error(), "Simulation failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> EngineResult<()> {
    let mut config = EngineConfig::load(args.config.clone())?;
    apply_args(&mut config, &args)?;
    config.validate()?;
    let (start, end) = config.date_range()?;

    info!(path = %config.database.path.display(), "Opening database");
    let db = Arc::new(Database::new(config.database.db_config()).await?);

    if config.simulation.seed_master_data {
        let report = seed_master_data(&db).await?;
        if !report.skipped {
            info!(products = report.products, customers = report.customers, "Seeded master data");
        }
    }

    if config.simulation.clear {
        let report = db.maintenance().clear_simulation_data().await?;
        info!(
            rows = report.total_rows(),
            customers_reset = report.customers_reset,
            "Cleared earlier simulation data"
        );
    } else if db.reports().documents_in_range(start, end).await? {
        warn!(
            %start,
            %end,
            "Documents already exist in this range; pass --clear to start over"
        );
    }

    let summary = ReplenishmentController::prepare(db.clone(), config)
        .await?
        .run()
        .await?;

    if args.json {
        println!("{}", summary.to_json()?);
    } else {
        println!("{summary}");
    }

    db.close().await;
    Ok(())
}

/// Layers command-line flags over the loaded configuration.
fn apply_args(config: &mut EngineConfig, args: &Args) -> EngineResult<()> {
    if let Some(start) = &args.start {
        config.simulation.start_date = Some(parse_date("--start", start)?);
    }
    if let Some(end) = &args.end {
        config.simulation.end_date = Some(parse_date("--end", end)?);
    }
    if let Some(path) = &args.db {
        config.database.path = path.clone();
    }
    if let Some(seed) = args.rng_seed {
        config.simulation.rng_seed = Some(seed);
    }
    config.simulation.clear |= args.clear;
    config.simulation.seed_master_data |= args.seed;
    Ok(())
}

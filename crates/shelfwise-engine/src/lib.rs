//! # shelfwise-engine: Simulation Engine for Shelfwise
//!
//! Runs the retail simulation: a warehouse feeding category shelves, daily
//! reorders and restocks, expiry markdowns, and synthetic sales.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Engine Architecture                            │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │              ReplenishmentController (daily loop)                │  │
//! │  │                                                                  │  │
//! │  │  ControllerState: daily target + last reorder per product        │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │     ┌──────────────┬──────────┼──────────────┬──────────────┐          │
//! │     ▼              ▼          ▼              ▼              ▼           │
//! │  ┌────────┐  ┌──────────┐  ┌──────────┐  ┌─────────┐  ┌───────────┐   │
//! │  │ Order  │  │ Transfer │  │ Discount │  │ Sales   │  │ Scenario  │   │
//! │  │Executor│  │ Executor │  │ Engine   │  │ Engine  │  │ Injector  │   │
//! │  └───┬────┘  └────┬─────┘  └────┬─────┘  └────┬────┘  └─────┬─────┘   │
//! │      └────────────┴─────────────┴─────────────┴─────────────┘          │
//! │                               │ one transaction per step                │
//! │                               ▼                                         │
//! │                     shelfwise-db (SQLite)                               │
//! │                                                                         │
//! │  CatalogSnapshot: master data read once per run, shared via Arc        │
//! │  RunSummary: documents and inventory health after the last day         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - Engine configuration (TOML, env, CLI)
//! - [`error`] - Engine error types
//! - [`catalog`] - Master data snapshot
//! - [`order`] - Purchase orders and warehouse receipts
//! - [`transfer`] - Warehouse-to-shelf transfers
//! - [`discount`] - Near-expiry markdowns
//! - [`sales`] - Synthetic customer transactions
//! - [`scenarios`] - End-of-run expiry and stock-out injection
//! - [`controller`] - The daily control loop
//! - [`summary`] - End-of-run report
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use shelfwise_db::Database;
//! use shelfwise_engine::{EngineConfig, ReplenishmentController};
//!
//! let config = EngineConfig::load(None)?;
//! let db = Arc::new(Database::new(config.database.db_config()).await?);
//!
//! let summary = ReplenishmentController::prepare(db, config).await?.run().await?;
//! println!("{summary}");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod config;
pub mod controller;
pub mod discount;
pub mod error;
pub mod order;
pub mod sales;
pub mod scenarios;
pub mod summary;
pub mod transfer;

// =============================================================================
// Re-exports
// =============================================================================

pub use catalog::CatalogSnapshot;
pub use config::EngineConfig;
pub use controller::ReplenishmentController;
pub use discount::{DiscountEngine, DiscountReport};
pub use error::{EngineError, EngineResult};
pub use order::{OrderExecutor, PlacedOrder};
pub use sales::{SaleOutcome, SalesDayReport, SalesEngine};
pub use scenarios::{ScenarioInjector, ScenarioReport};
pub use summary::{RunActivity, RunSummary};
pub use transfer::{TransferExecutor, TransferOutcome};

//! # shelfwise-db: Persistence Layer for Shelfwise
//!
//! SQLite storage for the simulation engine, built on sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shelfwise Data Flow                              │
//! │                                                                         │
//! │  shelfwise-engine (controller, executors)                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  shelfwise-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │    │ catalog, batch │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ aggregate, seq │    │ 001_initial  │  │   │
//! │  │   │ begin() → tx  │    │ order, invoice │    │  _schema.sql │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            SQLite (file with WAL, or :memory: in tests)         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repositories and transactional store functions
//! - [`seed`] - Master data for an empty database
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shelfwise_db::{Database, DbConfig};
//! use shelfwise_db::repository::batch;
//!
//! let db = Database::new(DbConfig::new("shelfwise.db")).await?;
//! let products = db.catalog().products().await?;
//!
//! let mut tx = db.begin().await?;
//! batch::consume_warehouse_batch(&mut tx, batch_id, 5).await?;
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod seed;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::aggregate::AggregateRepository;
pub use repository::batch::{BatchRepository, NewWarehouseBatch, ShelfStock};
pub use repository::catalog::CatalogRepository;
pub use repository::customer::CustomerRepository;
pub use repository::discount::DiscountRuleRepository;
pub use repository::invoice::{InvoiceRepository, NewSalesInvoice};
pub use repository::maintenance::{ClearReport, MaintenanceRepository};
pub use repository::order::{NewPurchaseOrder, OrderRepository};
pub use repository::report::{
    InvoiceStats, OrderStats, ProductRevenue, ReportRepository, StockLevel, StockValue,
    TransferStats,
};
pub use repository::sequence::SequenceRepository;
pub use repository::transfer::{NewStockTransfer, TransferRepository};
pub use seed::{seed_master_data, SeedReport};

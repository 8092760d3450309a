//! # shelfwise-core: Pure Inventory Logic for Shelfwise
//!
//! This crate holds every decision the replenishment engine makes that does
//! not need a database: money arithmetic, FIFO allocation, aggregate folding,
//! expiry and discount rules, document codes and replenishment thresholds.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Shelfwise Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 simulate / seed binaries                        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 shelfwise-engine                                │   │
//! │  │   controller ──► order / transfer / discount / sales executors  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ shelfwise-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   money   │  │ inventory │  │ discount  │  │   codes   │  │   │
//! │  │   │  Money    │  │ FIFO plan │  │ best rule │  │ PO/ST/INV │  │   │
//! │  │   │  rates    │  │ aggregate │  │ markdown  │  │  batches  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────────────────────┐ │   │
//! │  │   │  expiry   │  │ documents │  │      replenishment        │ │   │
//! │  │   └───────────┘  └───────────┘  └───────────────────────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • RNG PASSED IN BY CALLER     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 shelfwise-db (Database Layer)                   │   │
//! │  │         SQLite queries, migrations, repositories, seeding       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Catalog records and rate types
//! - [`money`] - Money type with integer arithmetic
//! - [`inventory`] - Batches, shelf aggregate, FIFO allocation
//! - [`documents`] - Orders, transfers, invoices and invoice arithmetic
//! - [`expiry`] - Expiry date policy for received stock
//! - [`discount`] - Rule matching and markdown pricing
//! - [`codes`] - Document and batch code formats
//! - [`replenishment`] - Demand bands, thresholds, controller state
//! - [`error`] - Domain error types
//! - [`validation`] - Master-data and parameter checks
//!
//! ## Example Usage
//!
//! ```rust
//! use shelfwise_core::money::Money;
//! use shelfwise_core::types::DiscountRate;
//!
//! let import = Money::from_units(10_000);
//! let price = import.apply_discount(DiscountRate::from_percent(20));
//! assert_eq!(price.units(), 8_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod codes;
pub mod discount;
pub mod documents;
pub mod error;
pub mod expiry;
pub mod inventory;
pub mod money;
pub mod replenishment;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use codes::CodeSeries;
pub use documents::*;
pub use error::{CoreError, CoreResult, ValidationError};
pub use inventory::*;
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// VAT charged on every synthesized sale: 10%.
pub const DEFAULT_TAX_RATE: types::TaxRate = types::TaxRate::from_bps(1_000);

/// One loyalty point per this many currency units paid.
pub const POINTS_DIVISOR: i64 = 10_000;

/// Days ahead counted as near-expiry by the aggregate and the run summary.
pub const NEAR_EXPIRY_WINDOW_DAYS: i64 = 7;

/// Days ahead the discount engine considers.
pub const DISCOUNT_WINDOW_DAYS: i64 = 30;

/// Planogram capacity given to every product's shelf slot.
pub const DEFAULT_LAYOUT_MAX_QUANTITY: i64 = 200;

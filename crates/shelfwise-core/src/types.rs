//! # Catalog Types
//!
//! Master records the engine reads but never creates: products, categories,
//! suppliers, warehouses, shelves, employees, customers and discount rules.
//! Plus the two rate types (tax and discount) expressed in basis points.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Catalog Types                                  │
//! │                                                                         │
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────┐              │
//! │  │   Category   │◄───│   Product    │───►│   Supplier   │              │
//! │  │  id, name    │    │ import/sell  │    │  id, name    │              │
//! │  └──────┬───────┘    │ shelf_life   │    └──────────────┘              │
//! │         │            └──────────────┘                                   │
//! │         │                                                               │
//! │  ┌──────▼───────┐    ┌──────────────┐    ┌──────────────┐              │
//! │  │ DisplayShelf │    │ DiscountRule │    │   Employee   │              │
//! │  │ category_id  │    │ days ≥ d →   │    │  role: Mgr,  │              │
//! │  └──────────────┘    │   bps off    │    │  Cashier, .. │              │
//! │                      └──────────────┘    └──────────────┘              │
//! │                                                                         │
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────┐              │
//! │  │  Warehouse   │    │   Customer   │    │ ShelfLayout  │              │
//! │  └──────────────┘    │ spending,pts │    │ max_quantity │              │
//! │                      └──────────────┘    └──────────────┘              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every record is keyed by its SQLite rowid (`i64`). Human-readable codes
//! (`product_code`, `shelf_code`, ...) are unique but only used for display.

use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000, so 1000 bps = 10% VAT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[serde(transparent)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Discount Rate
// =============================================================================

/// A markdown percentage in basis points (5000 = 50% off).
///
/// Valid range is 0..=10000; [`crate::validation::validate_discount_rule`]
/// rejects anything else before it reaches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[serde(transparent)]
pub struct DiscountRate(u32);

impl DiscountRate {
    /// Upper bound: 100% off.
    pub const MAX_BPS: u32 = 10_000;

    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        DiscountRate(bps)
    }

    /// Convenience for whole percentages (`from_percent(20)` = 2000 bps).
    #[inline]
    pub const fn from_percent(pct: u32) -> Self {
        DiscountRate(pct * 100)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        DiscountRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for DiscountRate {
    fn default() -> Self {
        DiscountRate::zero()
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product the store buys from a supplier and sells from a shelf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,

    /// Business identifier shown in reports.
    pub product_code: String,

    pub name: String,

    pub category_id: i64,

    pub supplier_id: i64,

    /// Selling unit ("can", "kg", "box").
    pub unit: String,

    /// Cost per unit paid to the supplier.
    pub import_price: Money,

    /// List price on the shelf before markdowns. Always above `import_price`.
    pub selling_price: Money,

    /// Days from receipt to expiry. `None` falls back to the policy default.
    pub shelf_life_days: Option<i64>,

    /// Warehouse quantity under which the product counts as low stock.
    pub low_stock_threshold: i64,

    pub is_active: bool,
}

// =============================================================================
// Category / Supplier / Warehouse / Shelf
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Supplier {
    pub id: i64,
    pub supplier_code: String,
    pub name: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Warehouse {
    pub id: i64,
    pub warehouse_code: String,
    pub name: String,
}

/// A display shelf. Each shelf serves exactly one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DisplayShelf {
    pub id: i64,
    pub shelf_code: String,
    pub name: String,
    pub category_id: i64,
    pub is_active: bool,
}

/// Planogram slot for a product on a shelf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ShelfLayout {
    pub id: i64,
    pub shelf_id: i64,
    pub product_id: i64,
    pub position_code: String,
    pub max_quantity: i64,
}

// =============================================================================
// Employee
// =============================================================================

/// What an employee is allowed to do in the engine.
///
/// ```text
/// Manager / Supervisor ──► place purchase orders
/// Warehouse            ──► execute stock transfers
/// Cashier              ──► ring up sales invoices
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum EmployeeRole {
    Manager,
    Supervisor,
    Cashier,
    Warehouse,
}

impl EmployeeRole {
    /// Roles allowed to sign purchase orders.
    pub fn can_order(&self) -> bool {
        matches!(self, EmployeeRole::Manager | EmployeeRole::Supervisor)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EmployeeRole::Manager => "manager",
            EmployeeRole::Supervisor => "supervisor",
            EmployeeRole::Cashier => "cashier",
            EmployeeRole::Warehouse => "warehouse",
        }
    }
}

impl std::fmt::Display for EmployeeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Employee {
    pub id: i64,
    pub employee_code: String,
    pub full_name: String,
    pub role: EmployeeRole,
    pub is_active: bool,
}

// =============================================================================
// Customer
// =============================================================================

/// A loyalty member. Spending and points only ever grow from sales.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: i64,
    pub customer_code: String,
    pub full_name: Option<String>,
    pub membership_level_id: Option<i64>,
    pub total_spending: Money,
    pub loyalty_points: i64,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct MembershipLevel {
    pub id: i64,
    pub name: String,
    pub min_spending: Money,
}

// =============================================================================
// Discount Rule
// =============================================================================

/// Markdown rule for a category: batches with at most `days_before_expiry`
/// days left get `discount` off their import price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DiscountRule {
    pub id: i64,
    pub category_id: i64,
    pub days_before_expiry: i64,
    pub discount: DiscountRate,
    pub rule_name: Option<String>,
    pub is_active: bool,
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Documents
//!
//! Purchase orders, stock transfers and sales invoices: the three documents
//! the engine writes. Each is immutable once its transaction commits.
//!
//! ## Invoice Arithmetic
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  line.subtotal   = unit_price × quantity                                │
//! │  subtotal        = Σ line.subtotal                                      │
//! │  taxable         = subtotal − discount_amount                           │
//! │  tax_amount      = taxable × tax_rate          (half-up, integer bps)   │
//! │  total_amount    = subtotal − discount_amount + tax_amount              │
//! │  points_earned   = floor(total_amount / points_divisor)   members only  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`InvoiceTotals::compute`] is the single place these numbers are derived.

use chrono::{NaiveDate, NaiveDateTime};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{DiscountRate, TaxRate};

// =============================================================================
// Purchase Orders
// =============================================================================

/// Lifecycle of a purchase order. The simulation receives goods on the day
/// they are ordered, so it only ever writes `Received`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Received,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PurchaseOrder {
    pub id: i64,
    pub order_no: String,
    pub supplier_id: i64,
    pub employee_id: i64,
    pub order_date: NaiveDate,
    pub delivery_date: Option<NaiveDate>,
    pub status: OrderStatus,
    pub total_amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PurchaseOrderDetail {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: Money,
    pub subtotal: Money,
}

/// A requested order line before it is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLine {
    pub product_id: i64,
    pub quantity: i64,
}

/// Sums line subtotals into an order total.
pub fn order_total(lines: impl IntoIterator<Item = (Money, i64)>) -> Money {
    lines
        .into_iter()
        .map(|(price, qty)| price.multiply_quantity(qty))
        .sum()
}

// =============================================================================
// Stock Transfers
// =============================================================================

/// One warehouse → shelf movement of a single batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockTransfer {
    pub id: i64,
    pub transfer_code: String,
    pub product_id: i64,
    pub from_warehouse_id: i64,
    pub to_shelf_id: i64,
    pub quantity: i64,
    pub transfer_date: NaiveDate,
    pub employee_id: i64,
    pub batch_code: String,
    pub expiry_date: Option<NaiveDate>,
    pub import_price: Money,
    pub selling_price: Money,
}

// =============================================================================
// Sales Invoices
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    Voucher,
}

impl PaymentMethod {
    /// Draws a tender type: cash 40%, card 30%, transfer 20%, voucher 10%.
    pub fn draw<R: Rng + ?Sized>(rng: &mut R) -> PaymentMethod {
        match rng.gen_range(0..100) {
            0..=39 => PaymentMethod::Cash,
            40..=69 => PaymentMethod::Card,
            70..=89 => PaymentMethod::Transfer,
            _ => PaymentMethod::Voucher,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SalesInvoice {
    pub id: i64,
    pub invoice_no: String,
    pub customer_id: Option<i64>,
    pub employee_id: i64,
    pub invoice_date: NaiveDateTime,
    pub subtotal: Money,
    pub discount_amount: Money,
    pub tax_amount: Money,
    pub total_amount: Money,
    pub points_earned: i64,
    pub points_used: i64,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SalesInvoiceDetail {
    pub id: i64,
    pub invoice_id: i64,
    pub product_id: i64,
    pub shelf_batch_id: i64,
    pub batch_code: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub discount: DiscountRate,
    pub subtotal: Money,
}

/// A fulfilled line collected while building an invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceLine {
    pub product_id: i64,
    pub shelf_batch_id: i64,
    pub batch_code: String,
    pub quantity: i64,
    pub unit_price: Money,
    /// Markdown already baked into `unit_price`, recorded for reporting.
    pub discount: DiscountRate,
}

impl InvoiceLine {
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

/// Header amounts derived from a set of invoice lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub subtotal: Money,
    pub discount_amount: Money,
    pub tax_amount: Money,
    pub total_amount: Money,
}

impl InvoiceTotals {
    /// Computes header amounts.
    ///
    /// Fails with `NoFulfillableLineItems` when `lines` is empty; an invoice
    /// without lines must never be persisted. A discount larger than the
    /// subtotal is clamped so the taxable base never goes negative.
    pub fn compute(
        invoice_no: &str,
        lines: &[InvoiceLine],
        discount_amount: Money,
        tax_rate: TaxRate,
    ) -> CoreResult<InvoiceTotals> {
        if lines.is_empty() {
            return Err(CoreError::NoFulfillableLineItems {
                invoice_no: invoice_no.to_string(),
            });
        }

        let subtotal: Money = lines.iter().map(InvoiceLine::subtotal).sum();
        let discount_amount = discount_amount.max(Money::zero()).min(subtotal);
        let tax_amount = (subtotal - discount_amount).calculate_tax(tax_rate);

        Ok(InvoiceTotals {
            subtotal,
            discount_amount,
            tax_amount,
            total_amount: subtotal - discount_amount + tax_amount,
        })
    }
}

/// Loyalty points accrued for a paid total: `floor(total / divisor)`.
pub fn loyalty_points(total: Money, divisor: i64) -> i64 {
    total.div_floor(divisor).max(0)
}

// =============================================================================
// Unit Tests
// =============================================================================

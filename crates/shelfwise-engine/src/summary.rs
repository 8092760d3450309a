//! # Run Summary
//!
//! Re-reads the store after the last simulated day and reports what the run
//! produced and what state the inventory was left in.
//!
//! ```text
//! ┌──────────────────────────────┬──────────────────────────────────────────┐
//! │ Documents (start..=end)      │ Inventory health (as of end)             │
//! ├──────────────────────────────┼──────────────────────────────────────────┤
//! │ orders     count, value      │ expired shelf batches                    │
//! │ transfers  count, units      │ near-expiry shelf batches (window)       │
//! │ invoices   count, revenue,   │ out-of-stock products (warehouse = 0)    │
//! │            average,          │ low-stock products (0 < wh < threshold)  │
//! │            discounts         │ stock value, shelf and warehouse         │
//! │ top products by revenue      │                                          │
//! └──────────────────────────────┴──────────────────────────────────────────┘
//! ```

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::EngineResult;
use shelfwise_core::Money;
use shelfwise_db::{
    Database, InvoiceStats, OrderStats, ProductRevenue, StockLevel, StockValue, TransferStats,
};

/// Number of products listed as best sellers.
pub const TOP_PRODUCTS: i64 = 5;

/// Counters the controller keeps while the run is in progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunActivity {
    pub days: usize,
    pub reorders: usize,
    pub reorders_failed: usize,
    pub restocks: usize,
    pub restocks_failed: usize,
    pub sales_attempted: usize,
    pub sales_aborted: usize,
    pub batches_discounted: usize,
    pub scenario_days: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub activity: RunActivity,
    pub orders: OrderStats,
    pub transfers: TransferStats,
    pub invoices: InvoiceStats,
    pub average_invoice: Money,
    /// Header discounts plus markdowns given at the till.
    pub discounts: Money,
    pub expired_batches: i64,
    pub near_expiry_batches: i64,
    pub out_of_stock: Vec<StockLevel>,
    pub low_stock: Vec<StockLevel>,
    pub top_products: Vec<ProductRevenue>,
    pub stock_value: StockValue,
}

impl RunSummary {
    /// Builds the summary from the store.
    pub async fn collect(
        db: &Database,
        start: NaiveDate,
        end: NaiveDate,
        near_expiry_window_days: i64,
        activity: RunActivity,
    ) -> EngineResult<Self> {
        let reports = db.reports();
        let invoices = reports.invoice_stats(start, end).await?;

        Ok(RunSummary {
            start,
            end,
            activity,
            orders: reports.order_stats(start, end).await?,
            transfers: reports.transfer_stats(start, end).await?,
            average_invoice: invoices.average(),
            discounts: invoices.discount_total + invoices.markdown_total,
            invoices,
            expired_batches: reports.expired_batches(end).await?,
            near_expiry_batches: reports.near_expiry_batches(end, near_expiry_window_days).await?,
            out_of_stock: reports.out_of_stock_products().await?,
            low_stock: reports.low_stock_products().await?,
            top_products: reports.top_products(start, end, TOP_PRODUCTS).await?,
            stock_value: reports.stock_value().await?,
        })
    }

    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Simulation {} .. {} ({} days)", self.start, self.end, self.activity.days)?;
        writeln!(f)?;
        writeln!(f, "Documents")?;
        writeln!(
            f,
            "  purchase orders   {:>8}   value {:>15}",
            self.orders.count, self.orders.total_value
        )?;
        writeln!(
            f,
            "  stock transfers   {:>8}   units {:>15}",
            self.transfers.count, self.transfers.units
        )?;
        writeln!(
            f,
            "  sales invoices    {:>8}   revenue {:>13}",
            self.invoices.count, self.invoices.revenue
        )?;
        writeln!(f, "  average invoice   {:>8}", self.average_invoice)?;
        writeln!(f, "  discounts given   {:>8}", self.discounts)?;
        writeln!(f)?;
        writeln!(f, "Activity")?;
        writeln!(
            f,
            "  reorders {} ({} failed), restocks {} ({} failed)",
            self.activity.reorders,
            self.activity.reorders_failed,
            self.activity.restocks,
            self.activity.restocks_failed
        )?;
        writeln!(
            f,
            "  sales attempted {}, aborted {}",
            self.activity.sales_attempted, self.activity.sales_aborted
        )?;
        writeln!(f)?;
        writeln!(f, "Inventory health at {}", self.end)?;
        writeln!(f, "  expired shelf batches      {}", self.expired_batches)?;
        writeln!(f, "  near-expiry shelf batches  {}", self.near_expiry_batches)?;
        writeln!(f, "  out-of-stock products      {}", self.out_of_stock.len())?;
        for level in &self.out_of_stock {
            writeln!(f, "    {}", level.product_code)?;
        }
        writeln!(f, "  low-stock products         {}", self.low_stock.len())?;
        for level in &self.low_stock {
            writeln!(
                f,
                "    {} ({} < {})",
                level.product_code, level.warehouse_quantity, level.low_stock_threshold
            )?;
        }
        writeln!(f, "  shelf stock value          {}", self.stock_value.shelf_value)?;
        writeln!(f, "  warehouse stock value      {}", self.stock_value.warehouse_value)?;

        if !self.top_products.is_empty() {
            writeln!(f)?;
            writeln!(f, "Top products")?;
            for (rank, p) in self.top_products.iter().enumerate() {
                writeln!(
                    f,
                    "  {}. {:<10} {:<24} {:>6} units {:>15}",
                    rank + 1,
                    p.product_code,
                    p.name,
                    p.units,
                    p.revenue
                )?;
            }
        }
        Ok(())
    }
}

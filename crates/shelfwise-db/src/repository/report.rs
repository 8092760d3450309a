//! # Report Repository
//!
//! Read-only queries behind the end-of-run summary.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  documents (dated range)          inventory health (as of a day)        │
//! │  ───────────────────────          ─────────────────────────────         │
//! │  order_stats                      expired_batches                       │
//! │  transfer_stats                   near_expiry_batches                   │
//! │  invoice_stats                    out_of_stock_products                 │
//! │  top_products                     low_stock_products                    │
//! │  documents_in_range               stock_value                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::error::DbResult;
use shelfwise_core::Money;

/// Purchase order totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, FromRow)]
pub struct OrderStats {
    pub count: i64,
    pub total_value: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, FromRow)]
pub struct TransferStats {
    pub count: i64,
    pub units: i64,
}

/// Sales invoice totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, FromRow)]
pub struct InvoiceStats {
    pub count: i64,
    pub revenue: Money,
    /// Header-level discounts.
    pub discount_total: Money,
    /// List price minus sold price, over lines sold at a markdown.
    pub markdown_total: Money,
}

impl InvoiceStats {
    /// Revenue per invoice, floored. Zero when nothing was sold.
    pub fn average(&self) -> Money {
        if self.count == 0 {
            Money::zero()
        } else {
            Money::from_units(self.revenue.div_floor(self.count))
        }
    }
}

/// A product line in the top-sellers list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct ProductRevenue {
    pub product_id: i64,
    pub product_code: String,
    pub name: String,
    pub units: i64,
    pub revenue: Money,
}

/// A product with little or no warehouse stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct StockLevel {
    pub product_id: i64,
    pub product_code: String,
    pub warehouse_quantity: i64,
    pub low_stock_threshold: i64,
}

/// Stock on hand valued at import price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, FromRow)]
pub struct StockValue {
    pub shelf_value: Money,
    pub warehouse_value: Money,
}

/// Repository for summary reads.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    pub async fn order_stats(&self, start: NaiveDate, end: NaiveDate) -> DbResult<OrderStats> {
        let stats = sqlx::query_as::<_, OrderStats>(
            r#"
            SELECT COUNT(*) AS count, COALESCE(SUM(total_amount), 0) AS total_value
            FROM purchase_orders
            WHERE order_date BETWEEN ?1 AND ?2
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    pub async fn transfer_stats(&self, start: NaiveDate, end: NaiveDate) -> DbResult<TransferStats> {
        let stats = sqlx::query_as::<_, TransferStats>(
            r#"
            SELECT COUNT(*) AS count, COALESCE(SUM(quantity), 0) AS units
            FROM stock_transfers
            WHERE transfer_date BETWEEN ?1 AND ?2
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    pub async fn invoice_stats(&self, start: NaiveDate, end: NaiveDate) -> DbResult<InvoiceStats> {
        let stats = sqlx::query_as::<_, InvoiceStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM sales_invoices
                  WHERE date(invoice_date) BETWEEN ?1 AND ?2) AS count,
                (SELECT COALESCE(SUM(total_amount), 0) FROM sales_invoices
                  WHERE date(invoice_date) BETWEEN ?1 AND ?2) AS revenue,
                (SELECT COALESCE(SUM(discount_amount), 0) FROM sales_invoices
                  WHERE date(invoice_date) BETWEEN ?1 AND ?2) AS discount_total,
                (SELECT COALESCE(SUM(MAX(p.selling_price - d.unit_price, 0) * d.quantity), 0)
                   FROM sales_invoice_details d
                   JOIN sales_invoices i ON i.id = d.invoice_id
                   JOIN products p ON p.id = d.product_id
                  WHERE d.discount > 0
                    AND date(i.invoice_date) BETWEEN ?1 AND ?2) AS markdown_total
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    /// Best sellers by line revenue, highest first.
    pub async fn top_products(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        limit: i64,
    ) -> DbResult<Vec<ProductRevenue>> {
        let rows = sqlx::query_as::<_, ProductRevenue>(
            r#"
            SELECT p.id AS product_id, p.product_code, p.name,
                   SUM(d.quantity) AS units, SUM(d.subtotal) AS revenue
            FROM sales_invoice_details d
            JOIN sales_invoices i ON i.id = d.invoice_id
            JOIN products p ON p.id = d.product_id
            WHERE date(i.invoice_date) BETWEEN ?1 AND ?2
            GROUP BY p.id
            ORDER BY revenue DESC, p.id
            LIMIT ?3
            "#,
        )
        .bind(start)
        .bind(end)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Shelf batches with stock whose expiry is before `as_of`.
    pub async fn expired_batches(&self, as_of: NaiveDate) -> DbResult<i64> {
        let n: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM shelf_batches
            WHERE quantity > 0 AND expiry_date IS NOT NULL AND expiry_date < ?1
            "#,
        )
        .bind(as_of)
        .fetch_one(&self.pool)
        .await?;
        Ok(n)
    }

    /// Shelf batches with stock expiring in `[as_of, as_of + window]`.
    pub async fn near_expiry_batches(&self, as_of: NaiveDate, window_days: i64) -> DbResult<i64> {
        let until = as_of + chrono::Duration::days(window_days);
        let n: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM shelf_batches
            WHERE quantity > 0 AND expiry_date BETWEEN ?1 AND ?2
            "#,
        )
        .bind(as_of)
        .bind(until)
        .fetch_one(&self.pool)
        .await?;
        Ok(n)
    }

    /// Active products with no warehouse batch holding stock.
    pub async fn out_of_stock_products(&self) -> DbResult<Vec<StockLevel>> {
        self.stock_levels("HAVING warehouse_quantity = 0").await
    }

    /// Active products whose warehouse stock is positive but under threshold.
    pub async fn low_stock_products(&self) -> DbResult<Vec<StockLevel>> {
        self.stock_levels(
            "HAVING warehouse_quantity > 0 AND warehouse_quantity < p.low_stock_threshold",
        )
        .await
    }

    async fn stock_levels(&self, having: &str) -> DbResult<Vec<StockLevel>> {
        let sql = format!(
            r#"
            SELECT p.id AS product_id, p.product_code,
                   COALESCE(SUM(w.quantity), 0) AS warehouse_quantity,
                   p.low_stock_threshold
            FROM products p
            LEFT JOIN warehouse_batches w ON w.product_id = p.id
            WHERE p.is_active = 1
            GROUP BY p.id
            {having}
            ORDER BY p.id
            "#
        );
        let rows = sqlx::query_as::<_, StockLevel>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn stock_value(&self) -> DbResult<StockValue> {
        let value = sqlx::query_as::<_, StockValue>(
            r#"
            SELECT
                (SELECT COALESCE(SUM(quantity * import_price), 0) FROM shelf_batches) AS shelf_value,
                (SELECT COALESCE(SUM(quantity * import_price), 0) FROM warehouse_batches) AS warehouse_value
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(value)
    }

    /// Whether any order, transfer or invoice is dated inside the range.
    pub async fn documents_in_range(&self, start: NaiveDate, end: NaiveDate) -> DbResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (SELECT 1 FROM purchase_orders WHERE order_date BETWEEN ?1 AND ?2)
                OR EXISTS (SELECT 1 FROM stock_transfers WHERE transfer_date BETWEEN ?1 AND ?2)
                OR EXISTS (SELECT 1 FROM sales_invoices WHERE date(invoice_date) BETWEEN ?1 AND ?2)
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::batch::{add_warehouse_batch, NewWarehouseBatch};
    use crate::seed::seed_master_data;
    use crate::{Database, DbConfig};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, d).unwrap()
    }

    #[tokio::test]
    async fn test_empty_database_reports_zeroes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let reports = db.reports();

        let orders = reports.order_stats(day(1), day(30)).await.unwrap();
        assert_eq!(orders.count, 0);
        assert!(orders.total_value.is_zero());

        let invoices = reports.invoice_stats(day(1), day(30)).await.unwrap();
        assert_eq!(invoices.count, 0);
        assert!(invoices.average().is_zero());

        assert!(!reports.documents_in_range(day(1), day(30)).await.unwrap());
        assert_eq!(reports.expired_batches(day(1)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stock_level_buckets() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed_master_data(&db).await.unwrap();
        let products = db.catalog().products().await.unwrap();
        let warehouse = db.catalog().warehouses().await.unwrap()[0].clone();

        let low = &products[0];
        let stocked = &products[1];
        let mut tx = db.begin().await.unwrap();
        for (product, quantity) in [(low, 1), (stocked, stocked.low_stock_threshold + 50)] {
            add_warehouse_batch(
                &mut tx,
                &NewWarehouseBatch {
                    warehouse_id: warehouse.id,
                    product_id: product.id,
                    quantity,
                    import_date: day(1),
                    expiry_date: Some(day(30)),
                    import_price: product.import_price,
                },
            )
            .await
            .unwrap();
        }
        tx.commit().await.unwrap();

        let reports = db.reports();
        let out = reports.out_of_stock_products().await.unwrap();
        assert_eq!(out.len(), products.len() - 2);
        assert!(out.iter().all(|s| s.warehouse_quantity == 0));

        let low_stock = reports.low_stock_products().await.unwrap();
        assert_eq!(low_stock.len(), 1);
        assert_eq!(low_stock[0].product_id, low.id);

        let value = reports.stock_value().await.unwrap();
        assert!(value.warehouse_value.is_positive());
        assert!(value.shelf_value.is_zero());
    }
}

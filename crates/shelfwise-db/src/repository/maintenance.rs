//! # Maintenance Repository
//!
//! Wipes simulation output while keeping master data.

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Rows removed per table by [`MaintenanceRepository::clear_simulation_data`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClearReport {
    pub tables: Vec<(String, u64)>,
    pub customers_reset: u64,
}

impl ClearReport {
    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|(_, n)| n).sum()
    }
}

/// Child tables first so foreign keys never block a delete.
const SIMULATION_TABLES: [&str; 10] = [
    "sales_invoice_details",
    "sales_invoices",
    "stock_transfers",
    "purchase_order_details",
    "purchase_orders",
    "shelf_aggregates",
    "shelf_batches",
    "warehouse_batches",
    "shelf_layouts",
    "code_sequences",
];

#[derive(Debug, Clone)]
pub struct MaintenanceRepository {
    pool: SqlitePool,
}

impl MaintenanceRepository {
    /// Creates a new MaintenanceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MaintenanceRepository { pool }
    }

    /// Deletes documents, batches, aggregates, layouts and sequences, then
    /// resets customer spending and points. One transaction.
    pub async fn clear_simulation_data(&self) -> DbResult<ClearReport> {
        let mut tx = self.pool.begin().await?;
        let mut report = ClearReport::default();

        for table in SIMULATION_TABLES {
            let result = sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&mut *tx)
                .await?;
            report.tables.push((table.to_string(), result.rows_affected()));
        }

        let reset = sqlx::query(
            r#"
            UPDATE customers SET total_spending = 0, loyalty_points = 0
            WHERE total_spending <> 0 OR loyalty_points <> 0
            "#,
        )
        .execute(&mut *tx)
        .await?;
        report.customers_reset = reset.rows_affected();

        tx.commit().await?;

        info!(
            rows = report.total_rows(),
            customers_reset = report.customers_reset,
            "Cleared simulation data"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use crate::repository::batch::{add_warehouse_batch, NewWarehouseBatch};
    use crate::repository::customer::accrue;
    use crate::repository::sequence::next_value;
    use crate::seed::seed_master_data;
    use crate::{Database, DbConfig};
    use chrono::NaiveDate;
    use shelfwise_core::{CodeSeries, Money};

    #[tokio::test]
    async fn test_clear_keeps_master_data() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed_master_data(&db).await.unwrap();
        let product = db.catalog().products().await.unwrap()[0].clone();
        let warehouse = db.catalog().warehouses().await.unwrap()[0].clone();
        let member = db.customers().active().await.unwrap()[0].clone();
        let products_before = db.catalog().count_products().await.unwrap();

        let mut tx = db.begin().await.unwrap();
        add_warehouse_batch(
            &mut tx,
            &NewWarehouseBatch {
                warehouse_id: warehouse.id,
                product_id: product.id,
                quantity: 20,
                import_date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
                expiry_date: None,
                import_price: product.import_price,
            },
        )
        .await
        .unwrap();
        next_value(&mut tx, CodeSeries::Order).await.unwrap();
        accrue(&mut tx, member.id, Money::from_units(50_000), 5).await.unwrap();
        tx.commit().await.unwrap();

        let report = db.maintenance().clear_simulation_data().await.unwrap();
        assert!(report.total_rows() >= 2);
        assert_eq!(report.customers_reset, 1);

        assert_eq!(db.batches().warehouse_quantity(product.id).await.unwrap(), 0);
        assert_eq!(db.sequences().current(CodeSeries::Order).await.unwrap(), None);
        assert_eq!(db.catalog().count_products().await.unwrap(), products_before);

        let member = db.customers().get(member.id).await.unwrap().unwrap();
        assert!(member.total_spending.is_zero());
        assert_eq!(member.loyalty_points, 0);
    }
}

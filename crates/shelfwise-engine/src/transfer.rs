//! # Transfer Executor
//!
//! Moves stock from warehouse batches to a display shelf.
//!
//! ## One Transaction, Four Writes
//! ```text
//! transfer(product, shelf, qty, employee, policy)
//!      │
//!      ▼  BEGIN
//!  ┌───────────────────────────────────────────────────────────────┐
//!  │ fifo_warehouse_batches(product)                               │
//!  │ plan_fifo_allocation(batches, qty, policy)                    │
//!  │     SingleBatch: first FIFO batch must hold qty               │
//!  │     SpanBatches: drain in FIFO order until qty is covered     │
//!  │                                                               │
//!  │ for each allocation:                                          │
//!  │   1. consume_warehouse_batch      (guarded decrement)         │
//!  │   2. INSERT stock_transfers       (ST{YYYYMM}{seq:04})        │
//!  │   3. add_or_merge_shelf_batch     (same code, expiry, cost,   │
//!  │                                    product selling price)     │
//!  │ 4. refresh shelf aggregate                                    │
//!  └───────────────────────────────────────────────────────────────┘
//!      │  COMMIT
//!      ▼
//!  any failure drops the transaction: no record, no decrement, no shelf row
//! ```

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::error::EngineResult;
use shelfwise_core::inventory::plan_fifo_allocation;
use shelfwise_core::{
    AllocationPolicy, CodeSeries, CoreError, PriceInfo, Product, ShelfAggregate, ShelfBatch,
    StockTransfer,
};
use shelfwise_db::repository::{aggregate, batch, sequence, transfer};
use shelfwise_db::{Database, DbError, NewStockTransfer, ShelfStock};

/// What a committed transfer wrote.
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    /// One record per warehouse batch drawn from.
    pub transfers: Vec<StockTransfer>,
    pub shelf_batches: Vec<ShelfBatch>,
    pub aggregate: ShelfAggregate,
}

impl TransferOutcome {
    pub fn quantity(&self) -> i64 {
        self.transfers.iter().map(|t| t.quantity).sum()
    }
}

/// Writes warehouse-to-shelf transfers.
pub struct TransferExecutor {
    db: Arc<Database>,
    /// Near-expiry window used when refreshing the shelf aggregate.
    window_days: i64,
}

impl TransferExecutor {
    pub fn new(db: Arc<Database>, window_days: i64) -> Self {
        TransferExecutor { db, window_days }
    }

    /// Transfers `quantity` units of `product` onto `shelf_id`.
    ///
    /// ## Returns
    /// `Ok(None)` for a zero quantity.
    ///
    /// ## Errors
    /// - `NegativeQuantity` for a negative quantity
    /// - `InsufficientStock` when the policy cannot cover the request; the
    ///   store is left exactly as it was
    pub async fn transfer(
        &self,
        product: &Product,
        shelf_id: i64,
        quantity: i64,
        employee_id: i64,
        today: NaiveDate,
        policy: AllocationPolicy,
    ) -> EngineResult<Option<TransferOutcome>> {
        if quantity < 0 {
            return Err(CoreError::NegativeQuantity {
                field: format!("transfer quantity for product {}", product.id),
                value: quantity,
            }
            .into());
        }
        if quantity == 0 {
            return Ok(None);
        }

        let mut tx = self.db.begin().await?;

        let batches = batch::fifo_warehouse_batches(&mut tx, product.id).await?;
        let plan = plan_fifo_allocation(&batches, quantity, policy)?;

        let mut transfers = Vec::with_capacity(plan.len());
        let mut shelf_batches = Vec::with_capacity(plan.len());

        for allocation in &plan {
            let warehouse_id = batches
                .iter()
                .find(|b| b.id == allocation.batch_id)
                .map(|b| b.warehouse_id)
                .ok_or_else(|| DbError::not_found("WarehouseBatch", allocation.batch_id))?;

            batch::consume_warehouse_batch(&mut tx, allocation.batch_id, allocation.quantity)
                .await?;

            let transfer_code = sequence::next_code(&mut tx, CodeSeries::Transfer, today).await?;
            let record = transfer::insert_transfer(
                &mut tx,
                &NewStockTransfer {
                    transfer_code,
                    product_id: product.id,
                    from_warehouse_id: warehouse_id,
                    to_shelf_id: shelf_id,
                    quantity: allocation.quantity,
                    transfer_date: today,
                    employee_id,
                    batch_code: allocation.batch_code.clone(),
                    expiry_date: allocation.expiry_date,
                    import_price: allocation.import_price,
                    selling_price: product.selling_price,
                },
            )
            .await?;

            let shelf_batch = batch::add_or_merge_shelf_batch(
                &mut tx,
                &ShelfStock {
                    shelf_id,
                    product_id: product.id,
                    batch_code: allocation.batch_code.clone(),
                    quantity: allocation.quantity,
                    expiry_date: allocation.expiry_date,
                    date: today,
                    prices: PriceInfo {
                        import_price: allocation.import_price,
                        current_price: product.selling_price,
                    },
                },
            )
            .await?;

            debug!(
                transfer_code = %record.transfer_code,
                batch_code = %allocation.batch_code,
                quantity = allocation.quantity,
                "Transferred batch slice"
            );
            transfers.push(record);
            shelf_batches.push(shelf_batch);
        }

        let aggregate =
            aggregate::refresh(&mut tx, shelf_id, product.id, today, self.window_days).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            product_id = product.id,
            shelf_id,
            quantity,
            records = transfers.len(),
            shelf_quantity = aggregate.current_quantity,
            %policy,
            "Transferred stock to shelf"
        );

        Ok(Some(TransferOutcome {
            transfers,
            shelf_batches,
            aggregate,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use shelfwise_core::Money;
    use shelfwise_db::{seed_master_data, DbConfig, NewWarehouseBatch};

    use crate::catalog::CatalogSnapshot;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, d).unwrap()
    }

    async fn setup() -> (Arc<Database>, CatalogSnapshot) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed_master_data(&db).await.unwrap();
        let catalog = CatalogSnapshot::load(&db).await.unwrap();
        (Arc::new(db), catalog)
    }

    /// Receives `qty` units of `product` expiring `days` after day 1.
    async fn receive(db: &Database, catalog: &CatalogSnapshot, product: &Product, qty: i64, days: i64) {
        let mut tx = db.begin().await.unwrap();
        batch::add_warehouse_batch(
            &mut tx,
            &NewWarehouseBatch {
                warehouse_id: catalog.warehouse.id,
                product_id: product.id,
                quantity: qty,
                import_date: day(1),
                expiry_date: Some(day(1) + Duration::days(days)),
                import_price: product.import_price,
            },
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_single_batch_transfer_moves_stock() {
        let (db, catalog) = setup().await;
        let product = catalog.products[0].clone();
        let shelf_id = catalog.shelf_for(&product).unwrap();
        receive(&db, &catalog, &product, 20, 30).await;

        let exec = TransferExecutor::new(db.clone(), 7);
        let outcome = exec
            .transfer(&product, shelf_id, 8, catalog.transfer_employee().id, day(1), AllocationPolicy::SingleBatch)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.quantity(), 8);
        assert_eq!(outcome.transfers[0].transfer_code, "ST2025090001");
        assert_eq!(outcome.transfers[0].selling_price, product.selling_price);
        assert_eq!(outcome.shelf_batches[0].current_price, product.selling_price);
        assert_eq!(outcome.shelf_batches[0].import_price, product.import_price);
        assert_eq!(outcome.aggregate.current_quantity, 8);
        assert_eq!(db.batches().warehouse_quantity(product.id).await.unwrap(), 12);
    }

    #[tokio::test]
    async fn test_restock_merges_into_same_shelf_batch() {
        let (db, catalog) = setup().await;
        let product = catalog.products[0].clone();
        let shelf_id = catalog.shelf_for(&product).unwrap();
        receive(&db, &catalog, &product, 20, 30).await;

        let exec = TransferExecutor::new(db.clone(), 7);
        let employee = catalog.transfer_employee().id;
        for d in [1, 2] {
            exec.transfer(&product, shelf_id, 5, employee, day(d), AllocationPolicy::SingleBatch)
                .await
                .unwrap();
        }

        let shelf = db.batches().shelf_batches(shelf_id, product.id).await.unwrap();
        assert_eq!(shelf.len(), 1);
        assert_eq!(shelf[0].quantity, 10);
        assert_eq!(shelf[0].stocked_date, day(1));
        assert_eq!(shelf[0].restocked_date, day(2));
    }

    #[tokio::test]
    async fn test_oversized_single_batch_transfer_is_atomic() {
        let (db, catalog) = setup().await;
        let product = catalog.products[0].clone();
        let shelf_id = catalog.shelf_for(&product).unwrap();
        receive(&db, &catalog, &product, 10, 2).await;
        receive(&db, &catalog, &product, 10, 10).await;

        let exec = TransferExecutor::new(db.clone(), 7);
        let err = exec
            .transfer(&product, shelf_id, 15, catalog.transfer_employee().id, day(1), AllocationPolicy::SingleBatch)
            .await
            .unwrap_err();

        assert!(err.is_recoverable());
        assert_eq!(db.transfers().count().await.unwrap(), 0);
        assert_eq!(db.batches().warehouse_quantity(product.id).await.unwrap(), 20);
        assert!(db.batches().shelf_batches(shelf_id, product.id).await.unwrap().is_empty());
        assert!(db.aggregates().get(shelf_id, product.id).await.unwrap().is_none());
        // The failed attempt must not burn a transfer number.
        let next = exec
            .transfer(&product, shelf_id, 5, catalog.transfer_employee().id, day(1), AllocationPolicy::SingleBatch)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(next.transfers[0].transfer_code, "ST2025090001");
    }

    #[tokio::test]
    async fn test_span_batches_drains_earliest_expiry_first() {
        let (db, catalog) = setup().await;
        let product = catalog.products[0].clone();
        let shelf_id = catalog.shelf_for(&product).unwrap();
        receive(&db, &catalog, &product, 10, 10).await;
        receive(&db, &catalog, &product, 10, 2).await;

        let exec = TransferExecutor::new(db.clone(), 7);
        let outcome = exec
            .transfer(&product, shelf_id, 15, catalog.transfer_employee().id, day(1), AllocationPolicy::SpanBatches)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.transfers.len(), 2);
        assert_eq!(outcome.quantity(), 15);

        let mut warehouse = db.batches().warehouse_batches(product.id).await.unwrap();
        warehouse.sort_by_key(|b| b.expiry_date);
        assert_eq!(warehouse[0].expiry_date, Some(day(3)));
        assert_eq!(warehouse[0].quantity, 0);
        assert_eq!(warehouse[1].quantity, 5);

        let aggregate = db.aggregates().get(shelf_id, product.id).await.unwrap().unwrap();
        assert_eq!(aggregate.current_quantity, 15);
        assert_eq!(aggregate.near_expiry_quantity, 10);
        assert_eq!(aggregate.earliest_expiry, Some(day(3)));
    }

    #[tokio::test]
    async fn test_zero_and_negative_quantities() {
        let (db, catalog) = setup().await;
        let product = catalog.products[0].clone();
        let shelf_id = catalog.shelf_for(&product).unwrap();
        let exec = TransferExecutor::new(db.clone(), 7);
        let employee = catalog.transfer_employee().id;

        assert!(exec
            .transfer(&product, shelf_id, 0, employee, day(1), AllocationPolicy::SingleBatch)
            .await
            .unwrap()
            .is_none());
        let err = exec
            .transfer(&product, shelf_id, -1, employee, day(1), AllocationPolicy::SingleBatch)
            .await
            .unwrap_err();
        assert!(!err.is_recoverable());
    }

    #[tokio::test]
    async fn test_empty_warehouse_is_insufficient() {
        let (db, catalog) = setup().await;
        let product = catalog.products[0].clone();
        let shelf_id = catalog.shelf_for(&product).unwrap();
        let exec = TransferExecutor::new(db.clone(), 7);

        let err = exec
            .transfer(&product, shelf_id, 1, catalog.transfer_employee().id, day(1), AllocationPolicy::SpanBatches)
            .await
            .unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(
            db.reports().stock_value().await.unwrap().shelf_value,
            Money::zero()
        );
    }
}

//! # Order Executor
//!
//! Places a purchase order and receives it into the warehouse in one
//! transaction.
//!
//! ## Flow
//! ```text
//! place_order(supplier, employee, lines, today)
//!      │
//!      ├── drop zero-quantity lines, reject negative ones
//!      │
//!      ▼  BEGIN
//!  ┌───────────────────────────────────────────────────────────────┐
//!  │ next_code(Order)            → PO202509001                     │
//!  │ INSERT purchase_orders      (total = Σ qty × import_price)    │
//!  │ for each line:                                                │
//!  │   INSERT purchase_order_details                               │
//!  │   ExpiryPolicy::compute     → expiry date                     │
//!  │   INSERT warehouse_batches  → BATCH{YYYYMMDD}{product:04}     │
//!  └───────────────────────────────────────────────────────────────┘
//!      │  COMMIT (or drop → nothing persisted)
//!      ▼
//!  PlacedOrder
//! ```

use std::sync::Arc;

use chrono::NaiveDate;
use rand::Rng;
use tracing::{debug, info};

use crate::catalog::CatalogSnapshot;
use crate::error::EngineResult;
use shelfwise_core::expiry::{ExpiryPolicy, ExpiryRoll};
use shelfwise_core::{
    order_total, CodeSeries, CoreError, OrderLine, OrderStatus, PurchaseOrder,
    PurchaseOrderDetail, WarehouseBatch,
};
use shelfwise_db::repository::{batch, order, sequence};
use shelfwise_db::{Database, DbError, NewPurchaseOrder, NewWarehouseBatch};

/// A committed order together with the stock it brought in.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: PurchaseOrder,
    pub details: Vec<PurchaseOrderDetail>,
    pub batches: Vec<WarehouseBatch>,
    /// Which expiry branch each batch took, parallel to `batches`.
    pub rolls: Vec<ExpiryRoll>,
}

/// Writes purchase orders and their warehouse receipts.
pub struct OrderExecutor {
    db: Arc<Database>,
    catalog: Arc<CatalogSnapshot>,
    expiry: ExpiryPolicy,
    /// Last simulated day. Receipts close to it may get forced expiries.
    end_date: NaiveDate,
}

impl OrderExecutor {
    pub fn new(
        db: Arc<Database>,
        catalog: Arc<CatalogSnapshot>,
        expiry: ExpiryPolicy,
        end_date: NaiveDate,
    ) -> Self {
        OrderExecutor {
            db,
            catalog,
            expiry,
            end_date,
        }
    }

    /// Places and receives an order.
    ///
    /// ## Returns
    /// - `Ok(None)` when every line has quantity zero (nothing is written)
    /// - `Ok(Some(order))` once header, details and batches are committed
    ///
    /// ## Errors
    /// - `NegativeQuantity` for any negative line, before anything is written
    /// - `Configuration` for a line naming an unknown product or a product
    ///   of a different supplier
    pub async fn place_order<R: Rng + ?Sized>(
        &self,
        supplier_id: i64,
        employee_id: i64,
        lines: &[OrderLine],
        today: NaiveDate,
        rng: &mut R,
    ) -> EngineResult<Option<PlacedOrder>> {
        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            if line.quantity < 0 {
                return Err(CoreError::NegativeQuantity {
                    field: format!("order quantity for product {}", line.product_id),
                    value: line.quantity,
                }
                .into());
            }
            if line.quantity == 0 {
                continue;
            }
            let product = self.catalog.product(line.product_id).ok_or_else(|| {
                CoreError::Configuration(format!("unknown product {}", line.product_id))
            })?;
            if product.supplier_id != supplier_id {
                return Err(CoreError::Configuration(format!(
                    "product {} is not supplied by supplier {}",
                    product.product_code, supplier_id
                ))
                .into());
            }
            items.push((product, line.quantity));
        }

        if items.is_empty() {
            debug!(supplier_id, "Order has no positive lines, skipping");
            return Ok(None);
        }

        let total = order_total(items.iter().map(|(p, qty)| (p.import_price, *qty)));

        let mut tx = self.db.begin().await?;
        let order_no = sequence::next_code(&mut tx, CodeSeries::Order, today).await?;
        let header = order::insert_order(
            &mut tx,
            &NewPurchaseOrder {
                order_no,
                supplier_id,
                employee_id,
                order_date: today,
                delivery_date: Some(today),
                status: OrderStatus::Received,
                total_amount: total,
            },
        )
        .await?;

        let mut details = Vec::with_capacity(items.len());
        let mut batches = Vec::with_capacity(items.len());
        let mut rolls = Vec::with_capacity(items.len());

        for (product, quantity) in &items {
            let detail =
                order::insert_order_detail(&mut tx, header.id, product.id, *quantity, product.import_price)
                    .await?;

            let (expiry, roll) =
                self.expiry
                    .compute(product.shelf_life_days, today, self.end_date, rng);
            // A forced-expired receipt is booked as imported on its expiry day
            // but still coded with the day it arrived.
            let import_date = today.min(expiry);

            let received = batch::add_received_batch(
                &mut tx,
                &NewWarehouseBatch {
                    warehouse_id: self.catalog.warehouse.id,
                    product_id: product.id,
                    quantity: *quantity,
                    import_date,
                    expiry_date: Some(expiry),
                    import_price: product.import_price,
                },
                today,
            )
            .await?;

            if roll != ExpiryRoll::Normal {
                debug!(
                    product_id = product.id,
                    batch_code = %received.batch_code,
                    expiry = %expiry,
                    ?roll,
                    "Received batch with scenario expiry"
                );
            }

            details.push(detail);
            batches.push(received);
            rolls.push(roll);
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            order_no = %header.order_no,
            supplier_id,
            lines = details.len(),
            total = %header.total_amount,
            "Placed purchase order"
        );

        Ok(Some(PlacedOrder {
            order: header,
            details,
            batches,
            rolls,
        }))
    }
}

//! # Replenishment Controller
//!
//! Drives a run day by day: decides what to reorder and restock, then hands
//! the work to the executors.
//!
//! ## Daily Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ReplenishmentController                          │
//! │                                                                         │
//! │  start day ──► initial stocking                                         │
//! │                  one order per supplier (max(1, T) per product)         │
//! │                  transfer max(1, 80% of qty) to each category shelf     │
//! │                                                                         │
//! │  each later day                                                         │
//! │    0. refresh every shelf aggregate (calendar moved)                    │
//! │    1. reorder  ──► OrderExecutor      warehouse < max(1, T), cooldown   │
//! │    2. restock  ──► TransferExecutor   shelf < max(1, 30% of T)          │
//! │    3. discount ──► DiscountEngine     batches inside the window         │
//! │    4. sales    ──► SalesEngine        20..=50 customers                 │
//! │    5. scenarios (final days only) ──► ScenarioInjector                  │
//! │                                                                         │
//! │  end ──► RunSummary::collect                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Days run strictly in sequence, so day N always sees the settled state of
//! day N-1. A failed order or transfer for one product is logged and the
//! loop moves on; configuration errors abort the run.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::catalog::CatalogSnapshot;
use crate::config::EngineConfig;
use crate::discount::DiscountEngine;
use crate::error::{EngineError, EngineResult};
use crate::order::OrderExecutor;
use crate::sales::SalesEngine;
use crate::scenarios::ScenarioInjector;
use crate::summary::{RunActivity, RunSummary};
use crate::transfer::TransferExecutor;
use shelfwise_core::replenishment::{ControllerState, ReplenishmentPolicy};
use shelfwise_core::{AllocationPolicy, OrderLine, Product};
use shelfwise_db::repository::aggregate;
use shelfwise_db::{Database, DbError};

// =============================================================================
// Controller
// =============================================================================

/// Owns the per-run state and the executors for one simulation.
pub struct ReplenishmentController {
    db: Arc<Database>,
    catalog: Arc<CatalogSnapshot>,
    config: EngineConfig,
    policy: ReplenishmentPolicy,
    transfer_policy: AllocationPolicy,
    start: NaiveDate,
    end: NaiveDate,
    state: ControllerState,
    rng: StdRng,
    orders: OrderExecutor,
    transfers: TransferExecutor,
    discounts: DiscountEngine,
    sales: SalesEngine,
    scenarios: ScenarioInjector,
    activity: RunActivity,
}

impl ReplenishmentController {
    /// Loads the catalog, makes sure every product has a layout slot, and
    /// draws daily targets.
    ///
    /// ## Errors
    /// Configuration errors for settings that fail [`EngineConfig::validate`],
    /// a missing date range, or incomplete master data. Nothing is written
    /// when validation fails.
    pub async fn prepare(db: Arc<Database>, config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let (start, end) = config.date_range()?;

        let catalog = Arc::new(CatalogSnapshot::load(&db).await?);
        let layouts = catalog.ensure_layouts(&db).await?;

        let mut rng = match config.simulation.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let state = ControllerState::new(
            catalog.product_categories(),
            &config.demand_profile(),
            &mut rng,
        );

        let window = config.expiry.near_expiry_window_days;
        let orders = OrderExecutor::new(db.clone(), catalog.clone(), config.expiry_policy(), end);
        let transfers = TransferExecutor::new(db.clone(), window);
        let discounts = DiscountEngine::new(db.clone(), catalog.clone());
        let sales = SalesEngine::new(db.clone(), catalog.clone(), config.sales.clone(), window);
        let scenarios = ScenarioInjector::new(db.clone(), config.scenarios.clone(), window);

        info!(
            %start,
            %end,
            products = catalog.products.len(),
            suppliers = catalog.suppliers.len(),
            layouts_created = layouts,
            seeded = config.simulation.rng_seed.is_some(),
            "Simulation prepared"
        );

        Ok(ReplenishmentController {
            policy: config.replenishment_policy(),
            transfer_policy: config.simulation.transfer_policy,
            db,
            catalog,
            config,
            start,
            end,
            state,
            rng,
            orders,
            transfers,
            discounts,
            sales,
            scenarios,
            activity: RunActivity::default(),
        })
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn activity(&self) -> RunActivity {
        self.activity
    }

    /// Runs every day from start to end inclusive and returns the summary.
    pub async fn run(mut self) -> EngineResult<RunSummary> {
        let mut today = self.start;
        while today <= self.end {
            if today == self.start {
                info!(%today, "Day 1: initial stocking");
                self.initial_stocking(today).await?;
            } else {
                self.run_day(today).await?;
            }
            self.activity.days += 1;
            today += Duration::days(1);
        }

        RunSummary::collect(
            &self.db,
            self.start,
            self.end,
            self.config.expiry.near_expiry_window_days,
            self.activity,
        )
        .await
    }

    // =========================================================================
    // Day 0
    // =========================================================================

    /// One purchase order per supplier for about a day of demand, then most
    /// of it onto the shelves.
    pub async fn initial_stocking(&mut self, today: NaiveDate) -> EngineResult<()> {
        let catalog = self.catalog.clone();
        let employee_id = catalog.order_employee().id;

        for (supplier_id, products) in catalog.products_by_supplier() {
            let lines: Vec<OrderLine> = products
                .iter()
                .map(|p| OrderLine {
                    product_id: p.id,
                    quantity: self.policy.initial_order_quantity(self.state.target(p.id)),
                })
                .collect();

            let placed = match self
                .orders
                .place_order(supplier_id, employee_id, &lines, today, &mut self.rng)
                .await
            {
                Ok(Some(placed)) => placed,
                Ok(None) => continue,
                Err(err) => {
                    self.step_failed(&err, "initial order")?;
                    self.activity.reorders_failed += 1;
                    continue;
                }
            };
            self.activity.reorders += 1;
            info!(
                supplier_id,
                order_no = %placed.order.order_no,
                lines = placed.details.len(),
                total = %placed.order.total_amount,
                "Initial order received"
            );

            for detail in &placed.details {
                let Some(product) = catalog.product(detail.product_id) else {
                    continue;
                };
                let quantity = self.policy.initial_transfer_quantity(detail.quantity);
                self.move_to_shelf(product, quantity, today).await?;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Later Days
    // =========================================================================

    pub async fn run_day(&mut self, today: NaiveDate) -> EngineResult<()> {
        debug!(%today, "Starting day");

        let mut tx = self.db.begin().await?;
        let refreshed =
            aggregate::refresh_all(&mut tx, today, self.config.expiry.near_expiry_window_days)
                .await?;
        tx.commit().await.map_err(DbError::from)?;
        debug!(%today, refreshed, "Refreshed shelf aggregates");

        self.reorder_check(today).await?;
        self.restock_check(today).await?;

        if self.config.discount.enabled {
            match self
                .discounts
                .apply_discounts(today, self.config.discount.window_days)
                .await
            {
                Ok(report) => self.activity.batches_discounted += report.discounted,
                Err(err) => self.step_failed(&err, "discounts")?,
            }
        }

        let customers = self.sales.draw_customer_count(&mut self.rng);
        match self.sales.run_daily_sales(today, customers, &mut self.rng).await {
            Ok(report) => {
                self.activity.sales_attempted += report.attempted;
                self.activity.sales_aborted += report.aborted_no_stock + report.aborted_no_items;
            }
            Err(err) => self.step_failed(&err, "daily sales")?,
        }

        if self.scenarios.is_active(today, self.end) {
            let product_ids: Vec<i64> = self.catalog.products.iter().map(|p| p.id).collect();
            match self.scenarios.inject(today, &product_ids, &mut self.rng).await {
                Ok(_) => self.activity.scenario_days += 1,
                Err(err) => self.step_failed(&err, "end-of-run scenarios")?,
            }
        }
        Ok(())
    }

    /// Orders two days of demand for every product whose warehouse stock is
    /// below one day, unless it was reordered within the cooldown.
    pub async fn reorder_check(&mut self, today: NaiveDate) -> EngineResult<usize> {
        let catalog = self.catalog.clone();
        let employee_id = catalog.order_employee().id;
        let mut placed = 0;

        for product in &catalog.products {
            let warehouse = self.db.batches().warehouse_quantity(product.id).await?;
            let target = self.state.target(product.id);
            if warehouse >= self.policy.reorder_point(target) {
                continue;
            }
            if !self.state.should_reorder(&self.policy, product.id, warehouse, today) {
                debug!(
                    product_id = product.id,
                    warehouse,
                    last_reorder = ?self.state.last_reorder(product.id),
                    "Reorder due but ordered recently"
                );
                continue;
            }

            let line = OrderLine {
                product_id: product.id,
                quantity: self.policy.order_quantity(target),
            };
            match self
                .orders
                .place_order(product.supplier_id, employee_id, &[line], today, &mut self.rng)
                .await
            {
                Ok(Some(order)) => {
                    self.state.record_reorder(product.id, today);
                    self.activity.reorders += 1;
                    placed += 1;
                    info!(
                        product_id = product.id,
                        order_no = %order.order.order_no,
                        quantity = line.quantity,
                        warehouse,
                        threshold = self.policy.reorder_point(target),
                        "Reordered"
                    );
                }
                Ok(None) => {}
                Err(err) => {
                    self.step_failed(&err, "reorder")?;
                    self.activity.reorders_failed += 1;
                }
            }
        }
        Ok(placed)
    }

    /// Tops up every shelf that holds less than the restock point.
    pub async fn restock_check(&mut self, today: NaiveDate) -> EngineResult<usize> {
        let catalog = self.catalog.clone();
        let mut restocked = 0;

        for product in &catalog.products {
            let shelf = self.db.aggregates().shelf_quantity(product.id).await?;
            let target = self.state.target(product.id);
            let Some(needed) = self.policy.restock_need(target, shelf) else {
                continue;
            };

            let available = self.available_for_transfer(product.id).await?;
            if available == 0 {
                debug!(product_id = product.id, shelf, target, "Shelf low but warehouse empty");
                continue;
            }
            if self.move_to_shelf(product, needed.min(available), today).await? {
                restocked += 1;
            }
        }
        Ok(restocked)
    }

    /// Units one transfer can take under the configured policy: the first
    /// FIFO batch for `SingleBatch`, all warehouse stock for `SpanBatches`.
    async fn available_for_transfer(&self, product_id: i64) -> EngineResult<i64> {
        let batches = self.db.batches().warehouse_batches(product_id).await?;
        let mut live = batches.iter().filter(|b| b.quantity > 0);
        Ok(match self.transfer_policy {
            AllocationPolicy::SingleBatch => live.next().map(|b| b.quantity).unwrap_or(0),
            AllocationPolicy::SpanBatches => live.map(|b| b.quantity).sum(),
        })
    }

    async fn move_to_shelf(
        &mut self,
        product: &Product,
        quantity: i64,
        today: NaiveDate,
    ) -> EngineResult<bool> {
        let shelf_id = self.catalog.shelf_for(product)?;
        let employee_id = self.catalog.transfer_employee().id;

        match self
            .transfers
            .transfer(product, shelf_id, quantity, employee_id, today, self.transfer_policy)
            .await
        {
            Ok(Some(outcome)) => {
                self.activity.restocks += 1;
                debug!(
                    product_id = product.id,
                    shelf_id,
                    quantity = outcome.quantity(),
                    shelf_total = outcome.aggregate.current_quantity,
                    "Restocked shelf"
                );
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(err) => {
                self.step_failed(&err, "transfer")?;
                self.activity.restocks_failed += 1;
                Ok(false)
            }
        }
    }

    /// Logs a failed step and lets the loop continue, unless the failure
    /// means the run itself is misconfigured.
    fn step_failed(&self, err: &EngineError, step: &str) -> EngineResult<()> {
        if err.is_config_error() {
            return Err(EngineError::Config(format!("{step} failed: {err}")));
        }
        warn!(step, error = %err, recoverable = err.is_recoverable(), "Step failed, continuing");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfwise_db::{seed_master_data, DbConfig};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, d).unwrap()
    }

    fn config(start: NaiveDate, end: NaiveDate, seed: u64) -> EngineConfig {
        let mut config = EngineConfig::default();
        config.simulation.start_date = Some(start);
        config.simulation.end_date = Some(end);
        config.simulation.rng_seed = Some(seed);
        config
    }

    async fn seeded() -> Arc<Database> {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed_master_data(&db).await.unwrap();
        Arc::new(db)
    }

    #[tokio::test]
    async fn test_initial_stocking_orders_per_supplier() {
        let db = seeded().await;
        let mut controller = ReplenishmentController::prepare(db.clone(), config(day(1), day(10), 7))
            .await
            .unwrap();
        controller.initial_stocking(day(1)).await.unwrap();

        let suppliers = controller.catalog.products_by_supplier().len() as i64;
        let stats = db.reports().order_stats(day(1), day(1)).await.unwrap();
        assert_eq!(stats.count, suppliers);

        for product in &controller.catalog.products {
            let target = controller.state().target(product.id);
            let ordered = controller.policy.initial_order_quantity(target);
            let on_shelf = db.aggregates().shelf_quantity(product.id).await.unwrap();
            let in_warehouse = db.batches().warehouse_quantity(product.id).await.unwrap();
            assert_eq!(on_shelf, controller.policy.initial_transfer_quantity(ordered));
            assert_eq!(on_shelf + in_warehouse, ordered);
        }
        assert!(db.aggregates().drift().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reorder_respects_cooldown() {
        let db = seeded().await;
        let mut controller = ReplenishmentController::prepare(db.clone(), config(day(1), day(10), 11))
            .await
            .unwrap();

        // Empty warehouse: everything is below its reorder point.
        let first = controller.reorder_check(day(2)).await.unwrap();
        assert_eq!(first, controller.catalog.products.len());

        // Stock arrived, but drain it to force another shortage the next day.
        sqlx::query("UPDATE warehouse_batches SET quantity = 0")
            .execute(db.pool())
            .await
            .unwrap();
        assert_eq!(controller.reorder_check(day(3)).await.unwrap(), 0);
        assert_eq!(
            controller.reorder_check(day(4)).await.unwrap(),
            controller.catalog.products.len()
        );
    }

    #[tokio::test]
    async fn test_restock_tops_up_low_shelves() {
        let db = seeded().await;
        let mut controller = ReplenishmentController::prepare(db.clone(), config(day(1), day(10), 5))
            .await
            .unwrap();
        controller.reorder_check(day(2)).await.unwrap();
        let restocked = controller.restock_check(day(2)).await.unwrap();
        assert_eq!(restocked, controller.catalog.products.len());

        for product in &controller.catalog.products {
            let target = controller.state().target(product.id);
            let on_shelf = db.aggregates().shelf_quantity(product.id).await.unwrap();
            assert_eq!(on_shelf, target.max(1).min(controller.policy.order_quantity(target)));
        }

        // Shelves are full now; a second pass does nothing.
        assert_eq!(controller.restock_check(day(2)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_short_run_keeps_store_consistent() {
        let db = seeded().await;
        let controller = ReplenishmentController::prepare(db.clone(), config(day(1), day(8), 42))
            .await
            .unwrap();
        let summary = controller.run().await.unwrap();

        assert_eq!(summary.activity.days, 8);
        assert_eq!(summary.activity.scenario_days, 3);
        assert!(summary.orders.count > 0);
        assert!(summary.transfers.count > 0);
        assert!(summary.invoices.count > 0);
        assert!(db.aggregates().drift().await.unwrap().is_empty());

        let unbalanced: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sales_invoices i
             WHERE i.total_amount != i.subtotal - i.discount_amount + i.tax_amount
                OR i.subtotal != (SELECT COALESCE(SUM(d.subtotal), 0)
                                  FROM sales_invoice_details d WHERE d.invoice_id = i.id)",
        )
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(unbalanced, 0);

        assert!(db.batches().min_quantity().await.unwrap() >= 0);
    }

    #[tokio::test]
    async fn test_same_seed_same_run() {
        let mut revenues = Vec::new();
        for _ in 0..2 {
            let db = seeded().await;
            let summary = ReplenishmentController::prepare(db, config(day(1), day(5), 99))
                .await
                .unwrap()
                .run()
                .await
                .unwrap();
            revenues.push((summary.invoices.count, summary.invoices.revenue));
        }
        assert_eq!(revenues[0], revenues[1]);
    }

    #[tokio::test]
    async fn test_inverted_range_is_config_error() {
        let db = seeded().await;
        let err = ReplenishmentController::prepare(db, config(day(10), day(1), 1))
            .await
            .err()
            .unwrap();
        assert!(err.is_config_error());
    }

    #[tokio::test]
    async fn test_invalid_settings_rejected_before_any_write() {
        let db = seeded().await;
        let mut bad = config(day(1), day(5), 1);
        bad.sales.max_line_items = 0;

        let err = ReplenishmentController::prepare(db.clone(), bad)
            .await
            .err()
            .unwrap();
        assert!(err.is_config_error());
        assert_eq!(db.reports().order_stats(day(1), day(5)).await.unwrap().count, 0);
        assert_eq!(db.invoices().count().await.unwrap(), 0);
    }
}

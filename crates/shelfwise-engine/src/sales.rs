//! # Sales Engine
//!
//! Synthesises a day of till activity against shelf stock.
//!
//! ## One Invoice
//! ```text
//! BEGIN
//!   live shelf batches? ── none ──► abort (no stock)
//!   next_code(Invoice)            INV{YYYYMM}{seq:04}
//!   customer: member (70%) or walk-in
//!   1..=8 line draws:
//!       uniform pick among batches still holding stock
//!       1..=3 units, clamped to what the batch holds
//!       consume_shelf_batch (guarded)
//!   no lines? ── abort (NoFulfillableLineItems), sequence handed back
//!   totals: subtotal, tax 10%, total
//!   INSERT invoice + details
//!   member? ── accrue total_spending, floor(total / 10000) points
//!   refresh aggregates of every touched (shelf, product)
//! COMMIT
//! ```
//!
//! Lines draw batches uniformly rather than oldest-first. Shelf rotation is
//! left to the discount engine.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::CatalogSnapshot;
use crate::config::SalesSettings;
use crate::error::EngineResult;
use shelfwise_core::{
    loyalty_points, CodeSeries, CoreError, InvoiceLine, InvoiceTotals, Money, PaymentMethod,
    SalesInvoice,
};
use shelfwise_db::repository::{aggregate, batch, customer, invoice, sequence};
use shelfwise_db::{Database, DbError, NewSalesInvoice};

/// Outcome of one simulated day at the tills.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SalesDayReport {
    pub attempted: usize,
    pub committed: usize,
    /// Transactions abandoned because no shelf held anything.
    pub aborted_no_stock: usize,
    /// Transactions where every line draw came up empty.
    pub aborted_no_items: usize,
    pub revenue: Money,
}

/// What happened to one attempted sale.
#[derive(Debug)]
pub enum SaleOutcome {
    Committed(SalesInvoice),
    NoStock,
    NoItems,
}

pub struct SalesEngine {
    db: Arc<Database>,
    catalog: Arc<CatalogSnapshot>,
    settings: SalesSettings,
    window_days: i64,
}

impl SalesEngine {
    pub fn new(
        db: Arc<Database>,
        catalog: Arc<CatalogSnapshot>,
        settings: SalesSettings,
        window_days: i64,
    ) -> Self {
        SalesEngine {
            db,
            catalog,
            settings,
            window_days,
        }
    }

    /// Draws the day's transaction count from the configured range.
    pub fn draw_customer_count<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let (min, max) = (self.settings.min_customers, self.settings.max_customers);
        if max <= min {
            return min as usize;
        }
        rng.gen_range(min..=max) as usize
    }

    /// Runs `target_count` sales on `date`.
    pub async fn run_daily_sales<R: Rng + ?Sized>(
        &self,
        date: NaiveDate,
        target_count: usize,
        rng: &mut R,
    ) -> EngineResult<SalesDayReport> {
        let mut report = SalesDayReport::default();

        for _ in 0..target_count {
            report.attempted += 1;
            match self.sell_one(date, rng).await {
                Ok(SaleOutcome::Committed(invoice)) => {
                    report.committed += 1;
                    report.revenue = report.revenue + invoice.total_amount;
                }
                Ok(SaleOutcome::NoStock) => report.aborted_no_stock += 1,
                Ok(SaleOutcome::NoItems) => report.aborted_no_items += 1,
                Err(err) if err.is_recoverable() => {
                    warn!(%date, error = %err, "Sale rolled back");
                    report.aborted_no_items += 1;
                }
                Err(err) => return Err(err),
            }
        }

        info!(
            %date,
            attempted = report.attempted,
            committed = report.committed,
            aborted_no_stock = report.aborted_no_stock,
            aborted_no_items = report.aborted_no_items,
            revenue = %report.revenue,
            "Daily sales complete"
        );
        Ok(report)
    }

    /// Attempts one invoice. Nothing is persisted unless it commits.
    pub async fn sell_one<R: Rng + ?Sized>(
        &self,
        date: NaiveDate,
        rng: &mut R,
    ) -> EngineResult<SaleOutcome> {
        let mut tx = self.db.begin().await?;

        let mut available = batch::live_shelf_batches(&mut tx).await?;
        if available.is_empty() {
            debug!(%date, "No shelf stock, sale skipped");
            return Ok(SaleOutcome::NoStock);
        }

        let invoice_no = sequence::next_code(&mut tx, CodeSeries::Invoice, date).await?;

        let member = if rng.gen_range(0..100) < self.settings.member_percent {
            self.catalog.customers.choose(rng).map(|c| c.id)
        } else {
            None
        };

        let line_draws = rng.gen_range(1..=self.settings.max_line_items);
        let mut lines: Vec<InvoiceLine> = Vec::new();
        let mut touched: BTreeSet<(i64, i64)> = BTreeSet::new();

        for _ in 0..line_draws {
            let candidates: Vec<usize> = available
                .iter()
                .enumerate()
                .filter(|(_, b)| b.quantity > 0)
                .map(|(i, _)| i)
                .collect();
            let Some(&pick) = candidates.choose(rng) else {
                break;
            };
            let (chosen_id, chosen_quantity) = (available[pick].id, available[pick].quantity);
            let units = rng
                .gen_range(1..=self.settings.max_units_per_line)
                .min(chosen_quantity);

            match batch::consume_shelf_batch(&mut tx, chosen_id, units).await {
                Ok(after) => {
                    lines.push(InvoiceLine {
                        product_id: after.product_id,
                        shelf_batch_id: after.id,
                        batch_code: after.batch_code.clone(),
                        quantity: units,
                        unit_price: after.current_price,
                        discount: after.discount,
                    });
                    touched.insert((after.shelf_id, after.product_id));
                    available[pick] = after;
                }
                Err(err) if err.is_recoverable() => {
                    debug!(shelf_batch_id = chosen_id, error = %err, "Line skipped");
                    available[pick].quantity = 0;
                }
                Err(err) => return Err(err.into()),
            }
        }

        let totals = match InvoiceTotals::compute(
            &invoice_no,
            &lines,
            Money::zero(),
            self.settings.tax_rate(),
        ) {
            Ok(totals) => totals,
            Err(CoreError::NoFulfillableLineItems { invoice_no }) => {
                debug!(%invoice_no, "No fulfillable lines, invoice rolled back");
                return Ok(SaleOutcome::NoItems);
            }
            Err(err) => return Err(err.into()),
        };

        let points = match member {
            Some(_) => loyalty_points(totals.total_amount, self.settings.points_divisor),
            None => 0,
        };

        let header = invoice::insert_invoice(
            &mut tx,
            &NewSalesInvoice {
                invoice_no,
                customer_id: member,
                employee_id: self.catalog.draw_cashier(rng).id,
                invoice_date: sale_time(date, rng),
                totals,
                points_earned: points,
                points_used: 0,
                payment_method: PaymentMethod::draw(rng),
            },
        )
        .await?;

        for line in &lines {
            invoice::insert_invoice_detail(&mut tx, header.id, line).await?;
        }

        if let Some(customer_id) = member {
            customer::accrue(&mut tx, customer_id, totals.total_amount, points).await?;
        }

        for (shelf_id, product_id) in &touched {
            aggregate::refresh(&mut tx, *shelf_id, *product_id, date, self.window_days).await?;
        }

        tx.commit().await.map_err(DbError::from)?;

        debug!(
            invoice_no = %header.invoice_no,
            lines = lines.len(),
            total = %header.total_amount,
            member = header.customer_id.is_some(),
            "Committed sale"
        );
        Ok(SaleOutcome::Committed(header))
    }
}

/// A timestamp on `date` during opening hours, 08:00 to 19:59.
fn sale_time<R: Rng + ?Sized>(date: NaiveDate, rng: &mut R) -> NaiveDateTime {
    let hour = rng.gen_range(8..=19);
    let minute = rng.gen_range(0..60);
    let second = rng.gen_range(0..60);
    date.and_hms_opt(hour, minute, second)
        .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Timelike};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shelfwise_core::{AllocationPolicy, Product};
    use shelfwise_db::{seed_master_data, DbConfig, NewWarehouseBatch};

    use crate::transfer::TransferExecutor;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, d).unwrap()
    }

    async fn setup() -> (Arc<Database>, Arc<CatalogSnapshot>) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed_master_data(&db).await.unwrap();
        let catalog = CatalogSnapshot::load(&db).await.unwrap();
        (Arc::new(db), Arc::new(catalog))
    }

    async fn shelve(db: &Arc<Database>, catalog: &CatalogSnapshot, product: &Product, qty: i64) {
        let mut tx = db.begin().await.unwrap();
        batch::add_warehouse_batch(
            &mut tx,
            &NewWarehouseBatch {
                warehouse_id: catalog.warehouse.id,
                product_id: product.id,
                quantity: qty,
                import_date: day(1),
                expiry_date: Some(day(1) + Duration::days(90)),
                import_price: product.import_price,
            },
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();
        let shelf_id = catalog.shelf_for(product).unwrap();
        TransferExecutor::new(db.clone(), 7)
            .transfer(product, shelf_id, qty, catalog.transfer_employee().id, day(1), AllocationPolicy::SingleBatch)
            .await
            .unwrap();
    }

    fn engine(db: &Arc<Database>, catalog: &Arc<CatalogSnapshot>, settings: SalesSettings) -> SalesEngine {
        SalesEngine::new(db.clone(), catalog.clone(), settings, 7)
    }

    #[tokio::test]
    async fn test_no_stock_aborts_without_invoice() {
        let (db, catalog) = setup().await;
        let sales = engine(&db, &catalog, SalesSettings::default());
        let mut rng = StdRng::seed_from_u64(3);

        let report = sales.run_daily_sales(day(2), 5, &mut rng).await.unwrap();
        assert_eq!(report.attempted, 5);
        assert_eq!(report.aborted_no_stock, 5);
        assert_eq!(report.committed, 0);
        assert_eq!(db.invoices().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invoices_balance_and_stock_drops() {
        let (db, catalog) = setup().await;
        for product in catalog.products.iter().take(4) {
            shelve(&db, &catalog, product, 30).await;
        }
        let before: i64 = db.aggregates().all().await.unwrap().iter().map(|a| a.current_quantity).sum();

        let sales = engine(&db, &catalog, SalesSettings::default());
        let mut rng = StdRng::seed_from_u64(11);
        let report = sales.run_daily_sales(day(2), 10, &mut rng).await.unwrap();
        assert_eq!(report.committed, 10);

        let mut sold = 0;
        let mut revenue = Money::zero();
        for inv in db.invoices().all().await.unwrap() {
            let details = db.invoices().details(inv.id).await.unwrap();
            assert!(!details.is_empty() && details.len() <= 8);
            let sum: Money = details.iter().map(|d| d.subtotal).sum();
            assert_eq!(inv.subtotal, sum);
            assert_eq!(inv.total_amount, inv.subtotal - inv.discount_amount + inv.tax_amount);
            assert_eq!(inv.tax_amount, inv.subtotal.calculate_tax(shelfwise_core::DEFAULT_TAX_RATE));
            assert!((8..=19).contains(&inv.invoice_date.hour()));
            assert!(details.iter().all(|d| (1..=3).contains(&d.quantity)));
            if inv.customer_id.is_none() {
                assert_eq!(inv.points_earned, 0);
            }
            sold += details.iter().map(|d| d.quantity).sum::<i64>();
            revenue = revenue + inv.total_amount;
        }
        assert_eq!(revenue, report.revenue);

        let after: i64 = db.aggregates().all().await.unwrap().iter().map(|a| a.current_quantity).sum();
        assert_eq!(before - after, sold);
        assert!(db.aggregates().drift().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_member_accrues_spending_and_points() {
        let (db, catalog) = setup().await;
        // 60,000 + 10% tax = 66,000 → floor(66,000 / 10,000) = 6 points.
        let product = catalog.products[0].clone();
        shelve(&db, &catalog, &product, 1).await;
        let shelf_id = catalog.shelf_for(&product).unwrap();
        let shelf_batch = &db.batches().shelf_batches(shelf_id, product.id).await.unwrap()[0];
        sqlx::query("UPDATE shelf_batches SET current_price = 60000 WHERE id = ?1")
            .bind(shelf_batch.id)
            .execute(db.pool())
            .await
            .unwrap();

        let settings = SalesSettings {
            member_percent: 100,
            max_line_items: 1,
            max_units_per_line: 1,
            ..SalesSettings::default()
        };
        let sales = engine(&db, &catalog, settings);
        let mut rng = StdRng::seed_from_u64(4);

        let SaleOutcome::Committed(inv) = sales.sell_one(day(2), &mut rng).await.unwrap() else {
            panic!("expected a committed sale");
        };
        assert_eq!(inv.total_amount, Money::from_units(66_000));
        assert_eq!(inv.points_earned, 6);

        let member = db.customers().get(inv.customer_id.unwrap()).await.unwrap().unwrap();
        assert_eq!(member.total_spending, Money::from_units(66_000));
        assert_eq!(member.loyalty_points, 6);

        // The shelf is now empty, so the next attempt finds no stock.
        assert!(matches!(sales.sell_one(day(2), &mut rng).await.unwrap(), SaleOutcome::NoStock));
    }

    #[tokio::test]
    async fn test_member_buys_three_units_at_twenty_thousand() {
        let (db, catalog) = setup().await;
        let product = catalog.products[0].clone();
        shelve(&db, &catalog, &product, 3).await;
        let shelf_id = catalog.shelf_for(&product).unwrap();
        sqlx::query("UPDATE shelf_batches SET current_price = 20000, discount = 0 WHERE product_id = ?1")
            .bind(product.id)
            .execute(db.pool())
            .await
            .unwrap();
        let before = db.batches().shelf_quantity(product.id).await.unwrap();
        assert_eq!(before, 3);

        // One line whose unit draw is clamped to the three units on the shelf.
        let settings = SalesSettings {
            member_percent: 100,
            max_line_items: 1,
            max_units_per_line: 1_000_000,
            ..SalesSettings::default()
        };
        let sales = engine(&db, &catalog, settings);
        let mut rng = StdRng::seed_from_u64(21);

        let SaleOutcome::Committed(inv) = sales.sell_one(day(2), &mut rng).await.unwrap() else {
            panic!("expected a committed sale");
        };
        let details = db.invoices().details(inv.id).await.unwrap();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].quantity, 3);
        assert_eq!(details[0].unit_price, Money::from_units(20_000));
        assert_eq!(details[0].subtotal, Money::from_units(60_000));

        assert_eq!(inv.subtotal, Money::from_units(60_000));
        assert_eq!(inv.discount_amount, Money::zero());
        assert_eq!(inv.tax_amount, Money::from_units(6_000));
        assert_eq!(inv.total_amount, Money::from_units(66_000));
        assert_eq!(inv.total_amount, inv.subtotal - inv.discount_amount + inv.tax_amount);
        assert_eq!(inv.points_earned, 6);

        let member = db.customers().get(inv.customer_id.unwrap()).await.unwrap().unwrap();
        assert_eq!(member.total_spending, Money::from_units(66_000));
        assert_eq!(member.loyalty_points, 6);

        assert_eq!(db.batches().shelf_quantity(product.id).await.unwrap(), before - 3);
        let aggregate = db
            .aggregates()
            .all()
            .await
            .unwrap()
            .into_iter()
            .find(|a| a.shelf_id == shelf_id && a.product_id == product.id)
            .unwrap();
        assert_eq!(aggregate.current_quantity, 0);
    }

    #[tokio::test]
    async fn test_walk_in_gets_no_points() {
        let (db, catalog) = setup().await;
        shelve(&db, &catalog, &catalog.products[0].clone(), 20).await;
        let settings = SalesSettings {
            member_percent: 0,
            ..SalesSettings::default()
        };
        let sales = engine(&db, &catalog, settings);
        let mut rng = StdRng::seed_from_u64(8);
        sales.run_daily_sales(day(2), 3, &mut rng).await.unwrap();

        for inv in db.invoices().all().await.unwrap() {
            assert!(inv.customer_id.is_none());
            assert_eq!(inv.points_earned, 0);
        }
        let members = db.customers().active().await.unwrap();
        assert!(members.iter().all(|c| c.loyalty_points == 0 && c.total_spending.is_zero()));
    }

    #[test]
    fn test_sale_time_within_opening_hours() {
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..200 {
            let t = sale_time(day(5), &mut rng);
            assert_eq!(t.date(), day(5));
            assert!((8..=19).contains(&t.hour()));
        }
    }
}

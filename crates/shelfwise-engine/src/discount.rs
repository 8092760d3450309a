//! # Discount Engine
//!
//! Marks down shelf batches that are getting close to expiry.
//!
//! ```text
//! for every shelf batch with stock:
//!     days = expiry - today
//!     days outside [0, window]          → untouched
//!     no rule with threshold >= days    → flag near-expiry, price unchanged
//!     closest rule (smallest threshold) → price = import × (1 - rule %)
//!                                         flag near-expiry
//! ```
//!
//! The price is always derived from the import price and the rule, never
//! from the previous `current_price`, so running the engine twice on the
//! same day writes the same values twice.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::catalog::CatalogSnapshot;
use crate::error::EngineResult;
use shelfwise_core::discount::{markdown, Markdown};
use shelfwise_core::DiscountRate;
use shelfwise_db::repository::batch;
use shelfwise_db::{Database, DbError};

/// Counts from one pass of the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiscountReport {
    /// Shelf batches with stock that were looked at.
    pub examined: usize,
    /// Batches repriced by a rule.
    pub discounted: usize,
    /// Batches inside the window with no matching rule.
    pub flagged_only: usize,
}

pub struct DiscountEngine {
    db: Arc<Database>,
    catalog: Arc<CatalogSnapshot>,
}

impl DiscountEngine {
    pub fn new(db: Arc<Database>, catalog: Arc<CatalogSnapshot>) -> Self {
        DiscountEngine { db, catalog }
    }

    /// Applies markdown rules to every live shelf batch as of `today`.
    pub async fn apply_discounts(
        &self,
        today: NaiveDate,
        window_days: i64,
    ) -> EngineResult<DiscountReport> {
        let categories: HashMap<i64, i64> = self
            .catalog
            .products
            .iter()
            .map(|p| (p.id, p.category_id))
            .collect();

        let mut report = DiscountReport::default();
        let mut tx = self.db.begin().await?;

        for shelf_batch in batch::live_shelf_batches(&mut tx).await? {
            // Inactive products are outside the snapshot and keep their price.
            let Some(&category_id) = categories.get(&shelf_batch.product_id) else {
                continue;
            };
            report.examined += 1;

            match markdown(
                &shelf_batch,
                category_id,
                &self.catalog.discount_rules,
                today,
                window_days,
            ) {
                Markdown::NotEligible => {}
                Markdown::FlagOnly => {
                    batch::update_shelf_pricing(
                        &mut tx,
                        shelf_batch.id,
                        DiscountRate::zero(),
                        shelf_batch.current_price,
                        true,
                    )
                    .await?;
                    report.flagged_only += 1;
                }
                Markdown::Reprice {
                    discount,
                    current_price,
                } => {
                    batch::update_shelf_pricing(&mut tx, shelf_batch.id, discount, current_price, true)
                        .await?;
                    debug!(
                        shelf_batch_id = shelf_batch.id,
                        batch_code = %shelf_batch.batch_code,
                        discount_bps = discount.bps(),
                        price = %current_price,
                        "Marked down shelf batch"
                    );
                    report.discounted += 1;
                }
            }
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            %today,
            examined = report.examined,
            discounted = report.discounted,
            flagged_only = report.flagged_only,
            "Applied discounts"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use shelfwise_core::{AllocationPolicy, Money, Product};
    use shelfwise_db::{seed_master_data, DbConfig, NewWarehouseBatch};

    use crate::transfer::TransferExecutor;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, d).unwrap()
    }

    async fn setup() -> (Arc<Database>, Arc<CatalogSnapshot>) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed_master_data(&db).await.unwrap();
        sqlx::query("DELETE FROM discount_rules").execute(db.pool()).await.unwrap();
        let catalog = CatalogSnapshot::load(&db).await.unwrap();
        (Arc::new(db), Arc::new(catalog))
    }

    async fn add_rule(db: &Database, category_id: i64, days: i64, pct: u32) {
        sqlx::query(
            "INSERT INTO discount_rules (category_id, days_before_expiry, discount, is_active) VALUES (?1, ?2, ?3, 1)",
        )
        .bind(category_id)
        .bind(days)
        .bind(DiscountRate::from_percent(pct))
        .execute(db.pool())
        .await
        .unwrap();
    }

    /// Puts 5 units of `product` on its shelf, expiring `days` after day 10.
    async fn stock(db: &Arc<Database>, catalog: &CatalogSnapshot, product: &Product, days: i64) {
        let mut tx = db.begin().await.unwrap();
        batch::add_warehouse_batch(
            &mut tx,
            &NewWarehouseBatch {
                warehouse_id: catalog.warehouse.id,
                product_id: product.id,
                quantity: 5,
                import_date: day(1),
                expiry_date: Some(day(10) + Duration::days(days)),
                import_price: product.import_price,
            },
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let shelf_id = catalog.shelf_for(product).unwrap();
        TransferExecutor::new(db.clone(), 7)
            .transfer(product, shelf_id, 5, catalog.transfer_employee().id, day(1), AllocationPolicy::SingleBatch)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_closest_satisfied_rule_wins() {
        let (db, _) = setup().await;
        let base = CatalogSnapshot::load(&db).await.unwrap();
        let category_id = base.products[0].category_id;
        add_rule(&db, category_id, 5, 50).await;
        add_rule(&db, category_id, 15, 20).await;
        let catalog = Arc::new(CatalogSnapshot::load(&db).await.unwrap());

        let same_category: Vec<Product> = catalog
            .products
            .iter()
            .filter(|p| p.category_id == category_id)
            .take(3)
            .cloned()
            .collect();
        assert_eq!(same_category.len(), 3);
        for (product, days) in same_category.iter().zip([3, 10, 20]) {
            stock(&db, &catalog, product, days).await;
        }

        let engine = DiscountEngine::new(db.clone(), catalog.clone());
        let report = engine.apply_discounts(day(10), 30).await.unwrap();
        assert_eq!(report.discounted, 2);
        assert_eq!(report.flagged_only, 1);

        let expected = [(50, true), (20, true), (0, true)];
        for (product, (pct, near)) in same_category.iter().zip(expected) {
            let shelf_id = catalog.shelf_for(product).unwrap();
            let b = &db.batches().shelf_batches(shelf_id, product.id).await.unwrap()[0];
            assert_eq!(b.discount, DiscountRate::from_percent(pct));
            assert_eq!(b.is_near_expiry, near);
            if pct > 0 {
                assert_eq!(
                    b.current_price,
                    product.import_price.apply_discount(DiscountRate::from_percent(pct))
                );
            } else {
                assert_eq!(b.current_price, product.selling_price);
            }
        }
    }

    #[tokio::test]
    async fn test_outside_window_untouched() {
        let (db, catalog) = setup().await;
        let product = catalog.products[0].clone();
        add_rule(&db, product.category_id, 60, 10).await;
        let catalog = Arc::new(CatalogSnapshot::load(&db).await.unwrap());
        stock(&db, &catalog, &product, 45).await;

        let report = DiscountEngine::new(db.clone(), catalog.clone())
            .apply_discounts(day(10), 30)
            .await
            .unwrap();
        assert_eq!(report, DiscountReport { examined: 1, discounted: 0, flagged_only: 0 });

        let shelf_id = catalog.shelf_for(&product).unwrap();
        let b = &db.batches().shelf_batches(shelf_id, product.id).await.unwrap()[0];
        assert!(!b.is_near_expiry);
        assert_eq!(b.current_price, product.selling_price);
    }

    #[tokio::test]
    async fn test_apply_twice_is_idempotent() {
        let (db, catalog) = setup().await;
        let product = catalog.products[0].clone();
        add_rule(&db, product.category_id, 7, 30).await;
        let catalog = Arc::new(CatalogSnapshot::load(&db).await.unwrap());
        stock(&db, &catalog, &product, 4).await;

        let engine = DiscountEngine::new(db.clone(), catalog.clone());
        let shelf_id = catalog.shelf_for(&product).unwrap();

        engine.apply_discounts(day(10), 30).await.unwrap();
        let first = db.batches().shelf_batches(shelf_id, product.id).await.unwrap();
        engine.apply_discounts(day(10), 30).await.unwrap();
        let second = db.batches().shelf_batches(shelf_id, product.id).await.unwrap();

        assert_eq!(first, second);
        assert!(first[0].current_price < product.import_price);
        assert_ne!(first[0].current_price, Money::zero());
    }
}

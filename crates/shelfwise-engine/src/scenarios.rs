//! # End-of-Run Scenarios
//!
//! On the last few simulated days, pushes some stock into states that a
//! normal run rarely reaches, so the summary has expired, near-expiry and
//! out-of-stock rows to report.
//!
//! ```text
//! products with shelf stock ──┬── N expired:     one batch, expiry = today - 1..=5
//!                             └── M near-expiry: one batch, expiry = today + 1..=7
//! products with warehouse stock ── K zeroed:     every warehouse batch = 0
//! ```
//!
//! Each product is picked at most once per pass. Shelf aggregates of the
//! moved batches are refreshed in the same transaction.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::ScenarioSettings;
use crate::error::EngineResult;
use shelfwise_db::repository::{aggregate, batch};
use shelfwise_db::{Database, DbError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    pub expired: Vec<i64>,
    pub near_expiry: Vec<i64>,
    pub warehouse_zeroed: Vec<i64>,
}

impl ScenarioReport {
    pub fn is_empty(&self) -> bool {
        self.expired.is_empty() && self.near_expiry.is_empty() && self.warehouse_zeroed.is_empty()
    }
}

pub struct ScenarioInjector {
    db: Arc<Database>,
    settings: ScenarioSettings,
    window_days: i64,
}

impl ScenarioInjector {
    pub fn new(db: Arc<Database>, settings: ScenarioSettings, window_days: i64) -> Self {
        ScenarioInjector {
            db,
            settings,
            window_days,
        }
    }

    /// True when `today` falls in the final `tail_days` of a run ending on `end`.
    pub fn is_active(&self, today: NaiveDate, end: NaiveDate) -> bool {
        let remaining = (end - today).num_days();
        self.settings.enabled && remaining >= 0 && remaining < self.settings.tail_days
    }

    pub async fn inject<R: Rng + ?Sized>(
        &self,
        today: NaiveDate,
        product_ids: &[i64],
        rng: &mut R,
    ) -> EngineResult<ScenarioReport> {
        let mut report = ScenarioReport::default();
        let mut tx = self.db.begin().await?;

        let live = batch::live_shelf_batches(&mut tx).await?;
        let mut shelf_products: Vec<i64> = live
            .iter()
            .map(|b| b.product_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        shelf_products.shuffle(rng);

        let mut touched: BTreeSet<(i64, i64)> = BTreeSet::new();
        let mut picks = shelf_products.into_iter();

        for (count, ahead, into) in [
            (self.settings.expired_products, false, &mut report.expired),
            (self.settings.near_expiry_products, true, &mut report.near_expiry),
        ] {
            for product_id in picks.by_ref().take(count) {
                let Some(target) = live.iter().find(|b| b.product_id == product_id) else {
                    continue;
                };
                let expiry = if ahead {
                    today + Duration::days(rng.gen_range(1..=7))
                } else {
                    today - Duration::days(rng.gen_range(1..=5))
                };
                batch::set_shelf_batch_expiry(&mut tx, target.id, expiry).await?;
                touched.insert((target.shelf_id, target.product_id));
                into.push(product_id);
                debug!(product_id, shelf_batch_id = target.id, %expiry, "Moved shelf batch expiry");
            }
        }

        let mut stocked = Vec::new();
        for &product_id in product_ids {
            if batch::warehouse_quantity(&mut tx, product_id).await? > 0 {
                stocked.push(product_id);
            }
        }
        for &product_id in stocked.choose_multiple(rng, self.settings.warehouse_zero_products) {
            batch::zero_warehouse_stock(&mut tx, product_id).await?;
            report.warehouse_zeroed.push(product_id);
            debug!(product_id, "Zeroed warehouse stock");
        }

        for (shelf_id, product_id) in &touched {
            aggregate::refresh(&mut tx, *shelf_id, *product_id, today, self.window_days).await?;
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            %today,
            expired = report.expired.len(),
            near_expiry = report.near_expiry.len(),
            warehouse_zeroed = report.warehouse_zeroed.len(),
            "Injected end-of-run scenarios"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shelfwise_core::AllocationPolicy;
    use shelfwise_db::{seed_master_data, DbConfig, NewWarehouseBatch};

    use crate::catalog::CatalogSnapshot;
    use crate::transfer::TransferExecutor;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, d).unwrap()
    }

    #[tokio::test]
    async fn test_inject_moves_expiries_and_zeroes_warehouse() {
        let db = Arc::new(Database::new(DbConfig::in_memory()).await.unwrap());
        seed_master_data(&db).await.unwrap();
        let catalog = CatalogSnapshot::load(&db).await.unwrap();
        let transfers = TransferExecutor::new(db.clone(), 7);

        let products: Vec<_> = catalog.products.iter().take(8).cloned().collect();
        for product in &products {
            let mut tx = db.begin().await.unwrap();
            batch::add_warehouse_batch(
                &mut tx,
                &NewWarehouseBatch {
                    warehouse_id: catalog.warehouse.id,
                    product_id: product.id,
                    quantity: 20,
                    import_date: day(1),
                    expiry_date: Some(day(1) + Duration::days(60)),
                    import_price: product.import_price,
                },
            )
            .await
            .unwrap();
            tx.commit().await.unwrap();
            let shelf_id = catalog.shelf_for(product).unwrap();
            transfers
                .transfer(product, shelf_id, 10, catalog.transfer_employee().id, day(1), AllocationPolicy::SingleBatch)
                .await
                .unwrap();
        }

        let injector = ScenarioInjector::new(db.clone(), ScenarioSettings::default(), 7);
        assert!(injector.is_active(day(29), day(30)));
        assert!(!injector.is_active(day(20), day(30)));

        let ids: Vec<i64> = products.iter().map(|p| p.id).collect();
        let mut rng = StdRng::seed_from_u64(21);
        let today = day(28);
        let report = injector.inject(today, &ids, &mut rng).await.unwrap();

        assert_eq!(report.expired.len(), 2);
        assert_eq!(report.near_expiry.len(), 3);
        assert_eq!(report.warehouse_zeroed.len(), 2);
        let distinct: BTreeSet<i64> = report.expired.iter().chain(&report.near_expiry).copied().collect();
        assert_eq!(distinct.len(), 5);

        for product_id in &report.warehouse_zeroed {
            assert_eq!(db.batches().warehouse_quantity(*product_id).await.unwrap(), 0);
        }

        let reports = db.reports();
        assert_eq!(reports.expired_batches(today).await.unwrap(), 2);
        assert!(reports.near_expiry_batches(today, 7).await.unwrap() >= 3);

        for product_id in &report.expired {
            let product = catalog.product(*product_id).unwrap();
            let shelf_id = catalog.shelf_for(product).unwrap();
            let agg = db.aggregates().get(shelf_id, *product_id).await.unwrap().unwrap();
            assert_eq!(agg.expired_quantity, 10);
        }
        assert!(db.aggregates().drift().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inject_on_empty_store_is_harmless() {
        let db = Arc::new(Database::new(DbConfig::in_memory()).await.unwrap());
        let injector = ScenarioInjector::new(db.clone(), ScenarioSettings::default(), 7);
        let mut rng = StdRng::seed_from_u64(1);
        let report = injector.inject(day(30), &[], &mut rng).await.unwrap();
        assert!(report.is_empty());
    }
}

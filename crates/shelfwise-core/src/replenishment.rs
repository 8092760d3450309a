//! # Replenishment Rules
//!
//! Demand targets, reorder and restock thresholds, and the per-run state the
//! daily control loop keeps per product.
//!
//! ## Thresholds (defaults)
//! ```text
//! ┌────────────────────────────────────────────────────────────────────────┐
//! │  target T drawn once per product from its category band                │
//! │                                                                        │
//! │  day 0     order   max(1, T)            transfer max(1, qty × 80%)     │
//! │  day ≥ 1   reorder when warehouse < max(1, T × 1)                      │
//! │                    and last reorder ≥ cooldown days ago                │
//! │            order   max(1, T × 2)                                       │
//! │            restock when shelf < max(1, T × 30%)                        │
//! │            needed  T − shelf                                           │
//! └────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::NaiveDate;
use rand::Rng;
use serde::{Deserialize, Serialize};

// =============================================================================
// Demand
// =============================================================================

/// Inclusive range of daily units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitBand {
    pub min: i64,
    pub max: i64,
}

impl UnitBand {
    pub const fn new(min: i64, max: i64) -> Self {
        UnitBand { min, max }
    }

    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        if self.max <= self.min {
            return self.min;
        }
        rng.gen_range(self.min..=self.max)
    }
}

/// Maps a category to a volume band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandProfile {
    /// Fast movers (food, beverages).
    pub high_volume_categories: Vec<i64>,
    /// Slow movers (electronics).
    pub low_volume_categories: Vec<i64>,
    pub high: UnitBand,
    pub medium: UnitBand,
    pub low: UnitBand,
}

impl Default for DemandProfile {
    fn default() -> Self {
        DemandProfile {
            high_volume_categories: vec![1, 2],
            low_volume_categories: vec![3],
            high: UnitBand::new(15, 34),
            medium: UnitBand::new(8, 19),
            low: UnitBand::new(2, 4),
        }
    }
}

impl DemandProfile {
    pub fn band_for(&self, category_id: i64) -> UnitBand {
        if self.high_volume_categories.contains(&category_id) {
            self.high
        } else if self.low_volume_categories.contains(&category_id) {
            self.low
        } else {
            self.medium
        }
    }
}

// =============================================================================
// Policy
// =============================================================================

/// Threshold multipliers applied to a product's daily target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplenishmentPolicy {
    /// Share of the day-0 order moved to the shelf, in percent.
    pub initial_shelf_percent: i64,
    /// Reorder when the warehouse holds fewer than this many days of demand.
    pub reorder_cover_days: i64,
    /// Reorders cover this many days of demand.
    pub order_cover_days: i64,
    /// Restock when the shelf holds less than this percent of a day.
    pub restock_threshold_percent: i64,
    /// Minimum days between two reorders of the same product.
    pub reorder_cooldown_days: i64,
}

impl Default for ReplenishmentPolicy {
    fn default() -> Self {
        ReplenishmentPolicy {
            initial_shelf_percent: 80,
            reorder_cover_days: 1,
            order_cover_days: 2,
            restock_threshold_percent: 30,
            reorder_cooldown_days: 2,
        }
    }
}

impl ReplenishmentPolicy {
    pub fn initial_order_quantity(&self, target: i64) -> i64 {
        target.max(1)
    }

    pub fn initial_transfer_quantity(&self, ordered: i64) -> i64 {
        (ordered * self.initial_shelf_percent / 100).max(1)
    }

    pub fn reorder_point(&self, target: i64) -> i64 {
        (target * self.reorder_cover_days).max(1)
    }

    pub fn order_quantity(&self, target: i64) -> i64 {
        (target * self.order_cover_days).max(1)
    }

    pub fn restock_point(&self, target: i64) -> i64 {
        (target * self.restock_threshold_percent / 100).max(1)
    }

    /// Units the shelf should receive, or `None` when it is stocked enough.
    pub fn restock_need(&self, target: i64, shelf_quantity: i64) -> Option<i64> {
        if shelf_quantity >= self.restock_point(target) {
            return None;
        }
        let needed = target - shelf_quantity;
        (needed > 0).then_some(needed)
    }
}

// =============================================================================
// Controller State
// =============================================================================

/// Per-run memory of the control loop, keyed by product id.
#[derive(Debug, Clone, Default)]
pub struct ControllerState {
    targets: HashMap<i64, i64>,
    last_reorder: HashMap<i64, NaiveDate>,
}

impl ControllerState {
    /// Draws a daily target for every `(product_id, category_id)` pair.
    pub fn new<R: Rng + ?Sized>(
        products: impl IntoIterator<Item = (i64, i64)>,
        profile: &DemandProfile,
        rng: &mut R,
    ) -> Self {
        let targets = products
            .into_iter()
            .map(|(product_id, category_id)| (product_id, profile.band_for(category_id).draw(rng)))
            .collect();
        ControllerState {
            targets,
            last_reorder: HashMap::new(),
        }
    }

    /// Daily target, zero for unknown products.
    pub fn target(&self, product_id: i64) -> i64 {
        self.targets.get(&product_id).copied().unwrap_or(0)
    }

    pub fn last_reorder(&self, product_id: i64) -> Option<NaiveDate> {
        self.last_reorder.get(&product_id).copied()
    }

    /// True unless the product was reordered fewer than `cooldown_days` ago.
    pub fn can_reorder(&self, product_id: i64, today: NaiveDate, cooldown_days: i64) -> bool {
        match self.last_reorder(product_id) {
            Some(last) => (today - last).num_days() >= cooldown_days,
            None => true,
        }
    }

    pub fn record_reorder(&mut self, product_id: i64, today: NaiveDate) {
        self.last_reorder.insert(product_id, today);
    }

    /// Full reorder decision for one product.
    pub fn should_reorder(
        &self,
        policy: &ReplenishmentPolicy,
        product_id: i64,
        warehouse_quantity: i64,
        today: NaiveDate,
    ) -> bool {
        let target = self.target(product_id);
        warehouse_quantity < policy.reorder_point(target)
            && self.can_reorder(product_id, today, policy.reorder_cooldown_days)
    }
}

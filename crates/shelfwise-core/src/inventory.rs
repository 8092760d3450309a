//! # Batch Inventory Model
//!
//! Warehouse batches, shelf batches, the per-shelf aggregate derived from
//! them, and the FIFO allocation planner used by transfers.
//!
//! ## Two Echelons
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Supplier ──order──► WarehouseBatch ──transfer──► ShelfBatch ──sale──► │
//! │                        (BATCH...0042)               (same code)         │
//! │                                                      │                  │
//! │                                                      ▼ refresh          │
//! │                                               ShelfAggregate            │
//! │                                      current = Σ batch.quantity         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The aggregate is a cache. [`ShelfAggregate::fold`] is the only way one is
//! computed, and the store calls it inside the same transaction as every
//! batch mutation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::DiscountRate;

// =============================================================================
// Batches
// =============================================================================

/// A received lot of one product sitting in a warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct WarehouseBatch {
    pub id: i64,
    pub warehouse_id: i64,
    pub product_id: i64,
    pub batch_code: String,
    pub quantity: i64,
    pub import_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub import_price: Money,
}

/// Units of one batch placed on a display shelf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ShelfBatch {
    pub id: i64,
    pub shelf_id: i64,
    pub product_id: i64,
    pub batch_code: String,
    pub quantity: i64,
    pub expiry_date: Option<NaiveDate>,
    /// First day this batch appeared on the shelf.
    pub stocked_date: NaiveDate,
    /// Most recent day units of this batch were added.
    pub restocked_date: NaiveDate,
    pub import_price: Money,
    /// Price charged at the till. Equals the product's selling price until
    /// the discount engine marks it down.
    pub current_price: Money,
    pub discount: DiscountRate,
    pub is_near_expiry: bool,
}

/// Price data carried from an order or transfer into a new batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceInfo {
    pub import_price: Money,
    pub current_price: Money,
}

/// Whole days from `today` until `expiry`. Negative once expired.
pub fn days_to_expiry(expiry: Option<NaiveDate>, today: NaiveDate) -> Option<i64> {
    expiry.map(|date| (date - today).num_days())
}

// =============================================================================
// Shelf Aggregate
// =============================================================================

/// Denormalised per-(shelf, product) summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ShelfAggregate {
    pub shelf_id: i64,
    pub product_id: i64,
    pub current_quantity: i64,
    /// Units whose expiry is 1..=window days away.
    pub near_expiry_quantity: i64,
    /// Units whose expiry date is before today.
    pub expired_quantity: i64,
    pub earliest_expiry: Option<NaiveDate>,
    pub latest_expiry: Option<NaiveDate>,
    pub last_restocked: Option<NaiveDate>,
}

impl ShelfAggregate {
    /// Recomputes the aggregate from the complete batch set of one pair.
    ///
    /// ## Rules
    /// - `current_quantity` = Σ quantity over every batch
    /// - a unit is near-expiry when `0 < days_to_expiry <= window_days`
    /// - a unit is expired when `days_to_expiry < 0`
    /// - earliest/latest expiry only consider batches with stock
    /// - `last_restocked` is the latest `restocked_date` of any batch
    ///
    /// Batches belonging to a different pair are ignored.
    pub fn fold(
        shelf_id: i64,
        product_id: i64,
        batches: &[ShelfBatch],
        today: NaiveDate,
        window_days: i64,
    ) -> ShelfAggregate {
        let mut aggregate = ShelfAggregate {
            shelf_id,
            product_id,
            current_quantity: 0,
            near_expiry_quantity: 0,
            expired_quantity: 0,
            earliest_expiry: None,
            latest_expiry: None,
            last_restocked: None,
        };

        for batch in batches
            .iter()
            .filter(|b| b.shelf_id == shelf_id && b.product_id == product_id)
        {
            aggregate.current_quantity += batch.quantity;
            aggregate.last_restocked = aggregate.last_restocked.max(Some(batch.restocked_date));

            if batch.quantity <= 0 {
                continue;
            }

            if let Some(days) = days_to_expiry(batch.expiry_date, today) {
                if days < 0 {
                    aggregate.expired_quantity += batch.quantity;
                } else if days > 0 && days <= window_days {
                    aggregate.near_expiry_quantity += batch.quantity;
                }
            }

            if let Some(expiry) = batch.expiry_date {
                aggregate.earliest_expiry = Some(match aggregate.earliest_expiry {
                    Some(current) => current.min(expiry),
                    None => expiry,
                });
                aggregate.latest_expiry = aggregate.latest_expiry.max(Some(expiry));
            }
        }

        aggregate
    }
}

// =============================================================================
// FIFO Allocation
// =============================================================================

/// How a transfer may draw from warehouse batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationPolicy {
    /// Take everything from the first FIFO batch or fail.
    #[default]
    SingleBatch,
    /// Walk FIFO order across batches until the request is covered or fail.
    SpanBatches,
}

impl std::fmt::Display for AllocationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AllocationPolicy::SingleBatch => write!(f, "single_batch"),
            AllocationPolicy::SpanBatches => write!(f, "span_batches"),
        }
    }
}

impl std::str::FromStr for AllocationPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "single_batch" | "single" => Ok(AllocationPolicy::SingleBatch),
            "span_batches" | "span" => Ok(AllocationPolicy::SpanBatches),
            other => Err(CoreError::Configuration(format!(
                "Unknown allocation policy: '{}'. Valid options: single_batch, span_batches",
                other
            ))),
        }
    }
}

/// One slice of a transfer: `quantity` units out of `batch_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub batch_id: i64,
    pub batch_code: String,
    pub quantity: i64,
    pub expiry_date: Option<NaiveDate>,
    pub import_price: Money,
}

/// Sorts batches into FIFO order: earliest expiry first, batches without an
/// expiry last, ties broken by batch code then id.
pub fn fifo_order(batches: &mut [WarehouseBatch]) {
    batches.sort_by(|a, b| {
        let expiry_key = |d: Option<NaiveDate>| (d.is_none(), d);
        expiry_key(a.expiry_date)
            .cmp(&expiry_key(b.expiry_date))
            .then_with(|| a.batch_code.cmp(&b.batch_code))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Plans which batches a transfer of `requested` units consumes.
///
/// ## Contract
/// - `requested == 0` → empty plan (no-op, not an error)
/// - `requested < 0`  → `NegativeQuantity`
/// - not enough stock under the policy → `InsufficientStock`, nothing planned
/// - otherwise the plan drains earlier batches completely before touching
///   later ones and sums exactly to `requested`
pub fn plan_fifo_allocation(
    batches: &[WarehouseBatch],
    requested: i64,
    policy: AllocationPolicy,
) -> CoreResult<Vec<Allocation>> {
    if requested < 0 {
        return Err(CoreError::NegativeQuantity {
            field: "transfer quantity".to_string(),
            value: requested,
        });
    }
    if requested == 0 {
        return Ok(Vec::new());
    }

    let mut ordered: Vec<WarehouseBatch> =
        batches.iter().filter(|b| b.quantity > 0).cloned().collect();
    fifo_order(&mut ordered);

    let product_ref = batches
        .first()
        .map(|b| format!("product {}", b.product_id))
        .unwrap_or_else(|| "product".to_string());

    match policy {
        AllocationPolicy::SingleBatch => {
            let first = ordered
                .first()
                .ok_or_else(|| CoreError::insufficient("warehouse", &product_ref, 0, requested))?;
            if first.quantity < requested {
                return Err(CoreError::insufficient(
                    "warehouse_batch",
                    &first.batch_code,
                    first.quantity,
                    requested,
                ));
            }
            Ok(vec![allocation_from(first, requested)])
        }
        AllocationPolicy::SpanBatches => {
            let available: i64 = ordered.iter().map(|b| b.quantity).sum();
            if available < requested {
                return Err(CoreError::insufficient(
                    "warehouse",
                    &product_ref,
                    available,
                    requested,
                ));
            }

            let mut remaining = requested;
            let mut plan = Vec::new();
            for batch in &ordered {
                if remaining == 0 {
                    break;
                }
                let take = remaining.min(batch.quantity);
                plan.push(allocation_from(batch, take));
                remaining -= take;
            }
            Ok(plan)
        }
    }
}

fn allocation_from(batch: &WarehouseBatch, quantity: i64) -> Allocation {
    Allocation {
        batch_id: batch.id,
        batch_code: batch.batch_code.clone(),
        quantity,
        expiry_date: batch.expiry_date,
        import_price: batch.import_price,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, d).unwrap()
    }

    fn wh(id: i64, code: &str, qty: i64, expiry: Option<NaiveDate>) -> WarehouseBatch {
        WarehouseBatch {
            id,
            warehouse_id: 1,
            product_id: 42,
            batch_code: code.to_string(),
            quantity: qty,
            import_date: day(1),
            expiry_date: expiry,
            import_price: Money::from_units(10_000),
        }
    }

    fn shelf(id: i64, qty: i64, expiry: Option<NaiveDate>) -> ShelfBatch {
        ShelfBatch {
            id,
            shelf_id: 3,
            product_id: 42,
            batch_code: format!("B{id}"),
            quantity: qty,
            expiry_date: expiry,
            stocked_date: day(1),
            restocked_date: day(id as u32),
            import_price: Money::from_units(10_000),
            current_price: Money::from_units(15_000),
            discount: DiscountRate::zero(),
            is_near_expiry: false,
        }
    }

    #[test]
    fn test_fifo_order_earliest_expiry_then_code() {
        let mut batches = vec![
            wh(1, "B", 5, Some(day(20))),
            wh(2, "A", 5, None),
            wh(3, "C", 5, Some(day(10))),
            wh(4, "A", 5, Some(day(20))),
        ];
        fifo_order(&mut batches);
        let codes: Vec<_> = batches.iter().map(|b| (b.id, b.batch_code.as_str())).collect();
        assert_eq!(codes, vec![(3, "C"), (4, "A"), (1, "B"), (2, "A")]);
    }

    #[test]
    fn test_single_batch_takes_first_fifo_batch() {
        let batches = vec![wh(1, "LATE", 50, Some(day(25))), wh(2, "EARLY", 10, Some(day(5)))];
        let plan = plan_fifo_allocation(&batches, 8, AllocationPolicy::SingleBatch).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].batch_id, 2);
        assert_eq!(plan[0].quantity, 8);
    }

    #[test]
    fn test_single_batch_fails_instead_of_partial() {
        let batches = vec![wh(1, "EARLY", 10, Some(day(3))), wh(2, "LATE", 10, Some(day(11)))];
        let err = plan_fifo_allocation(&batches, 15, AllocationPolicy::SingleBatch).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock { available: 10, requested: 15, .. }
        ));
    }

    #[test]
    fn test_span_batches_drains_earliest_first() {
        // 10 @ +2d and 10 @ +10d, transfer 15 → first drained, second gives 5
        let batches = vec![wh(2, "LATE", 10, Some(day(11))), wh(1, "EARLY", 10, Some(day(3)))];
        let plan = plan_fifo_allocation(&batches, 15, AllocationPolicy::SpanBatches).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!((plan[0].batch_id, plan[0].quantity), (1, 10));
        assert_eq!((plan[1].batch_id, plan[1].quantity), (2, 5));
    }

    #[test]
    fn test_zero_and_negative_requests() {
        let batches = vec![wh(1, "A", 10, Some(day(3)))];
        assert!(plan_fifo_allocation(&batches, 0, AllocationPolicy::SingleBatch)
            .unwrap()
            .is_empty());
        assert!(matches!(
            plan_fifo_allocation(&batches, -1, AllocationPolicy::SpanBatches),
            Err(CoreError::NegativeQuantity { .. })
        ));
    }

    #[test]
    fn test_empty_warehouse_is_insufficient() {
        let batches = vec![wh(1, "A", 0, Some(day(3)))];
        assert!(matches!(
            plan_fifo_allocation(&batches, 1, AllocationPolicy::SingleBatch),
            Err(CoreError::InsufficientStock { available: 0, .. })
        ));
    }

    #[test]
    fn test_allocation_policy_parse() {
        assert_eq!("span".parse::<AllocationPolicy>().unwrap(), AllocationPolicy::SpanBatches);
        assert_eq!(
            "Single-Batch".parse::<AllocationPolicy>().unwrap(),
            AllocationPolicy::SingleBatch
        );
        assert!("greedy".parse::<AllocationPolicy>().is_err());
        assert_eq!(AllocationPolicy::SpanBatches.to_string(), "span_batches");
    }

    #[test]
    fn test_aggregate_fold_classifies_units() {
        let today = day(10);
        let batches = vec![
            shelf(1, 4, Some(day(8))),  // expired
            shelf(2, 6, Some(day(13))), // near expiry (3 days)
            shelf(3, 5, Some(day(30))), // fresh
            shelf(4, 2, Some(day(10))), // expires today: neither bucket
            shelf(5, 0, Some(day(1))),  // drained, ignored for expiry stats
        ];
        let agg = ShelfAggregate::fold(3, 42, &batches, today, 7);
        assert_eq!(agg.current_quantity, 17);
        assert_eq!(agg.expired_quantity, 4);
        assert_eq!(agg.near_expiry_quantity, 6);
        assert_eq!(agg.earliest_expiry, Some(day(8)));
        assert_eq!(agg.latest_expiry, Some(day(30)));
        assert_eq!(agg.last_restocked, Some(day(5)));
    }

    #[test]
    fn test_aggregate_fold_ignores_other_pairs() {
        let mut other = shelf(9, 100, None);
        other.shelf_id = 99;
        let agg = ShelfAggregate::fold(3, 42, &[shelf(1, 3, None), other], day(1), 7);
        assert_eq!(agg.current_quantity, 3);
        assert_eq!(agg.earliest_expiry, None);
    }

    proptest! {
        /// A span plan never over-draws a batch, sums to the request, and
        /// only touches a later batch once every earlier one is empty.
        #[test]
        fn span_plan_is_fifo_and_exact(
            quantities in prop::collection::vec(0i64..50, 1..8),
            requested in 0i64..200,
        ) {
            let batches: Vec<_> = quantities
                .iter()
                .enumerate()
                .map(|(i, q)| wh(i as i64 + 1, &format!("B{i:02}"), *q, Some(day(1 + i as u32))))
                .collect();
            let total: i64 = quantities.iter().sum();

            match plan_fifo_allocation(&batches, requested, AllocationPolicy::SpanBatches) {
                Ok(plan) => {
                    prop_assert!(requested <= total);
                    prop_assert_eq!(plan.iter().map(|a| a.quantity).sum::<i64>(), requested);
                    for (idx, slice) in plan.iter().enumerate() {
                        let source = batches.iter().find(|b| b.id == slice.batch_id).unwrap();
                        prop_assert!(slice.quantity > 0 && slice.quantity <= source.quantity);
                        if idx + 1 < plan.len() {
                            prop_assert_eq!(slice.quantity, source.quantity);
                        }
                    }
                }
                Err(_) => prop_assert!(requested > total),
            }
        }

        /// The aggregate's current quantity always equals the batch sum.
        #[test]
        fn aggregate_matches_batch_sum(quantities in prop::collection::vec(0i64..500, 0..12)) {
            let batches: Vec<_> = quantities
                .iter()
                .enumerate()
                .map(|(i, q)| shelf(i as i64 + 1, *q, Some(day(1 + (i as u32 % 28)))))
                .collect();
            let agg = ShelfAggregate::fold(3, 42, &batches, day(15), 7);
            prop_assert_eq!(agg.current_quantity, quantities.iter().sum::<i64>());
            prop_assert!(agg.expired_quantity + agg.near_expiry_quantity <= agg.current_quantity);
        }
    }
}

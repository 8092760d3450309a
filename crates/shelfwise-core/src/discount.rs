//! # Discount Rules
//!
//! Rule matching and markdown pricing for shelf batches close to expiry.
//!
//! ## Best Rule
//! ```text
//! rules for category:  ≤5d → 50%    ≤15d → 20%    ≤30d → 10%
//!
//!   days = 3   ──► candidates {5, 15, 30} ──► smallest = 5  ──► 50%
//!   days = 10  ──► candidates {15, 30}    ──► smallest = 15 ──► 20%
//!   days = 40  ──► no candidate           ──► 0%
//! ```
//!
//! Pricing is a pure function of `(import_price, rule)`, so reapplying the
//! same rules to the same batch always lands on the same price.

use chrono::NaiveDate;

use crate::inventory::{days_to_expiry, ShelfBatch};
use crate::money::Money;
use crate::types::{DiscountRate, DiscountRule};

/// Outcome of evaluating one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Markdown {
    /// Outside the window; leave the batch alone.
    NotEligible,
    /// Inside the window without a matching rule: flag only.
    FlagOnly,
    /// Inside the window with a rule: reprice and flag.
    Reprice {
        discount: DiscountRate,
        current_price: Money,
    },
}

/// Whether a batch with `days` left falls in `[0, window_days]`.
pub fn in_window(days: i64, window_days: i64) -> bool {
    (0..=window_days).contains(&days)
}

/// Closest rule still satisfied by `days`: among active rules of the
/// category with `days_before_expiry >= days`, the smallest threshold.
pub fn best_rule(rules: &[DiscountRule], category_id: i64, days: i64) -> Option<&DiscountRule> {
    rules
        .iter()
        .filter(|r| r.is_active && r.category_id == category_id && r.days_before_expiry >= days)
        .min_by_key(|r| (r.days_before_expiry, r.id))
}

/// Evaluates a batch against the category's rules.
pub fn markdown(
    batch: &ShelfBatch,
    category_id: i64,
    rules: &[DiscountRule],
    today: NaiveDate,
    window_days: i64,
) -> Markdown {
    if batch.quantity <= 0 {
        return Markdown::NotEligible;
    }
    let Some(days) = days_to_expiry(batch.expiry_date, today) else {
        return Markdown::NotEligible;
    };
    if !in_window(days, window_days) {
        return Markdown::NotEligible;
    }

    match best_rule(rules, category_id, days) {
        Some(rule) => Markdown::Reprice {
            discount: rule.discount,
            current_price: batch.import_price.apply_discount(rule.discount),
        },
        None => Markdown::FlagOnly,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn rule(id: i64, days: i64, pct: u32) -> DiscountRule {
        DiscountRule {
            id,
            category_id: 1,
            days_before_expiry: days,
            discount: DiscountRate::from_percent(pct),
            rule_name: None,
            is_active: true,
        }
    }

    fn batch(days_left: i64) -> (ShelfBatch, NaiveDate) {
        let today = NaiveDate::from_ymd_opt(2025, 9, 10).unwrap();
        let b = ShelfBatch {
            id: 1,
            shelf_id: 1,
            product_id: 1,
            batch_code: "B".into(),
            quantity: 5,
            expiry_date: Some(today + Duration::days(days_left)),
            stocked_date: today,
            restocked_date: today,
            import_price: Money::from_units(10_000),
            current_price: Money::from_units(14_000),
            discount: DiscountRate::zero(),
            is_near_expiry: false,
        };
        (b, today)
    }

    #[test]
    fn test_rule_selection_scenario() {
        let rules = vec![rule(1, 5, 50), rule(2, 15, 20)];
        assert_eq!(best_rule(&rules, 1, 3).map(|r| r.id), Some(1));
        assert_eq!(best_rule(&rules, 1, 10).map(|r| r.id), Some(2));
        assert_eq!(best_rule(&rules, 1, 20), None);
    }

    #[test]
    fn test_inactive_and_foreign_rules_ignored() {
        let mut inactive = rule(1, 5, 50);
        inactive.is_active = false;
        let mut other = rule(2, 5, 70);
        other.category_id = 9;
        assert!(best_rule(&[inactive, other], 1, 2).is_none());
    }

    #[test]
    fn test_markdown_reprices_from_import_price() {
        let rules = vec![rule(1, 5, 50), rule(2, 15, 20)];
        let (b, today) = batch(3);
        assert_eq!(
            markdown(&b, 1, &rules, today, 30),
            Markdown::Reprice {
                discount: DiscountRate::from_percent(50),
                current_price: Money::from_units(5_000),
            }
        );

        let (b, today) = batch(20);
        assert_eq!(markdown(&b, 1, &rules, today, 30), Markdown::FlagOnly);

        let (b, today) = batch(45);
        assert_eq!(markdown(&b, 1, &rules, today, 30), Markdown::NotEligible);
    }

    #[test]
    fn test_expired_and_empty_batches_not_eligible() {
        let rules = vec![rule(1, 5, 50)];
        let (b, today) = batch(-1);
        assert_eq!(markdown(&b, 1, &rules, today, 30), Markdown::NotEligible);

        let (mut b, today) = batch(2);
        b.quantity = 0;
        assert_eq!(markdown(&b, 1, &rules, today, 30), Markdown::NotEligible);
    }

    proptest! {
        #[test]
        fn markdown_is_idempotent(days in -5i64..40, pct in 0u32..=100) {
            let rules = vec![rule(1, 7, pct), rule(2, 21, pct / 2)];
            let (mut b, today) = batch(days);

            let first = markdown(&b, 1, &rules, today, 30);
            if let Markdown::Reprice { discount, current_price } = first {
                b.discount = discount;
                b.current_price = current_price;
                b.is_near_expiry = true;
            }
            prop_assert_eq!(markdown(&b, 1, &rules, today, 30), first);
        }
    }
}

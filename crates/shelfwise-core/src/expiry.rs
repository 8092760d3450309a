//! # Expiry Policy
//!
//! Decides the expiry date stamped on a freshly received warehouse batch.
//!
//! ```text
//! remaining = end_date − current_date
//!
//!   remaining > tail_days ──► current + shelf_life (or default_shelf_life)
//!
//!   remaining ≤ tail_days ──► roll r ∈ [0, 100)
//!        r < expired_pct                    → current − 1..=3 days
//!        r < expired_pct + near_expiry_pct  → current + 1..=7 days
//!        otherwise                          → current + shelf_life
//! ```
//!
//! The tail injection makes sure a short run still produces expired and
//! near-expiry stock for the discount engine and the run summary.

use chrono::{Duration, NaiveDate};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Which branch of the policy produced a date. Logged by the order executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryRoll {
    Normal,
    ForcedExpired,
    ForcedNearExpiry,
}

/// Tunables for [`ExpiryPolicy::compute`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryPolicy {
    /// Shelf life used when a product has none.
    pub default_shelf_life_days: i64,
    /// Injection starts when this many days or fewer remain.
    pub tail_days: i64,
    /// Percent chance of an already-expired date inside the tail.
    pub expired_percent: u32,
    /// Percent chance of a near-expiry date inside the tail.
    pub near_expiry_percent: u32,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        ExpiryPolicy {
            default_shelf_life_days: 90,
            tail_days: 5,
            expired_percent: 15,
            near_expiry_percent: 15,
        }
    }
}

impl ExpiryPolicy {
    /// Computes the expiry for a product received on `current`.
    pub fn compute<R: Rng + ?Sized>(
        &self,
        shelf_life_days: Option<i64>,
        current: NaiveDate,
        end: NaiveDate,
        rng: &mut R,
    ) -> (NaiveDate, ExpiryRoll) {
        let remaining = (end - current).num_days();

        if remaining <= self.tail_days {
            let roll = rng.gen_range(0..100u32);
            if roll < self.expired_percent {
                let back = rng.gen_range(1..=3);
                return (current - Duration::days(back), ExpiryRoll::ForcedExpired);
            }
            if roll < self.expired_percent + self.near_expiry_percent {
                let ahead = rng.gen_range(1..=7);
                return (current + Duration::days(ahead), ExpiryRoll::ForcedNearExpiry);
            }
        }

        let life = shelf_life_days
            .filter(|d| *d > 0)
            .unwrap_or(self.default_shelf_life_days);
        (current + Duration::days(life), ExpiryRoll::Normal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    #[test]
    fn test_normal_uses_shelf_life() {
        let mut rng = StdRng::seed_from_u64(1);
        let policy = ExpiryPolicy::default();
        let (expiry, roll) = policy.compute(Some(30), date(9, 1), date(9, 30), &mut rng);
        assert_eq!(expiry, date(10, 1));
        assert_eq!(roll, ExpiryRoll::Normal);
    }

    #[test]
    fn test_missing_shelf_life_falls_back_to_default() {
        let mut rng = StdRng::seed_from_u64(1);
        let policy = ExpiryPolicy::default();
        let (expiry, _) = policy.compute(None, date(9, 1), date(9, 30), &mut rng);
        assert_eq!(expiry, date(9, 1) + Duration::days(90));
    }

    #[test]
    fn test_tail_produces_forced_dates_within_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let policy = ExpiryPolicy::default();
        let today = date(9, 27);
        let mut expired = 0;
        let mut near = 0;

        for _ in 0..1_000 {
            let (expiry, roll) = policy.compute(Some(60), today, date(9, 30), &mut rng);
            let days = (expiry - today).num_days();
            match roll {
                ExpiryRoll::ForcedExpired => {
                    expired += 1;
                    assert!((-3..=-1).contains(&days));
                }
                ExpiryRoll::ForcedNearExpiry => {
                    near += 1;
                    assert!((1..=7).contains(&days));
                }
                ExpiryRoll::Normal => assert_eq!(days, 60),
            }
        }

        // 15% each over 1000 draws
        assert!((80..=220).contains(&expired), "expired = {expired}");
        assert!((80..=220).contains(&near), "near = {near}");
    }

    #[test]
    fn test_no_injection_outside_tail() {
        let mut rng = StdRng::seed_from_u64(9);
        let policy = ExpiryPolicy::default();
        for _ in 0..200 {
            let (_, roll) = policy.compute(Some(10), date(9, 1), date(9, 30), &mut rng);
            assert_eq!(roll, ExpiryRoll::Normal);
        }
    }
}

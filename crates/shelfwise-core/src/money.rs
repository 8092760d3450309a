//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  import_price × (1 − 30/100) with f64:                                 │
//! │    12_345.0 × 0.7 = 8641.499999999999  ❌ off by a rounding step        │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units + basis points                       │
//! │    12_345 × (10_000 − 3_000) / 10_000 = 8_641.5 → 8_642 (half up)      │
//! │    Every price, subtotal and tax is an exact i64                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The store trades in VND, which has no subunit in practice, so one minor
//! unit is one dong. Nothing here assumes a currency though.
//!
//! ## Usage
//! ```rust
//! use shelfwise_core::money::Money;
//! use shelfwise_core::types::TaxRate;
//!
//! let unit = Money::from_units(20_000);
//! let subtotal = unit.multiply_quantity(3);
//! let tax = subtotal.calculate_tax(TaxRate::from_bps(1_000));
//!
//! assert_eq!(subtotal.units(), 60_000);
//! assert_eq!(tax.units(), 6_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use crate::types::{DiscountRate, TaxRate};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: discounts and adjustments can be negative
/// - **Single field tuple struct**: zero-cost over i64, stored as INTEGER
/// - **Transparent sqlx type**: columns decode straight into `Money`
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.import_price ──► WarehouseBatch.import_price                   │
/// │          │                        │                                     │
/// │          │                        ▼                                     │
/// │          │               ShelfBatch.import_price ──► discount ──┐       │
/// │          ▼                                                      ▼       │
/// │  PurchaseOrderDetail.subtotal          ShelfBatch.current_price         │
/// │                                                 │                       │
/// │                                                 ▼                       │
/// │                   SalesInvoiceDetail.subtotal ──► invoice totals        │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use shelfwise_core::money::Money;
    ///
    /// let price = Money::from_units(15_500);
    /// assert_eq!(price.units(), 15_500);
    /// ```
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Money(units)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Calculates tax at the given rate, rounding half up.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`, widened to i128 so
    /// large invoice totals cannot overflow.
    ///
    /// ## Example
    /// ```rust
    /// use shelfwise_core::money::Money;
    /// use shelfwise_core::types::TaxRate;
    ///
    /// let subtotal = Money::from_units(60_000);
    /// let tax = subtotal.calculate_tax(TaxRate::from_bps(1_000)); // 10%
    /// assert_eq!(tax.units(), 6_000);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        Money(scale_bps(self.0, rate.bps()))
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use shelfwise_core::money::Money;
    ///
    /// let line = Money::from_units(20_000).multiply_quantity(3);
    /// assert_eq!(line.units(), 60_000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Returns the amount knocked off by a discount rate.
    pub fn discount_amount(&self, rate: DiscountRate) -> Money {
        Money(scale_bps(self.0, rate.bps()))
    }

    /// Applies a percentage discount and returns the discounted price.
    ///
    /// This is the markdown formula for shelf batches:
    /// `current_price = import_price × (1 − discount%/100)`.
    ///
    /// ## Example
    /// ```rust
    /// use shelfwise_core::money::Money;
    /// use shelfwise_core::types::DiscountRate;
    ///
    /// let import = Money::from_units(10_000);
    /// let marked_down = import.apply_discount(DiscountRate::from_bps(5_000)); // 50%
    /// assert_eq!(marked_down.units(), 5_000);
    /// ```
    pub fn apply_discount(&self, rate: DiscountRate) -> Money {
        *self - self.discount_amount(rate)
    }

    /// Integer division rounding toward negative infinity.
    ///
    /// Used for loyalty accrual: `floor(total / 10_000)` points.
    pub fn div_floor(&self, divisor: i64) -> i64 {
        if divisor == 0 {
            return 0;
        }
        self.0.div_euclid(divisor)
    }
}

/// `amount * bps / 10000` rounded half away from zero.
fn scale_bps(amount: i64, bps: u32) -> i64 {
    let scaled = amount as i128 * bps as i128;
    let rounded = if scaled >= 0 {
        (scaled + 5_000) / 10_000
    } else {
        (scaled - 5_000) / 10_000
    };
    rounded as i64
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows the amount with thousands separators, e.g. `66,000`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        if self.0 < 0 {
            grouped.insert(0, '-');
        }
        f.pad(&grouped)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by i64 (for quantity calculations).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_units() {
        let money = Money::from_units(15_500);
        assert_eq!(money.units(), 15_500);
    }

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Money::from_units(66_000).to_string(), "66,000");
        assert_eq!(Money::from_units(1_234_567).to_string(), "1,234,567");
        assert_eq!(Money::from_units(999).to_string(), "999");
        assert_eq!(Money::from_units(-5_500).to_string(), "-5,500");
        assert_eq!(Money::zero().to_string(), "0");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_units(1_000);
        let b = Money::from_units(500);

        assert_eq!((a + b).units(), 1_500);
        assert_eq!((a - b).units(), 500);
        assert_eq!((a * 3).units(), 3_000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.units(), 2_000);
    }

    #[test]
    fn test_tax_ten_percent() {
        let tax = Money::from_units(60_000).calculate_tax(TaxRate::from_bps(1_000));
        assert_eq!(tax.units(), 6_000);
    }

    #[test]
    fn test_tax_rounds_half_up() {
        // 12_345 × 10% = 1_234.5 → 1_235
        let tax = Money::from_units(12_345).calculate_tax(TaxRate::from_bps(1_000));
        assert_eq!(tax.units(), 1_235);
    }

    #[test]
    fn test_apply_discount() {
        let import = Money::from_units(12_345);
        // 30% off: 12_345 − 3_703.5 → 12_345 − 3_704 = 8_641
        assert_eq!(import.apply_discount(DiscountRate::from_bps(3_000)).units(), 8_641);
        assert_eq!(import.apply_discount(DiscountRate::zero()), import);
        assert_eq!(import.apply_discount(DiscountRate::from_bps(10_000)).units(), 0);
    }

    #[test]
    fn test_div_floor() {
        assert_eq!(Money::from_units(66_000).div_floor(10_000), 6);
        assert_eq!(Money::from_units(9_999).div_floor(10_000), 0);
        assert_eq!(Money::from_units(10_000).div_floor(10_000), 1);
        assert_eq!(Money::from_units(10_000).div_floor(0), 0);
    }

    #[test]
    fn test_zero_and_checks() {
        assert!(Money::zero().is_zero());
        assert!(Money::from_units(1).is_positive());
        assert!(Money::from_units(-1).is_negative());
        assert_eq!(Money::from_units(-7).abs().units(), 7);
    }
}

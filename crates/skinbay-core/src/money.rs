//! # Money Module
//!
//! Balances, listing prices and rental rates are all integer minor units.
//!
//! ## Where Money Moves
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SaleListing.price ──► CartItem.price (frozen snapshot) ──► checkout    │
//! │                                                                         │
//! │  checkout:   buyer.balance  -= price      seller.balance += price       │
//! │  rent:       renter.balance -= rate×days  owner.balance  += rate×days   │
//! │  instant:                                 seller.balance += quote       │
//! │                                                                         │
//! │  Every debit is paired with a credit of the same Money in one tx.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use skinbay_core::money::Money;
//!
//! let rate = Money::from_cents(10);
//! assert_eq!(rate.checked_times(3), Some(Money::from_cents(30)));
//! assert!(Money::from_cents(50).covers(Money::from_cents(30)));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// Signed so that balance deltas can be expressed, though stored balances
/// and prices never go negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns zero.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies by a whole count, returning `None` on overflow.
    ///
    /// Used for `price_per_day × days`, where both factors come from
    /// user input and an overflow must become a rejection, not a wrap.
    #[inline]
    pub const fn checked_times(&self, count: i64) -> Option<Money> {
        match self.0.checked_mul(count) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// True when this balance can pay `amount` without going negative.
    #[inline]
    pub const fn covers(&self, amount: Money) -> bool {
        self.0 >= amount.0
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug display only; the storefront formats for its own locale.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
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

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, count: i64) -> Self {
        Money(self.0 * count)
    }
}

impl From<i64> for Money {
    fn from(cents: i64) -> Self {
        Money(cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

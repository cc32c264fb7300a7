//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Summing 3 000 sales of R$ 0,10 in f64 does not give exactly R$ 300.   │
//! │  Dashboards that disagree with the cash register by a cent lose trust. │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Prices are parsed once (exact decimal → cents) at the normalization │
//! │    boundary. Every sum, profit and average after that is integer math. │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use farmdash_core::money::Money;
//!
//! let price = Money::from_cents(1050); // R$ 10,50
//! let total = price.multiply_quantity(3);
//! assert_eq!(total.cents(), 3150);
//!
//! // Store values often arrive as pt-BR strings
//! assert_eq!(Money::parse_lenient("10,50"), Some(price));
//! ```

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub};
use std::str::FromStr;
use ts_rs::TS;

use crate::types::MarginRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in cents.
///
/// ## Design Decisions
/// - **i64 (signed)**: profit contributions can be negative when an item is
///   sold below cost
/// - **Saturating arithmetic**: absurd store values pin at `i64::MAX`
///   instead of wrapping or panicking
/// - **Serialized as cents**: the front end formats for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Converts an exact decimal to cents using Bankers Rounding.
    ///
    /// Returns `None` when the value does not fit in i64 cents.
    pub fn from_decimal(value: Decimal) -> Option<Self> {
        let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
        (rounded * Decimal::ONE_HUNDRED).to_i64().map(Money)
    }

    /// Converts a JSON float to cents.
    ///
    /// Goes through `Decimal` so that `10.1` becomes 1010 cents, not 1009.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        Decimal::from_f64(value).and_then(Self::from_decimal)
    }

    /// Parses price text as typed into the store's forms.
    ///
    /// ## Accepted Forms
    /// ```text
    /// "10,50"     → 1050   comma decimal separator
    /// "1.234,56"  → 123456 dot thousands + comma decimal
    /// "12.5"      → 1250   plain decimal
    /// "R$ 12,00"  → 1200   currency prefix
    /// ```
    ///
    /// Returns `None` for anything else. The caller decides what a parse
    /// failure means (normalization coerces it to zero).
    pub fn parse_lenient(text: &str) -> Option<Self> {
        parse_decimal_lenient(text).and_then(Self::from_decimal)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % 100).abs()
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

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use farmdash_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Applies a margin rate, rounding half up to the nearest cent.
    ///
    /// ## Example
    /// ```rust
    /// use farmdash_core::money::Money;
    /// use farmdash_core::types::MarginRate;
    ///
    /// let revenue = Money::from_cents(1000);
    /// let profit = revenue.apply_rate(MarginRate::from_bps(3000)); // 30%
    /// assert_eq!(profit.cents(), 300);
    /// ```
    pub fn apply_rate(&self, rate: MarginRate) -> Money {
        // i128 so large revenue totals cannot overflow mid-calculation
        let cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(cents as i64)
    }

    /// Divides into `count` equal shares, rounding half away from zero.
    ///
    /// A count of zero yields zero rather than a fault.
    pub fn divide_evenly(&self, count: u64) -> Money {
        if count == 0 {
            return Money::zero();
        }
        let count = count as i128;
        let value = self.0 as i128;
        let half = count / 2;
        let rounded = if value >= 0 {
            (value + half) / count
        } else {
            (value - half) / count
        };
        Money::from_cents(rounded as i64)
    }

}

// =============================================================================
// Lenient Decimal Parsing
// =============================================================================

/// Parses decimal text where `,` is the decimal separator and `.` groups
/// thousands. Text without a comma is read as a plain decimal.
pub fn parse_decimal_lenient(text: &str) -> Option<Decimal> {
    let cleaned: String = text
        .trim()
        .trim_start_matches("R$")
        .trim_start_matches('$')
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    let canonical = if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else {
        cleaned
    };

    Decimal::from_str(&canonical).ok()
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-oriented pt-BR display; the front end does real localization.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}R$ {},{:02}", sign, self.major().abs(), self.minor_part())
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
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

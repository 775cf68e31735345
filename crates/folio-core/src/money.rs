//! # Money Module
//!
//! `Money` and `GstRate`, the two numeric types every document total is
//! built from.
//!
//! ## Integer Cents
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Unit prices carry two decimal places, so every amount is an i64 count  │
//! │  of cents and every rate is an integer count of basis points:          │
//! │                                                                         │
//! │    $50.00       → Money(5000)                                           │
//! │    10% GST      → GstRate(1000)                                         │
//! │    $50.00 × 10% → (5000 × 1000 + 5000) / 10000 = 500 cents              │
//! │                                                                         │
//! │  The +5000 term is round-half-up at the cent. No float ever touches a   │
//! │  persisted amount.                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use folio_core::money::{GstRate, Money};
//!
//! let subtotal = Money::from_cents(5000).multiply_quantity(2); // $100.00
//! let total = subtotal.gross_up(GstRate::from_bps(1000));      // +10% GST
//! assert_eq!(total.cents(), 11000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use ts_rs::TS;

/// Denominator for basis-point arithmetic (10000 bps = 100%).
const BPS_SCALE: i128 = 10_000;

fn round_bps(raw: i128) -> i128 {
    let half = BPS_SCALE / 2;
    if raw >= 0 {
        (raw + half) / BPS_SCALE
    } else {
        (raw - half) / BPS_SCALE
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in cents.
///
/// Signed: a DOLLAR discount larger than the subtotal legitimately produces a
/// negative grand total.
///
/// ```text
/// LineItemDraft.unit_price ──► × quantity ──► gross_up(gst) ──► line total
///                                                                  │
///                  Σ line totals ──► − discount ──► grand total ◄──┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use folio_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from dollars and cents.
    ///
    /// For negative amounts only the dollar part carries the sign:
    /// `from_major_minor(-5, 50)` is -$5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-dollar portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cents portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
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

    /// Checks if the value is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Amount in the smallest currency unit, as payment providers expect it.
    #[inline]
    pub const fn to_minor_units(&self) -> i64 {
        self.0
    }

    /// Multiplies by a quantity, returning `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use folio_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(299).checked_multiply_quantity(3), Some(Money::from_cents(897)));
    /// assert_eq!(Money::from_cents(i64::MAX).checked_multiply_quantity(2), None);
    /// ```
    #[inline]
    pub fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        self.0.checked_mul(qty).map(Money)
    }

    /// Multiplies by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Adds two amounts, returning `None` on overflow.
    #[inline]
    pub fn checked_add(&self, other: Money) -> Option<Self> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Subtracts `other`, returning `None` on overflow.
    #[inline]
    pub fn checked_sub(&self, other: Money) -> Option<Self> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// Applies a basis-point rate and rounds half-up to the cent.
    ///
    /// Rounding is symmetric around zero, so `-0.5` cents rounds to `-1`.
    ///
    /// ## Example
    /// ```rust
    /// use folio_core::money::Money;
    ///
    /// // $10.00 × 8.25% = $0.825 → $0.83
    /// assert_eq!(Money::from_cents(1000).apply_rate_half_up(825).cents(), 83);
    /// // $0.05 × 10% = $0.005 → $0.01
    /// assert_eq!(Money::from_cents(5).apply_rate_half_up(1000).cents(), 1);
    /// ```
    pub fn apply_rate_half_up(&self, bps: u32) -> Money {
        let raw = self.0 as i128 * bps as i128;
        Money::from_cents(round_bps(raw) as i64)
    }

    /// Like [`apply_rate_half_up`](Self::apply_rate_half_up) for any
    /// basis-point rate, returning `None` when the result leaves the `i64`
    /// range.
    pub fn checked_apply_rate_half_up(&self, bps: i64) -> Option<Money> {
        let raw = (self.0 as i128).checked_mul(bps as i128)?;
        i64::try_from(round_bps(raw)).ok().map(Money::from_cents)
    }

    /// GST owed on this amount at `rate`, rounded half-up to the cent.
    #[inline]
    pub fn calculate_gst(&self, rate: GstRate) -> Money {
        self.apply_rate_half_up(rate.bps())
    }

    /// This amount with GST added: `round2(amount × (1 + rate))`.
    ///
    /// Because the amount is already whole cents, rounding the grossed-up
    /// value is the same as adding the rounded GST.
    #[inline]
    pub fn gross_up(&self, rate: GstRate) -> Money {
        *self + self.calculate_gst(rate)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly rendering; clients format for their own locale.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, self.dollars().abs(), self.cents_part())
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

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// GST Rate
// =============================================================================

/// GST rate in basis points.
///
/// ```text
/// 1000 bps = 10.00% (Australian GST)
///    0 bps = GST-free line
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GstRate(u32);

impl GstRate {
    /// Creates a GST rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        GstRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// GST-free.
    #[inline]
    pub const fn zero() -> Self {
        GstRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

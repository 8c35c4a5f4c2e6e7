//! # Money Module
//!
//! Provides the `Money` type used for every balance in the ledger.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  RUNNING BALANCES AMPLIFY FLOAT ERROR                                   │
//! │                                                                         │
//! │  A ledger folds hundreds of records into one balance:                   │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ drifts with every record         │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Raw decimals are converted ONCE at the input boundary                │
//! │    (Money::from_decimal), then every fold step is exact i64 math        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::money::Money;
//!
//! let bill = Money::from_cents(10_000); // $100.00
//! let paid = Money::from_decimal(40.0).unwrap();
//! assert_eq!((bill - paid).cents(), 6_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: balances go negative when a customer is in credit
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Derives**: serializes as a plain integer of cents
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  raw amount / paid / credit / posted balance (loose JSON)               │
/// │        │ Money::from_decimal  (the only float boundary)                 │
/// │        ▼                                                                │
/// │  old_balance ──► total_amount ──► running_balance ──► LedgerSummary     │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Converts a decimal amount in major units (e.g. `40.5` dollars) to cents.
    ///
    /// Rounds half away from zero. Returns `None` for NaN, infinities and
    /// values outside the i64 cent range, so callers can treat them as
    /// non-numeric.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::from_decimal(40.5).unwrap().cents(), 4050);
    /// assert_eq!(Money::from_decimal(-20.0).unwrap().cents(), -2000);
    /// assert!(Money::from_decimal(f64::NAN).is_none());
    /// ```
    pub fn from_decimal(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let cents = (value * 100.0).round();
        if cents < i64::MIN as f64 || cents > i64::MAX as f64 {
            return None;
        }
        Some(Money(cents as i64))
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// A positive balance means the customer owes money.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Magnitude of the value.
    ///
    /// A return may be recorded as `-20` or `20`; the ledger always
    /// subtracts the magnitude. Saturates at `i64::MAX`.
    ///
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(-2000).abs(), Money::from_cents(2000));
    /// assert_eq!(Money::from_cents(i64::MIN).abs().cents(), i64::MAX);
    /// ```
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.saturating_abs())
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display for logs and debugging. Renderers format cents themselves.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let magnitude = self.0.unsigned_abs();
        if self.0 < 0 {
            f.write_str("-")?;
        }
        write!(f, "${}.{:02}", magnitude / 100, magnitude % 100)
    }
}

// Arithmetic saturates at the i64 bounds: raw amounts are only checked for
// being finite.

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(self.0.saturating_neg())
    }
}

/// Summing is how per-record amounts become summary totals.
impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
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

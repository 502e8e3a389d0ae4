//! Fixed-point monetary amounts and share quantities.
//!
//! Money is carried as [`rust_decimal::Decimal`] rounded to
//! [`MONEY_SCALE`] places, quantities to [`QUANTITY_SCALE`] places. Both
//! serialize to JSON as decimal strings so that no client ever sees a
//! binary float.
//!
//! There is intentionally no `From<f64>`: amounts enter the system either
//! from the database (`NUMERIC`), from JSON strings, or from exact decimal
//! arithmetic on other amounts.

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Decimal places kept for every monetary amount (`NUMERIC(20,4)`).
pub const MONEY_SCALE: u32 = 4;

/// Decimal places kept for every share quantity (`NUMERIC(20,6)`).
pub const QUANTITY_SCALE: u32 = 6;

/// Exclusive bound on the magnitude of a storable amount: 10^16, the
/// integer range of `NUMERIC(20,4)`.
pub const MONEY_LIMIT: Decimal = Decimal::from_parts(1_874_919_424, 2_328_306, 0, false, 0);

/// Exclusive bound on the magnitude of a storable quantity: 10^14, the
/// integer range of `NUMERIC(20,6)`.
pub const QUANTITY_LIMIT: Decimal = Decimal::from_parts(276_447_232, 23_283, 0, false, 0);

/// A monetary amount in INR, fixed at four decimal places.
///
/// Arithmetic is checked: every operation returns `None` when the result
/// overflows or leaves [`MONEY_LIMIT`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero rupees.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Rounds `value` half-away-from-zero to [`MONEY_SCALE`] places.
    #[must_use]
    pub fn new(value: Decimal) -> Self {
        Self(value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Returns the underlying decimal value.
    #[must_use]
    pub const fn amount(self) -> Decimal {
        self.0
    }

    /// Returns `true` if the amount is exactly zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    /// Returns `true` if the amount is strictly greater than zero.
    #[must_use]
    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Returns `true` if the amount fits a `NUMERIC(20,4)` column.
    #[must_use]
    pub fn in_range(self) -> bool {
        self.0.abs() < MONEY_LIMIT
    }

    fn bounded(value: Decimal) -> Option<Self> {
        Some(Self::new(value)).filter(|m| m.in_range())
    }

    /// `self + rhs`.
    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).and_then(Self::bounded)
    }

    /// Unit price × quantity, rounded to money scale.
    #[must_use]
    pub fn checked_mul(self, quantity: Quantity) -> Option<Self> {
        self.0.checked_mul(quantity.0).and_then(Self::bounded)
    }

    /// Applies a rate (e.g. `0.001` for 0.1 %) and rounds the result.
    #[must_use]
    pub fn apply_rate(self, rate: Decimal) -> Option<Self> {
        self.0.checked_mul(rate).and_then(Self::bounded)
    }

    /// Sum of `amounts`, or `None` on overflow.
    pub fn checked_sum<I: IntoIterator<Item = Self>>(amounts: I) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |total, amount| total.checked_add(amount))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A share count, fixed at six decimal places. Fractional shares allowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(Decimal);

impl Quantity {
    /// No shares.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Rounds `value` half-away-from-zero to [`QUANTITY_SCALE`] places.
    #[must_use]
    pub fn new(value: Decimal) -> Self {
        Self(value.round_dp_with_strategy(QUANTITY_SCALE, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Returns the underlying decimal value.
    #[must_use]
    pub const fn value(self) -> Decimal {
        self.0
    }

    /// Returns `true` if the quantity is strictly greater than zero.
    #[must_use]
    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Returns `true` if the quantity fits a `NUMERIC(20,6)` column.
    #[must_use]
    pub fn in_range(self) -> bool {
        self.0.abs() < QUANTITY_LIMIT
    }

    /// `self + rhs`, or `None` when the result leaves [`QUANTITY_LIMIT`].
    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0
            .checked_add(rhs.0)
            .map(Self::new)
            .filter(|q| q.in_range())
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

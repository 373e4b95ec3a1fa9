//! Monetary cost in the budget currency.
//!
//! Amounts are held as integer micro-units (one millionth of the budget
//! currency) so that ledger comparisons against the limit are exact.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// Micro-units per whole currency unit.
pub const MICROS_PER_UNIT: u64 = 1_000_000;

/// A non-negative amount of money, in micro-units.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Cost(u64);

impl Cost {
    pub const ZERO: Cost = Cost(0);

    /// Build a cost from a decimal amount of currency units (e.g. `0.80`).
    ///
    /// Negative and non-finite amounts become zero; the value is rounded to
    /// the nearest micro-unit.
    pub fn from_units(amount: f64) -> Self {
        if !amount.is_finite() || amount <= 0.0 {
            return Self::ZERO;
        }
        Self((amount * MICROS_PER_UNIT as f64).round() as u64)
    }

    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    pub const fn as_micros(&self) -> u64 {
        self.0
    }

    /// Decimal amount of currency units.
    pub fn as_units(&self) -> f64 {
        self.0 as f64 / MICROS_PER_UNIT as f64
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Cost) -> Option<Cost> {
        self.0.checked_add(other.0).map(Cost)
    }

    pub fn saturating_sub(self, other: Cost) -> Cost {
        Cost(self.0.saturating_sub(other.0))
    }

    /// Fraction `self / whole` as a percentage. Zero when `whole` is zero.
    pub fn percent_of(&self, whole: Cost) -> f64 {
        if whole.0 == 0 {
            return 0.0;
        }
        self.0 as f64 / whole.0 as f64 * 100.0
    }
}

impl Add for Cost {
    type Output = Cost;

    fn add(self, rhs: Cost) -> Cost {
        Cost(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Cost {
    fn add_assign(&mut self, rhs: Cost) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl std::iter::Sum for Cost {
    fn sum<I: Iterator<Item = Cost>>(iter: I) -> Cost {
        iter.fold(Cost::ZERO, |acc, c| acc + c)
    }
}

impl std::fmt::Display for Cost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.as_units())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_units_rounds_to_micros() {
        assert_eq!(Cost::from_units(0.80).as_micros(), 800_000);
        assert_eq!(Cost::from_units(10.0).as_micros(), 10_000_000);
        assert_eq!(Cost::from_units(0.1 + 0.2).as_micros(), 300_000);
    }

    #[test]
    fn negative_and_nan_are_zero() {
        assert!(Cost::from_units(-3.0).is_zero());
        assert!(Cost::from_units(f64::NAN).is_zero());
        assert!(Cost::from_units(f64::INFINITY).is_zero());
    }

    #[test]
    fn arithmetic_is_exact() {
        let total = Cost::from_units(0.80) + Cost::from_units(0.20);
        assert_eq!(total, Cost::from_units(1.00));
        assert_eq!(
            Cost::from_units(1.0).saturating_sub(Cost::from_units(2.0)),
            Cost::ZERO
        );
    }

    #[test]
    fn percent_of_limit() {
        let spent = Cost::from_units(8.0);
        let limit = Cost::from_units(10.0);
        assert!((spent.percent_of(limit) - 80.0).abs() < 1e-9);
        assert_eq!(spent.percent_of(Cost::ZERO), 0.0);
    }

    #[test]
    fn display_two_decimals() {
        assert_eq!(Cost::from_units(0.8).to_string(), "0.80");
        assert_eq!(Cost::from_units(12.346).to_string(), "12.35");
    }

    #[test]
    fn sums() {
        let total: Cost = [0.25, 0.25, 0.5].iter().map(|u| Cost::from_units(*u)).sum();
        assert_eq!(total, Cost::from_units(1.0));
    }
}

//! Fixed-point money type used for every monetary value in the domain.
//!
//! Backed by `rust_decimal` rather than binary floating point, rounded to
//! two decimal places at every arithmetic step so stored amounts never
//! drift. Division (painting-fee installment splits) rounds half-up and
//! leaves any residual to be absorbed by the caller into the last
//! installment, per spec.

use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

pub const SCALE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default, Hash)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn from_decimal(d: Decimal) -> Self {
        Money(d.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero))
    }

    pub fn from_str_exact(s: &str) -> Result<Self, rust_decimal::Error> {
        Ok(Self::from_decimal(Decimal::from_str(s)?))
    }

    pub fn from_major(amount: i64) -> Self {
        Money(Decimal::from(amount))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    pub fn max(self, other: Self) -> Self {
        Money(self.0.max(other.0))
    }

    /// Splits `self` into `parts` equal installments, rounding each half-up
    /// to two decimal places and folding the rounding residual into the
    /// last installment so the installments sum to exactly `self`.
    ///
    /// Returns an empty vector when `parts == 0`.
    pub fn split_even(&self, parts: u32) -> Vec<Money> {
        if parts == 0 {
            return Vec::new();
        }
        let share = Money::from_decimal(self.0 / Decimal::from(parts));
        let mut installments = vec![share; parts as usize];
        let allocated: Decimal = installments.iter().map(|m| m.0).sum();
        let residual = self.0 - allocated;
        if let Some(last) = installments.last_mut() {
            last.0 += residual;
        }
        installments
    }

    /// `self * rate` (rate expressed as a fraction, e.g. 0.02 for 2%),
    /// rounded to two decimal places.
    pub fn percentage_of(&self, rate: Decimal) -> Money {
        Money::from_decimal(self.0 * rate)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::from_str_exact(s)
    }
}

impl From<Decimal> for Money {
    fn from(d: Decimal) -> Self {
        Money::from_decimal(d)
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money {
        Money::from_decimal(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 = (self.0 + rhs.0).round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero);
    }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money {
        Money::from_decimal(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 = (self.0 - rhs.0).round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_to_two_decimal_places_half_up() {
        assert_eq!(Money::from_decimal(dec!(10.005)).to_string(), "10.01");
        assert_eq!(Money::from_decimal(dec!(10.004)).to_string(), "10.00");
    }

    #[test]
    fn split_even_absorbs_residual_into_last_installment() {
        let total = Money::from_major(250);
        let parts = total.split_even(3);
        assert_eq!(parts.len(), 3);
        let sum: Decimal = parts.iter().map(|m| m.as_decimal()).sum();
        assert_eq!(Money::from_decimal(sum), total);
        // 250 / 3 = 83.33..., each of the first two is 83.33, last absorbs the rest.
        assert_eq!(parts[0].to_string(), "83.33");
        assert_eq!(parts[1].to_string(), "83.33");
        assert_eq!(parts[2].to_string(), "83.34");
    }

    #[test]
    fn split_even_zero_parts_yields_empty() {
        let total = Money::from_major(100);
        assert!(total.split_even(0).is_empty());
    }

    #[test]
    fn split_even_exact_division_has_no_residual() {
        let total = Money::from_major(250);
        let parts = total.split_even(2);
        assert_eq!(parts[0].to_string(), "125.00");
        assert_eq!(parts[1].to_string(), "125.00");
    }

    #[test]
    fn zero_total_split_produces_zero_installments() {
        let total = Money::ZERO;
        let parts = total.split_even(4);
        assert_eq!(parts.len(), 4);
        assert!(parts.iter().all(|m| m.is_zero()));
    }
}

use std::{
    fmt::Display,
    iter::Sum,
    ops::Add,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const CURRENCY_SYMBOL: &str = "R$";

//--------------------------------------        Cents        ---------------------------------------------------------
/// A monetary amount, held as an integer number of cents.
///
/// Balances are compared for exact equality (e.g. "is this order fully paid?"), so amounts are never represented as
/// floating point values anywhere in the system.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Cents(i64);

op!(binary Cents, Add, add);
op!(binary Cents, Sub, sub);
op!(inplace Cents, AddAssign, add_assign);
op!(inplace Cents, SubAssign, sub_assign);
op!(unary Cents, Neg, neg);


impl Sum for Cents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl<'a> Sum<&'a Cents> for Cents {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in cents: {0}")]
pub struct CentsConversionError(String);

impl From<i64> for Cents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Cents {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Cents {}

impl TryFrom<u64> for Cents {
    type Error = CentsConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(CentsConversionError(format!("Value {value} is too large to convert to Cents")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Cents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{CURRENCY_SYMBOL}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Cents {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Whole currency units (reais) to cents.
    pub const fn from_units(units: i64) -> Self {
        Self(units * 100)
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// `None` if the sum does not fit in an `i64` number of cents.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// The amount multiplied by a quantity, or `None` on overflow.
    pub fn checked_mul(self, quantity: i64) -> Option<Self> {
        self.0.checked_mul(quantity).map(Self)
    }

    /// Sums the amounts, or returns `None` if any partial sum overflows.
    pub fn checked_sum<I: IntoIterator<Item = Self>>(amounts: I) -> Option<Self> {
        amounts.into_iter().try_fold(Self::zero(), Self::checked_add)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(Cents::from(2050).to_string(), "R$20.50");
        assert_eq!(Cents::from(5).to_string(), "R$0.05");
        assert_eq!(Cents::from(-1999).to_string(), "-R$19.99");
        assert_eq!(Cents::from_units(105).to_string(), "R$105.00");
    }

    #[test]
    fn arithmetic() {
        let mut a = Cents::from_units(50);
        a -= Cents::from_units(20);
        assert_eq!(a, Cents::from_units(30));
        a += Cents::from(1);
        assert_eq!(a.value(), 3001);
        assert_eq!(-Cents::from(1), Cents::from(-1));
        let total: Cents = [Cents::from(1), Cents::from(2), Cents::from(3)].iter().sum();
        assert_eq!(total, Cents::from(6));
    }

    #[test]
    fn checked_arithmetic() {
        assert_eq!(Cents::from(250).checked_mul(3), Some(Cents::from(750)));
        assert_eq!(Cents::from(i64::MAX / 2).checked_mul(3), None);
        assert_eq!(Cents::from(i64::MAX).checked_add(Cents::from(1)), None);
        assert_eq!(Cents::from(i64::MIN).checked_sub(Cents::from(1)), None);
        assert_eq!(Cents::from_units(90).checked_add(Cents::from_units(10)), Some(Cents::from_units(100)));
        assert_eq!(Cents::checked_sum([Cents::from(1), Cents::from(2)]), Some(Cents::from(3)));
        assert_eq!(Cents::checked_sum([Cents::from(i64::MAX), Cents::from(1)]), None);
    }

    #[test]
    fn many_small_payments_are_exact() {
        // 0.1 + 0.2 style drift cannot happen with integer cents
        let balance = Cents::from_units(30);
        let paid: Cents = (0..300).map(|_| Cents::from(10)).sum();
        assert!((balance - paid).is_zero());
    }

    #[test]
    fn conversions() {
        assert!(Cents::try_from(u64::MAX).is_err());
        assert_eq!(Cents::try_from(42u64).unwrap(), Cents::from(42));
        let json = serde_json::to_string(&Cents::from(1234)).unwrap();
        assert_eq!(json, "1234");
    }
}

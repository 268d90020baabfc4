use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const CURRENCY_CODE: &str = "CNY";
/// Minor units per major currency unit. All arithmetic is done in minor units (cents).
pub const CURRENCY_SCALE: i64 = 100;

//--------------------------------------       Money        ---------------------------------------------------------
/// A fixed-point currency amount, stored as a signed count of minor units (cents).
///
/// Amounts cross the wire as decimal numbers (`200.00`), so (de)serialization converts to and from
/// major units. Checkout-time validation of a client-declared total uses
/// [`Money::within_tolerance`], which allows a 0.01 currency-unit rounding slack; amounts that
/// represent money actually moved compare with plain equality.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, PartialEq, Eq, Hash)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a currency amount: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(cents: i64) -> Self {
        Self(cents)
    }
}

impl Money {
    /// One minor unit. The comparison slack permitted between a declared amount and a computed one.
    pub const TOLERANCE: Money = Money(1);
    pub const ZERO: Money = Money(0);

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Converts a decimal amount in major units (e.g. `199.99`) to `Money`, rounding to the
    /// nearest cent.
    pub fn from_major_units(value: f64) -> Result<Self, MoneyConversionError> {
        if !value.is_finite() {
            return Err(MoneyConversionError(format!("{value} is not a finite number")));
        }
        let cents = (value * CURRENCY_SCALE as f64).round();
        if cents.abs() >= i64::MAX as f64 {
            return Err(MoneyConversionError(format!("{value} is out of range")));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(cents as i64))
    }

    pub fn to_major_units(&self) -> f64 {
        self.0 as f64 / CURRENCY_SCALE as f64
    }

    /// True if the two amounts differ by no more than [`Money::TOLERANCE`].
    pub fn within_tolerance(&self, other: Money) -> bool {
        (*self - other).0.abs() <= Self::TOLERANCE.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{sign}{}.{:02}", abs / CURRENCY_SCALE, abs % CURRENCY_SCALE)
    }
}

impl FromStr for Money {
    type Err = MoneyConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().parse::<f64>().map_err(|e| MoneyConversionError(format!("{s}: {e}")))?;
        Self::from_major_units(value)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_major_units())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MoneyVisitor;

        impl de::Visitor<'_> for MoneyVisitor {
            type Value = Money;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a decimal currency amount")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
                Money::from_major_units(v).map_err(de::Error::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
                self.visit_f64(v as f64)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
                self.visit_f64(v as f64)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
                v.parse().map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_any(MoneyVisitor)
    }
}

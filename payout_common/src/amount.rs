use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

/// The number of micro-units in one whole unit of the payout currency.
pub const MICROS_PER_UNIT: i64 = 1_000_000;

/// The maximum number of fractional digits that can be represented exactly.
const MAX_FRACTION_DIGITS: usize = 6;

//--------------------------------------       Amount        ---------------------------------------------------------
/// A fixed-point monetary value, stored as a signed count of micro-units.
///
/// All valuation arithmetic is done on the integer representation, so splitting an amount never suffers from
/// floating-point drift.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Amount(i64);

op!(binary Amount, Add, add);
op!(binary Amount, Sub, sub);
op!(inplace Amount, AddAssign, add_assign);
op!(inplace Amount, SubAssign, sub_assign);
op!(unary Amount, Neg, neg);

impl Mul<i64> for Amount {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Amount {
    pub const ZERO: Self = Self(0);

    /// The raw value, in micro-units.
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Creates an amount from a whole number of units.
    pub fn from_units(units: i64) -> Self {
        Self(units * MICROS_PER_UNIT)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Returns `percent`% of this amount, truncated towards zero to the nearest micro-unit.
    ///
    /// The intermediate product is computed in 128 bits, so this cannot overflow for any percentage in `0..=100`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn percent(&self, percent: i64) -> Self {
        let value = i128::from(self.0) * i128::from(percent) / 100;
        Self(value as i64)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let micros = MICROS_PER_UNIT.unsigned_abs();
        let whole = abs / micros;
        let fraction = abs % micros;
        if fraction == 0 {
            write!(f, "{sign}{whole}")
        } else {
            let fraction = format!("{fraction:06}");
            write!(f, "{sign}{whole}.{}", fraction.trim_end_matches('0'))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountParseError {
    #[error("No amount was given")]
    Empty,
    #[error("'{0}' is not a number")]
    NotANumber(String),
    #[error("'{0}' has more than 6 decimal places")]
    TooPrecise(String),
    #[error("'{0}' is too large")]
    Overflow(String),
}

impl FromStr for Amount {
    type Err = AmountParseError;

    /// Parses a decimal string such as `100`, `12.5` or `0,75`. Either `.` or `,` may be used as the decimal
    /// separator. Exponents and thousands separators are not accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (negative, unsigned) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let normalized = unsigned.replace(',', ".");
        let (whole, fraction) = normalized.split_once('.').unwrap_or((normalized.as_str(), ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(AmountParseError::Empty);
        }
        let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if !all_digits(whole) || !all_digits(fraction) {
            return Err(AmountParseError::NotANumber(s.to_string()));
        }
        if fraction.len() > MAX_FRACTION_DIGITS {
            return Err(AmountParseError::TooPrecise(s.to_string()));
        }
        let overflow = || AmountParseError::Overflow(s.to_string());
        let whole = if whole.is_empty() { 0 } else { whole.parse::<i64>().map_err(|_| overflow())? };
        let fraction = if fraction.is_empty() {
            0
        } else {
            format!("{fraction:0<width$}", width = MAX_FRACTION_DIGITS).parse::<i64>().map_err(|_| overflow())?
        };
        let micros = whole.checked_mul(MICROS_PER_UNIT).and_then(|v| v.checked_add(fraction)).ok_or_else(overflow)?;
        Ok(Self(if negative { -micros } else { micros }))
    }
}

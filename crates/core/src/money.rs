use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("Empty amount")]
    Empty,
    #[error("Invalid amount: {0}")]
    Invalid(String),
    #[error("Amount out of range: {0}")]
    OutOfRange(String),
}

/// A decimal amount held at two fractional digits. Never touches floating point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(Decimal);

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    /// Whole cents, or `OutOfRange` when the amount does not fit an `i64`.
    pub fn to_cents(self) -> Result<i64, MoneyError> {
        self.0
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|c| c.round().to_i64())
            .ok_or_else(|| MoneyError::OutOfRange(self.0.to_string()))
    }

    pub fn from_decimal(decimal: Decimal) -> Self {
        Money(decimal.round_dp(2))
    }

    pub fn from_major(units: i64) -> Self {
        Money(Decimal::from(units))
    }

    /// Parse a human-written amount such as `1,250.50`. Thousands separators
    /// are stripped before decimal conversion. Amounts that cannot be stored
    /// as cents are rejected.
    pub fn parse(s: &str) -> Result<Self, MoneyError> {
        let clean: String = s.trim().chars().filter(|c| *c != ',').collect();
        if clean.is_empty() {
            return Err(MoneyError::Empty);
        }
        let money = Decimal::from_str(&clean)
            .map(Money::from_decimal)
            .map_err(|_| MoneyError::Invalid(s.to_string()))?;
        money.to_cents()?;
        Ok(money)
    }

    pub fn abs(self) -> Self {
        Money(self.0.abs())
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Money(self.0 - rhs.0)
    }
}

//! Common types used throughout the governance engine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

/// Identifier of a platform member (contributor, voter or sponsor)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId {
    value: String,
}

impl MemberId {
    /// Create a new member id
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl From<&str> for MemberId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A point in time
pub type Timestamp = DateTime<Utc>;

/// A monetary amount, kept as an exact decimal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount {
    value: Decimal,
}

impl Amount {
    /// Create a new amount with the given whole-unit value
    pub fn new(value: i64) -> Self {
        Self {
            value: Decimal::new(value, 0),
        }
    }

    /// Create an amount from a decimal value
    pub fn from_decimal(value: Decimal) -> Self {
        Self { value }
    }

    /// Create a zero amount
    pub fn zero() -> Self {
        Self {
            value: Decimal::ZERO,
        }
    }

    /// Check if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Check if the amount is strictly positive
    pub fn is_positive(&self) -> bool {
        self.value.is_sign_positive() && !self.value.is_zero()
    }

    /// Check if the amount is negative
    pub fn is_negative(&self) -> bool {
        self.value.is_sign_negative() && !self.value.is_zero()
    }

    /// Subtract, flooring the result at zero
    pub fn saturating_sub(self, other: Self) -> Self {
        if other.value >= self.value {
            Self::zero()
        } else {
            Self {
                value: self.value - other.value,
            }
        }
    }

    /// Add, or `None` if the sum exceeds the representable range
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.value.checked_add(other.value).map(Self::from_decimal)
    }

    /// Add, clamping at the representable range
    pub fn saturating_add(self, other: Self) -> Self {
        Self {
            value: self.value.saturating_add(other.value),
        }
    }

    /// Get the underlying decimal value
    pub fn decimal_value(&self) -> Decimal {
        self.value
    }
}

impl Add for Amount {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            value: self.value + other.value,
        }
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, other: Self) {
        self.value += other.value;
    }
}

impl Sub for Amount {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self {
            value: self.value - other.value,
        }
    }
}

impl SubAssign for Amount {
    fn sub_assign(&mut self, other: Self) {
        self.value -= other.value;
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        iter.fold(Amount::zero(), Amount::saturating_add)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl FromStr for Amount {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self {
            value: Decimal::from_str(s.trim())?,
        })
    }
}

impl PartialOrd for Amount {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Amount {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value.cmp(&other.value)
    }
}

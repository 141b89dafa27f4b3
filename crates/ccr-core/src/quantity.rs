//! # Credit Quantities
//!
//! `Amount` and `Vintage` are the only two attributes a credit carries
//! besides its owner. Both are fixed at mint time.
//!
//! Raw inputs arrive as signed integers from the transport layer so that a
//! negative amount is reported as an invalid amount rather than as a
//! generic decoding failure. For the same reason an amount never exceeds
//! `i64::MAX`, even when it is read back from a snapshot as a `u64`.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Quantity of carbon offset represented by a credit. Always in
/// `1..=Amount::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Amount(u64);

impl Amount {
    /// Largest amount a credit can carry.
    pub const MAX: u64 = i64::MAX as u64;

    /// Wrap an unsigned amount, rejecting zero and values above [`Self::MAX`].
    pub fn new(value: u64) -> Result<Self, ValidationError> {
        match i64::try_from(value) {
            Ok(v) => Self::try_from(v),
            Err(_) => Err(ValidationError::AmountTooLarge(value)),
        }
    }

    /// The raw quantity.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl TryFrom<i64> for Amount {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value <= 0 {
            return Err(ValidationError::InvalidAmount(value));
        }
        Ok(Self(value as u64))
    }
}

impl TryFrom<u64> for Amount {
    type Error = ValidationError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for u64 {
    fn from(a: Amount) -> Self {
        a.0
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Issuance date of a credit encoded as an integer, e.g. `20240129`.
///
/// Only positivity is checked. `20241399` is a valid vintage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Vintage(u32);

impl Vintage {
    /// Wrap an unsigned vintage, rejecting zero.
    pub fn new(value: u32) -> Result<Self, ValidationError> {
        if value == 0 {
            return Err(ValidationError::InvalidVintage(0));
        }
        Ok(Self(value))
    }

    /// The raw encoded date.
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Year component under the YYYYMMDD reading.
    pub fn year(&self) -> u32 {
        self.0 / 10_000
    }
}

impl TryFrom<i64> for Vintage {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match u32::try_from(value) {
            Ok(v) if v > 0 => Ok(Self(v)),
            _ => Err(ValidationError::InvalidVintage(value)),
        }
    }
}

impl TryFrom<u32> for Vintage {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Vintage> for u32 {
    fn from(v: Vintage) -> Self {
        v.0
    }
}

impl std::fmt::Display for Vintage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

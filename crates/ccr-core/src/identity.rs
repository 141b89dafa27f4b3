//! # Domain Identity Newtypes
//!
//! Newtype wrappers for the two identifiers the registry deals in: the
//! ledger-assigned `CreditId` and the caller-supplied `Principal`.
//! You cannot pass a credit number where an owner is expected.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum byte length of a principal identifier.
pub const MAX_PRINCIPAL_LEN: usize = 255;

/// Ledger-assigned identifier of a carbon credit.
///
/// Issued in strictly increasing order starting at 0. Only the ledger
/// allocates new ids; callers obtain them from a mint result or a query.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CreditId(u64);

impl CreditId {
    /// Wrap a raw credit number.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw credit number.
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// The id that follows this one, or `None` on counter exhaustion.
    pub fn next(&self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl From<u64> for CreditId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for CreditId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "credit:{}", self.0)
    }
}

/// Opaque identity of an owner or caller.
///
/// The registry never interprets the contents; it only compares principals
/// for equality. Construction rejects empty (or whitespace-only) values,
/// values longer than [`MAX_PRINCIPAL_LEN`] bytes, and ASCII control
/// characters. Deserialization goes through the same check.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Principal(String);

impl Principal {
    /// Validate and wrap a principal identifier.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ValidationError::InvalidPrincipal(
                "principal must not be empty".to_string(),
            ));
        }
        if value.len() > MAX_PRINCIPAL_LEN {
            return Err(ValidationError::InvalidPrincipal(format!(
                "principal must not exceed {MAX_PRINCIPAL_LEN} bytes"
            )));
        }
        if value.chars().any(|c| c.is_ascii_control()) {
            return Err(ValidationError::InvalidPrincipal(
                "principal must not contain control characters".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// Access the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Principal {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Principal> for String {
    fn from(p: Principal) -> Self {
        p.0
    }
}

impl std::str::FromStr for Principal {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

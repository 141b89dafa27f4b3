//! # Error Types
//!
//! Construction failures for the core newtypes and canonical serialization.
//! Ledger operation failures live in `ccr-state`.

use thiserror::Error;

/// A domain primitive was constructed from an invalid raw value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Credit amounts must be strictly positive.
    #[error("invalid amount {0}: must be a positive integer")]
    InvalidAmount(i64),

    /// Amounts are capped at `i64::MAX` so every stored amount can be minted.
    #[error("amount {0} exceeds the maximum of {max}", max = i64::MAX)]
    AmountTooLarge(u64),

    /// Vintages must be positive and fit in 32 bits.
    #[error("invalid vintage {0}: must be a positive date-like integer")]
    InvalidVintage(i64),

    /// The principal string is empty, too long, or contains control characters.
    #[error("invalid principal: {0}")]
    InvalidPrincipal(String),

    /// A timestamp string could not be parsed or was not UTC.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

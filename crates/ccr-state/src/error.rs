//! # Ledger Errors
//!
//! Every rejection the ledger can produce. None of these leave partial state
//! behind, and none are fatal: each one rejects exactly one operation.

use thiserror::Error;

use ccr_core::{CreditId, Principal};

/// Errors returned by credit ledger operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Mint amount was zero or negative.
    #[error("invalid amount {amount}: credits must carry a positive amount")]
    InvalidAmount {
        /// The rejected raw amount.
        amount: i64,
    },

    /// Mint vintage was not a positive 32-bit integer.
    #[error("invalid vintage {vintage}: must be a positive date-like integer")]
    InvalidVintage {
        /// The rejected raw vintage.
        vintage: i64,
    },

    /// No credit has been issued under this id.
    #[error("{id} not found")]
    NotFound {
        /// The unknown id.
        id: CreditId,
    },

    /// The caller is not the credit's current owner.
    #[error("caller {caller} is not the owner of {id}")]
    Unauthorized {
        /// The credit the caller tried to act on.
        id: CreditId,
        /// The rejected caller.
        caller: Principal,
    },

    /// The credit is retired and can no longer change.
    #[error("{id} is already retired")]
    AlreadyRetired {
        /// The retired credit.
        id: CreditId,
    },

    /// The id counter cannot advance any further.
    #[error("credit id space exhausted")]
    IdSpaceExhausted,

    /// A snapshot violated a ledger invariant and was not loaded.
    #[error("corrupt ledger snapshot: {0}")]
    CorruptSnapshot(String),
}

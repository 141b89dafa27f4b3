//! # ccr-core — Foundational Types for the Carbon Credit Registry
//!
//! Defines the type-system primitives every other registry crate builds on.
//! It depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `Principal`, `CreditId`,
//!    `Amount`, `Vintage` are newtypes with validated constructors. A zero
//!    amount or an empty principal cannot be represented.
//!
//! 2. **`CanonicalBytes` newtype.** Ledger state digests are computed only
//!    over canonical JSON (sorted keys, compact separators, no floats).
//!
//! 3. **UTC-only timestamps.** `Timestamp` is UTC with seconds precision.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `ccr-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod quantity;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_hex, ContentDigest};
pub use error::{CanonicalizationError, ValidationError};
pub use identity::{CreditId, Principal};
pub use quantity::{Amount, Vintage};
pub use temporal::Timestamp;

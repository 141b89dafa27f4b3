//! # API Route Modules
//!
//! - `credits` — mint, transfer, retire, and per-credit reads.
//! - `ledger` — ledger-wide summary and event log.

pub mod credits;
pub mod ledger;

//! # ccr-cli — Command-Line Tool for the Carbon Credit Registry
//!
//! Provides the `ccr` binary. Commands operate on a local snapshot file in
//! the format `ccr-api` writes, so the same file can be inspected or
//! modified offline and then served.
//!
//! ```bash
//! ccr mint --amount 100 --vintage 20240129 --caller wallet_1
//! ccr transfer --id 0 --to wallet_2 --caller wallet_1
//! ccr retire --id 0 --caller wallet_2
//! ccr verify
//! ```

pub mod credit;

/// Ledger file used when `--ledger` is not given.
pub const DEFAULT_LEDGER_PATH: &str = ".ccr/ledger.json";


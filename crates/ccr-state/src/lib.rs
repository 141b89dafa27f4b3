//! # ccr-state — Credit Ledger State Machine
//!
//! Owns every credit record and enforces the registry's invariants.
//!
//! ## Credit Lifecycle
//!
//! ```text
//! mint ──▶ Active ──(transfer, owner only)──▶ Active
//!            │
//!            └──(retire, owner only)──▶ Retired (terminal)
//! ```
//!
//! Each credit independently occupies one of two states. The status is an
//! enum, and the transitions live on [`Credit`] itself so that any action on
//! a retired credit is rejected in one place.
//!
//! ## Modules
//!
//! - **Credit** (`credit.rs`): the record, its status, and guarded transitions.
//! - **Ledger** (`ledger.rs`): id allocation, the credit map, queries, snapshots.
//! - **Event** (`event.rs`): append-only log of successful mutations.
//! - **Shared** (`shared.rs`): `Arc<RwLock<_>>` handle with single-writer discipline.
//! - **Store** (`store.rs`): digest-checked snapshot file persistence.
//!
//! ## Failure Semantics
//!
//! Every operation either applies fully or leaves the ledger untouched.
//! Validation happens before the first write.

pub mod credit;
pub mod error;
pub mod event;
pub mod ledger;
pub mod shared;
pub mod store;

pub use credit::{Credit, CreditStatus};
pub use error::LedgerError;
pub use event::{LedgerEvent, LedgerEventKind};
pub use ledger::{snapshot_digest, CreditLedger, LedgerSnapshot, LedgerSummary};
pub use shared::SharedLedger;
pub use store::{SnapshotFile, SnapshotStore, StoreError};

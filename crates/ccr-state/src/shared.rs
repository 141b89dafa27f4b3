//! # Shared Ledger Handle
//!
//! A cloneable `Arc<RwLock<CreditLedger>>`. Mutations take the write lock for
//! the whole check-then-write step, so two concurrent mints never observe the
//! same counter value and a transfer cannot interleave with a retire on the
//! same credit. Queries share the read lock.
//!
//! [`SharedLedger::apply`] runs an operation against a working copy and
//! installs it only after a commit hook (usually a snapshot write) accepts
//! it, so a rejected commit leaves the ledger as it was.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use ccr_core::CreditId;

use crate::credit::Credit;
use crate::error::LedgerError;
use crate::ledger::{CreditLedger, LedgerSnapshot};

/// Thread-safe handle to a single ledger. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct SharedLedger {
    inner: Arc<RwLock<CreditLedger>>,
}

impl SharedLedger {
    pub fn new(ledger: CreditLedger) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ledger)),
        }
    }

    /// Apply `op` to a copy of the ledger under the write lock, then pass
    /// the copy to `commit`. The copy replaces the live ledger only if both
    /// succeed.
    ///
    /// `commit` runs while the write lock is held. Callers on an async
    /// runtime should invoke this from a blocking task when `commit` does
    /// file I/O.
    pub fn apply<R, E>(
        &self,
        op: impl FnOnce(&mut CreditLedger) -> Result<R, E>,
        commit: impl FnOnce(&CreditLedger) -> Result<(), E>,
    ) -> Result<R, E> {
        let mut guard = self.inner.write();
        let mut working = guard.clone();
        let out = op(&mut working)?;
        commit(&working)?;
        *guard = working;
        Ok(out)
    }

    /// Run `f` under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&CreditLedger) -> R) -> R {
        f(&self.inner.read())
    }

    /// Like [`Self::read`], but gives up after `timeout`.
    pub fn try_read_for<R>(
        &self,
        timeout: Duration,
        f: impl FnOnce(&CreditLedger) -> R,
    ) -> Option<R> {
        self.inner.try_read_for(timeout).map(|guard| f(&guard))
    }

    /// Owned copy of one credit.
    pub fn get(&self, id: CreditId) -> Result<Credit, LedgerError> {
        self.read(|l| l.get(id).cloned())
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.read(CreditLedger::snapshot)
    }
}

//! # Snapshot Store
//!
//! Persists the ledger as a single JSON document:
//!
//! ```json
//! { "format_version": 1, "digest": "<sha256 hex>", "snapshot": { ... } }
//! ```
//!
//! The digest covers the canonical (JCS) bytes of `snapshot`. Loading
//! recomputes it and rebuilds the ledger through
//! [`CreditLedger::from_snapshot`], so a file that was edited by hand or
//! truncated mid-write is refused rather than served.
//!
//! Writes go to a uniquely named temporary file in the same directory and
//! are renamed into place, so readers only ever see a complete file. Saves
//! through one store are serialized on an internal mutex, and a save whose
//! snapshot is older than the last one written is skipped.
//!
//! Read-modify-write cycles from separate processes go through
//! [`SnapshotStore::update`], which holds an exclusive advisory lock on the
//! sibling `<file>.lock` from the load until the rename.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

use ccr_core::CanonicalizationError;

use crate::error::LedgerError;
use crate::ledger::{snapshot_digest, CreditLedger, LedgerSnapshot};

/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;

/// The persisted envelope around a [`LedgerSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub format_version: u32,
    /// Lowercase hex SHA-256 of the canonical snapshot bytes.
    pub digest: String,
    pub snapshot: LedgerSnapshot,
}

impl SnapshotFile {
    /// Wrap a snapshot, computing its digest.
    pub fn seal(snapshot: LedgerSnapshot) -> Result<Self, StoreError> {
        let digest = snapshot_digest(&snapshot)?.to_hex();
        Ok(Self {
            format_version: FORMAT_VERSION,
            digest,
            snapshot,
        })
    }

    /// Check version and digest, then rebuild the ledger.
    pub fn open(self) -> Result<CreditLedger, StoreError> {
        if self.format_version != FORMAT_VERSION {
            return Err(StoreError::UnsupportedVersion(self.format_version));
        }
        let actual = snapshot_digest(&self.snapshot)?.to_hex();
        if actual != self.digest {
            return Err(StoreError::DigestMismatch {
                expected: self.digest,
                actual,
            });
        }
        Ok(CreditLedger::from_snapshot(self.snapshot)?)
    }
}

/// Errors from reading or writing snapshot files.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid snapshot JSON.
    #[error("snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The snapshot could not be canonicalized for digesting.
    #[error("snapshot canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Written by a newer or unknown format.
    #[error("unsupported snapshot format version {0} (expected {FORMAT_VERSION})")]
    UnsupportedVersion(u32),

    /// Stored digest does not match the content.
    #[error("snapshot digest mismatch: file says {expected}, content hashes to {actual}")]
    DigestMismatch { expected: String, actual: String },

    /// Content parsed but violates a ledger invariant.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// File-backed snapshot persistence for one ledger.
#[derive(Debug)]
pub struct SnapshotStore {
    path: PathBuf,
    /// Event count of the last snapshot written.
    last_written: Mutex<Option<usize>>,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_written: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the ledger, or `None` if no file exists yet.
    pub fn load(&self) -> Result<Option<CreditLedger>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let file: SnapshotFile = serde_json::from_str(&content)?;
        let ledger = file.open()?;
        *self.last_written.lock() = Some(ledger.events().len());
        tracing::info!(
            path = %self.path.display(),
            credits = ledger.len(),
            events = ledger.events().len(),
            "ledger snapshot loaded"
        );
        Ok(Some(ledger))
    }

    /// Load the ledger, or start an empty one if no file exists yet.
    pub fn load_or_default(&self) -> Result<CreditLedger, StoreError> {
        Ok(self.load()?.unwrap_or_default())
    }

    /// Atomically write `snapshot`.
    ///
    /// Returns `false` without touching the file when a snapshot with at
    /// least as many events has already been written by this store. On
    /// failure the temporary file is removed and the previous file stays.
    pub fn save(&self, snapshot: LedgerSnapshot) -> Result<bool, StoreError> {
        let mut last = self.last_written.lock();
        let events = snapshot.events.len();
        if last.is_some_and(|n| n >= events) {
            return Ok(false);
        }

        let file = SnapshotFile::seal(snapshot)?;
        let json = serde_json::to_vec_pretty(&file)?;

        let dir = self.dir();
        fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        *last = Some(events);
        tracing::debug!(path = %self.path.display(), events, "ledger snapshot written");
        Ok(true)
    }

    /// Load the ledger, apply `op`, and save the result, all while holding
    /// an exclusive lock on the sibling lock file.
    ///
    /// Concurrent callers, in this process or another, queue on the lock, so
    /// each one sees the previous caller's write. Nothing is written when
    /// `op` fails.
    pub fn update<R, E>(&self, op: impl FnOnce(&mut CreditLedger) -> Result<R, E>) -> Result<R, E>
    where
        E: From<StoreError>,
    {
        let dir = self.dir();
        fs::create_dir_all(dir).map_err(StoreError::from)?;
        let lock_file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())
            .map_err(StoreError::from)?;
        let mut lock = fd_lock::RwLock::new(lock_file);
        let _guard = lock.write().map_err(StoreError::from)?;

        let mut ledger = self.load_or_default()?;
        let out = op(&mut ledger)?;
        self.save(ledger.snapshot())?;
        Ok(out)
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        }
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccr_core::Principal;
    use std::collections::HashSet;
    use std::thread;

    fn populated() -> CreditLedger {
        let mut ledger = CreditLedger::new();
        let w1 = Principal::new("wallet_1").unwrap();
        let w2 = Principal::new("wallet_2").unwrap();
        let id = ledger.mint(100, 20240129, &w1).unwrap();
        ledger.transfer(id, &w2, &w1).unwrap();
        ledger.retire(id, &w2).unwrap();
        ledger.mint(7, 20230101, &w1).unwrap();
        ledger
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("ledger.json"));
        assert!(store.load().unwrap().is_none());
        assert!(store.load_or_default().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_restores_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.json");
        let ledger = populated();

        let store = SnapshotStore::new(&path);
        assert!(store.save(ledger.snapshot()).unwrap());
        assert!(path.exists());
        let entries = fs::read_dir(dir.path().join("nested")).unwrap().count();
        assert_eq!(entries, 1, "only the snapshot itself should remain");

        let loaded = SnapshotStore::new(&path).load().unwrap().unwrap();
        assert_eq!(loaded.snapshot(), ledger.snapshot());
    }

    #[test]
    fn stale_snapshot_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("ledger.json"));
        let mut ledger = populated();
        let old = ledger.snapshot();
        ledger
            .mint(1, 20240101, &Principal::new("wallet_3").unwrap())
            .unwrap();

        assert!(store.save(ledger.snapshot()).unwrap());
        assert!(!store.save(old).unwrap());

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.len(), 3);
    }

    #[test]
    fn tampered_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        SnapshotStore::new(&path)
            .save(populated().snapshot())
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let tampered = content.replacen("\"amount\": 7", "\"amount\": 7000", 1);
        assert_ne!(content, tampered);
        fs::write(&path, tampered).unwrap();

        let err = SnapshotStore::new(&path).load().unwrap_err();
        assert!(matches!(err, StoreError::DigestMismatch { .. }), "{err}");
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut file = SnapshotFile::seal(populated().snapshot()).unwrap();
        file.format_version = 99;
        assert!(matches!(
            file.open(),
            Err(StoreError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn invariant_violation_behind_valid_digest_is_rejected() {
        let mut snapshot = populated().snapshot();
        snapshot.next_id = ccr_core::CreditId::new(5);
        let file = SnapshotFile::seal(snapshot).unwrap();
        assert!(matches!(
            file.open(),
            Err(StoreError::Ledger(LedgerError::CorruptSnapshot(_)))
        ));
    }

    #[test]
    fn garbage_is_a_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            SnapshotStore::new(&path).load(),
            Err(StoreError::Json(_))
        ));
    }

    #[test]
    fn failed_save_leaves_no_temporary_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupant"), "x").unwrap();

        let err = SnapshotStore::new(&path)
            .save(populated().snapshot())
            .unwrap_err();
        assert!(matches!(err, StoreError::Io(_)), "{err}");

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("ledger.json")]);
    }

    #[test]
    fn update_persists_successful_ops() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let owner = Principal::new("wallet_1").unwrap();

        let id = SnapshotStore::new(&path)
            .update(|l| l.mint(100, 20240129, &owner).map_err(StoreError::from))
            .unwrap();
        let loaded = SnapshotStore::new(&path).load().unwrap().unwrap();
        assert_eq!(loaded.get(id).unwrap().owner(), &owner);
    }

    #[test]
    fn update_writes_nothing_when_op_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let store = SnapshotStore::new(&path);
        store.save(populated().snapshot()).unwrap();
        let before = fs::read(&path).unwrap();

        let owner = Principal::new("wallet_1").unwrap();
        let err = SnapshotStore::new(&path)
            .update(|l| l.mint(0, 20240129, &owner).map_err(StoreError::from))
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Ledger(LedgerError::InvalidAmount { amount: 0 })
        ));
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn concurrent_updates_never_reuse_an_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let path = path.clone();
                thread::spawn(move || {
                    let owner = Principal::new(format!("wallet_{t}")).unwrap();
                    (0..10)
                        .map(|_| {
                            // A fresh store per call, like separate CLI runs.
                            SnapshotStore::new(&path)
                                .update(|l| l.mint(1, 20240101, &owner).map_err(StoreError::from))
                                .unwrap()
                                .value()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let ids: HashSet<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(ids, (0..80).collect());

        let ledger = SnapshotStore::new(&path).load().unwrap().unwrap();
        assert_eq!(ledger.len(), 80);
        assert_eq!(ledger.events().len(), 80);
    }
}

//! # Credit Ledger
//!
//! The ledger owns the id → credit map, the next-id counter, and the event
//! log. It is the only place credits are created and the only entry point
//! for mutating them.
//!
//! ## Invariants
//!
//! - Ids are issued as `0, 1, 2, …` with no gaps or repeats. A rejected mint
//!   does not advance the counter.
//! - Records are never removed, so every id below `next_id` resolves.
//! - A rejected operation changes nothing: no record, no counter, no event.
//!
//! Caller identity is always an explicit argument. The ledger does not know
//! how a caller was authenticated.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use ccr_core::{
    sha256_digest, Amount, CanonicalBytes, CanonicalizationError, ContentDigest, CreditId,
    Principal, Timestamp, Vintage,
};

use crate::credit::{Credit, CreditStatus};
use crate::error::LedgerError;
use crate::event::{LedgerEvent, LedgerEventKind};

/// Serializable image of the full ledger state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// The id the next successful mint will receive.
    pub next_id: CreditId,
    /// Every credit ever issued, in id order.
    pub credits: Vec<Credit>,
    /// The complete event log.
    pub events: Vec<LedgerEvent>,
}

/// Aggregate counts over the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub total_credits: u64,
    pub active_credits: u64,
    pub retired_credits: u64,
    /// Sum of amounts over active credits (saturating).
    pub active_amount: u64,
    /// Sum of amounts over retired credits (saturating).
    pub retired_amount: u64,
}

/// Registry of carbon credits.
#[derive(Debug, Clone, Default)]
pub struct CreditLedger {
    credits: BTreeMap<CreditId, Credit>,
    next_id: CreditId,
    events: Vec<LedgerEvent>,
}

impl CreditLedger {
    /// Create an empty ledger whose first mint receives id 0.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Issue a new credit owned by `caller`.
    ///
    /// Raw integers are accepted so that zero and negative amounts surface
    /// as [`LedgerError::InvalidAmount`]. Amount is validated before vintage.
    pub fn mint(
        &mut self,
        amount: i64,
        vintage: i64,
        caller: &Principal,
    ) -> Result<CreditId, LedgerError> {
        let result = self.try_mint(amount, vintage, caller);
        match &result {
            Ok(id) => tracing::debug!(credit_id = %id, owner = %caller, amount, vintage, "credit minted"),
            Err(e) => tracing::debug!(caller = %caller, amount, vintage, error = %e, "mint rejected"),
        }
        result
    }

    fn try_mint(
        &mut self,
        amount: i64,
        vintage: i64,
        caller: &Principal,
    ) -> Result<CreditId, LedgerError> {
        let amount =
            Amount::try_from(amount).map_err(|_| LedgerError::InvalidAmount { amount })?;
        let vintage =
            Vintage::try_from(vintage).map_err(|_| LedgerError::InvalidVintage { vintage })?;

        let id = self.next_id;
        let next = id.next().ok_or(LedgerError::IdSpaceExhausted)?;
        let now = Timestamp::now();

        self.credits
            .insert(id, Credit::new(id, amount, vintage, caller.clone(), now));
        self.next_id = next;
        self.record(
            now,
            LedgerEventKind::Minted {
                credit_id: id,
                amount,
                vintage,
                owner: caller.clone(),
            },
        );
        Ok(id)
    }

    /// Move an active credit from `caller` to `new_owner`.
    ///
    /// Transferring to the current owner succeeds without changing the record.
    pub fn transfer(
        &mut self,
        id: CreditId,
        new_owner: &Principal,
        caller: &Principal,
    ) -> Result<(), LedgerError> {
        let credit = self
            .credits
            .get_mut(&id)
            .ok_or(LedgerError::NotFound { id })?;
        match credit.transfer_to(new_owner.clone(), caller) {
            Ok(previous) => {
                tracing::debug!(credit_id = %id, from = %previous, to = %new_owner, "credit transferred");
                self.record(
                    Timestamp::now(),
                    LedgerEventKind::Transferred {
                        credit_id: id,
                        from: previous,
                        to: new_owner.clone(),
                    },
                );
                Ok(())
            }
            Err(e) => {
                tracing::debug!(credit_id = %id, caller = %caller, error = %e, "transfer rejected");
                Err(e)
            }
        }
    }

    /// Permanently retire an active credit owned by `caller`.
    ///
    /// Retiring twice is rejected with [`LedgerError::AlreadyRetired`].
    pub fn retire(&mut self, id: CreditId, caller: &Principal) -> Result<(), LedgerError> {
        let now = Timestamp::now();
        let credit = self
            .credits
            .get_mut(&id)
            .ok_or(LedgerError::NotFound { id })?;
        match credit.retire(caller, now) {
            Ok(()) => {
                tracing::debug!(credit_id = %id, owner = %caller, "credit retired");
                self.record(
                    now,
                    LedgerEventKind::Retired {
                        credit_id: id,
                        owner: caller.clone(),
                    },
                );
                Ok(())
            }
            Err(e) => {
                tracing::debug!(credit_id = %id, caller = %caller, error = %e, "retire rejected");
                Err(e)
            }
        }
    }

    fn record(&mut self, timestamp: Timestamp, kind: LedgerEventKind) {
        let sequence = self.events.len() as u64;
        self.events.push(LedgerEvent {
            sequence,
            timestamp,
            kind,
        });
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Look up a credit by id.
    pub fn get(&self, id: CreditId) -> Result<&Credit, LedgerError> {
        self.credits.get(&id).ok_or(LedgerError::NotFound { id })
    }

    /// All credits in id order.
    pub fn credits(&self) -> impl Iterator<Item = &Credit> {
        self.credits.values()
    }

    /// Credits matching an optional owner and an optional status, in id order.
    pub fn list(&self, owner: Option<&Principal>, status: Option<CreditStatus>) -> Vec<&Credit> {
        self.credits()
            .filter(|c| owner.map_or(true, |o| c.owner() == o))
            .filter(|c| status.map_or(true, |s| c.status() == s))
            .collect()
    }

    /// Credits currently held by `owner`, optionally narrowed by status.
    pub fn credits_owned_by(
        &self,
        owner: &Principal,
        status: Option<CreditStatus>,
    ) -> Vec<&Credit> {
        self.list(Some(owner), status)
    }

    /// The id the next successful mint will receive.
    pub fn next_id(&self) -> CreditId {
        self.next_id
    }

    /// Number of credits ever issued.
    pub fn len(&self) -> usize {
        self.credits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credits.is_empty()
    }

    /// The full event log.
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Events concerning one credit, oldest first.
    pub fn history(&self, id: CreditId) -> Result<Vec<&LedgerEvent>, LedgerError> {
        self.get(id)?;
        Ok(self
            .events
            .iter()
            .filter(|e| e.kind.credit_id() == id)
            .collect())
    }

    /// Aggregate counts by status.
    pub fn summary(&self) -> LedgerSummary {
        self.credits().fold(LedgerSummary::default(), |mut s, c| {
            s.total_credits += 1;
            match c.status() {
                CreditStatus::Active => {
                    s.active_credits += 1;
                    s.active_amount = s.active_amount.saturating_add(c.amount().value());
                }
                CreditStatus::Retired => {
                    s.retired_credits += 1;
                    s.retired_amount = s.retired_amount.saturating_add(c.amount().value());
                }
            }
            s
        })
    }

    // ── Snapshots ────────────────────────────────────────────────────

    /// Capture the full state.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            next_id: self.next_id,
            credits: self.credits().cloned().collect(),
            events: self.events.clone(),
        }
    }

    /// Rebuild a ledger from a snapshot, re-checking every invariant.
    ///
    /// Credits must be exactly ids `0..next_id` (records are never deleted),
    /// each record must be self-consistent, and event sequence numbers must
    /// run `0..n` without gaps.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Result<Self, LedgerError> {
        let LedgerSnapshot {
            next_id,
            credits,
            events,
        } = snapshot;

        if credits.len() as u64 != next_id.value() {
            return Err(LedgerError::CorruptSnapshot(format!(
                "next_id is {} but snapshot holds {} credits",
                next_id.value(),
                credits.len()
            )));
        }

        let mut map = BTreeMap::new();
        for (expected, credit) in credits.into_iter().enumerate() {
            if credit.id().value() != expected as u64 {
                return Err(LedgerError::CorruptSnapshot(format!(
                    "expected credit:{expected} at position {expected}, found {}",
                    credit.id()
                )));
            }
            credit
                .check_consistency()
                .map_err(LedgerError::CorruptSnapshot)?;
            map.insert(credit.id(), credit);
        }

        for (expected, event) in events.iter().enumerate() {
            if event.sequence != expected as u64 {
                return Err(LedgerError::CorruptSnapshot(format!(
                    "event sequence gap: expected {expected}, found {}",
                    event.sequence
                )));
            }
            if !map.contains_key(&event.kind.credit_id()) {
                return Err(LedgerError::CorruptSnapshot(format!(
                    "event {} refers to unknown {}",
                    event.sequence,
                    event.kind.credit_id()
                )));
            }
        }

        Ok(Self {
            credits: map,
            next_id,
            events,
        })
    }

    /// SHA-256 over the canonical JSON of [`Self::snapshot()`].
    pub fn state_digest(&self) -> Result<ContentDigest, CanonicalizationError> {
        snapshot_digest(&self.snapshot())
    }
}

/// SHA-256 over the canonical JSON of a snapshot.
pub fn snapshot_digest(snapshot: &LedgerSnapshot) -> Result<ContentDigest, CanonicalizationError> {
    Ok(sha256_digest(&CanonicalBytes::new(snapshot)?))
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Principal {
        Principal::new(s).unwrap()
    }

    fn wallet1() -> Principal {
        p("wallet_1")
    }

    fn wallet2() -> Principal {
        p("wallet_2")
    }

    // ── Mint ─────────────────────────────────────────────────────────

    #[test]
    fn test_first_mint_gets_id_zero() {
        let mut ledger = CreditLedger::new();
        let id = ledger.mint(100, 20240129, &wallet1()).unwrap();
        assert_eq!(id, CreditId::new(0));

        let credit = ledger.get(id).unwrap();
        assert_eq!(credit.owner(), &wallet1());
        assert_eq!(credit.status(), CreditStatus::Active);
        assert_eq!(credit.amount().value(), 100);
        assert_eq!(credit.vintage().value(), 20240129);
    }

    #[test]
    fn test_ids_are_sequential() {
        let mut ledger = CreditLedger::new();
        let ids: Vec<u64> = (0..5)
            .map(|i| ledger.mint(10 + i, 20240101, &wallet1()).unwrap().value())
            .collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        assert_eq!(ledger.next_id(), CreditId::new(5));
    }

    #[test]
    fn test_zero_amount_rejected_without_advancing_counter() {
        let mut ledger = CreditLedger::new();
        assert_eq!(
            ledger.mint(0, 20240129, &wallet1()),
            Err(LedgerError::InvalidAmount { amount: 0 })
        );
        assert_eq!(
            ledger.mint(-7, 20240129, &wallet1()),
            Err(LedgerError::InvalidAmount { amount: -7 })
        );
        assert_eq!(ledger.next_id(), CreditId::new(0));
        assert!(ledger.is_empty());
        assert!(ledger.events().is_empty());

        assert_eq!(ledger.mint(1, 20240129, &wallet1()).unwrap(), CreditId::new(0));
    }

    #[test]
    fn test_invalid_vintage_rejected() {
        let mut ledger = CreditLedger::new();
        assert_eq!(
            ledger.mint(100, 0, &wallet1()),
            Err(LedgerError::InvalidVintage { vintage: 0 })
        );
        assert_eq!(ledger.next_id(), CreditId::new(0));
    }

    #[test]
    fn test_amount_checked_before_vintage() {
        let mut ledger = CreditLedger::new();
        assert_eq!(
            ledger.mint(0, 0, &wallet1()),
            Err(LedgerError::InvalidAmount { amount: 0 })
        );
    }

    // ── Transfer ─────────────────────────────────────────────────────

    #[test]
    fn test_owner_can_transfer() {
        let mut ledger = CreditLedger::new();
        let id = ledger.mint(100, 20240129, &wallet1()).unwrap();
        ledger.transfer(id, &wallet2(), &wallet1()).unwrap();
        let credit = ledger.get(id).unwrap();
        assert_eq!(credit.owner(), &wallet2());
        assert_eq!(credit.status(), CreditStatus::Active);
    }

    #[test]
    fn test_non_owner_transfer_is_unauthorized_and_changes_nothing() {
        let mut ledger = CreditLedger::new();
        let id = ledger.mint(100, 20240129, &wallet1()).unwrap();
        let before = ledger.get(id).unwrap().clone();
        let events_before = ledger.events().len();

        let err = ledger.transfer(id, &wallet2(), &p("wallet_3")).unwrap_err();
        assert_eq!(
            err,
            LedgerError::Unauthorized {
                id,
                caller: p("wallet_3")
            }
        );
        assert_eq!(ledger.get(id).unwrap(), &before);
        assert_eq!(ledger.events().len(), events_before);
    }

    #[test]
    fn test_previous_owner_loses_control_after_transfer() {
        let mut ledger = CreditLedger::new();
        let id = ledger.mint(100, 20240129, &wallet1()).unwrap();
        ledger.transfer(id, &wallet2(), &wallet1()).unwrap();
        assert!(matches!(
            ledger.transfer(id, &wallet1(), &wallet1()),
            Err(LedgerError::Unauthorized { .. })
        ));
        assert!(matches!(
            ledger.retire(id, &wallet1()),
            Err(LedgerError::Unauthorized { .. })
        ));
    }

    #[test]
    fn test_self_transfer_is_successful_noop() {
        let mut ledger = CreditLedger::new();
        let id = ledger.mint(100, 20240129, &wallet1()).unwrap();
        ledger.transfer(id, &wallet1(), &wallet1()).unwrap();
        assert_eq!(ledger.get(id).unwrap().owner(), &wallet1());
        assert_eq!(ledger.events().len(), 2);
    }

    #[test]
    fn test_transfer_unknown_id_not_found() {
        let mut ledger = CreditLedger::new();
        assert_eq!(
            ledger.transfer(CreditId::new(9), &wallet2(), &wallet1()),
            Err(LedgerError::NotFound {
                id: CreditId::new(9)
            })
        );
    }

    // ── Retire ───────────────────────────────────────────────────────

    #[test]
    fn test_retire_once_then_already_retired() {
        let mut ledger = CreditLedger::new();
        let id = ledger.mint(100, 20240129, &wallet1()).unwrap();
        ledger.retire(id, &wallet1()).unwrap();
        assert_eq!(ledger.get(id).unwrap().status(), CreditStatus::Retired);

        assert_eq!(
            ledger.retire(id, &wallet1()),
            Err(LedgerError::AlreadyRetired { id })
        );
        assert_eq!(
            ledger.transfer(id, &wallet2(), &wallet1()),
            Err(LedgerError::AlreadyRetired { id })
        );
        assert_eq!(
            ledger.transfer(id, &wallet2(), &p("anyone")),
            Err(LedgerError::AlreadyRetired { id })
        );
    }

    #[test]
    fn test_non_owner_cannot_retire() {
        let mut ledger = CreditLedger::new();
        let id = ledger.mint(100, 20240129, &wallet1()).unwrap();
        assert!(matches!(
            ledger.retire(id, &wallet2()),
            Err(LedgerError::Unauthorized { .. })
        ));
        assert_eq!(ledger.get(id).unwrap().status(), CreditStatus::Active);
    }

    #[test]
    fn test_retire_unknown_id_not_found() {
        let mut ledger = CreditLedger::new();
        assert!(matches!(
            ledger.retire(CreditId::new(0), &wallet1()),
            Err(LedgerError::NotFound { .. })
        ));
    }

    #[test]
    fn test_retired_record_is_kept() {
        let mut ledger = CreditLedger::new();
        let id = ledger.mint(100, 20240129, &wallet1()).unwrap();
        ledger.retire(id, &wallet1()).unwrap();
        assert_eq!(ledger.len(), 1);
        assert!(ledger.get(id).is_ok());
        // Retired ids are never reissued.
        assert_eq!(ledger.mint(5, 20240129, &wallet1()).unwrap(), CreditId::new(1));
    }

    // ── Full scenario ────────────────────────────────────────────────

    #[test]
    fn test_mint_transfer_retire_scenario() {
        let mut ledger = CreditLedger::new();

        let id = ledger.mint(100, 20240129, &wallet1()).unwrap();
        assert_eq!(id, CreditId::new(0));

        ledger.transfer(id, &wallet2(), &wallet1()).unwrap();
        assert_eq!(ledger.get(id).unwrap().owner(), &wallet2());

        ledger.retire(id, &wallet2()).unwrap();
        assert_eq!(ledger.get(id).unwrap().status(), CreditStatus::Retired);

        assert_eq!(
            ledger.retire(id, &wallet2()),
            Err(LedgerError::AlreadyRetired { id })
        );

        let history = ledger.history(id).unwrap();
        let labels: Vec<_> = history.iter().map(|e| e.kind.label()).collect();
        assert_eq!(labels, ["minted", "transferred", "retired"]);
    }

    // ── Queries ──────────────────────────────────────────────────────

    #[test]
    fn test_list_filters_by_owner_and_status() {
        let mut ledger = CreditLedger::new();
        let a = ledger.mint(10, 20240101, &wallet1()).unwrap();
        let b = ledger.mint(20, 20240101, &wallet1()).unwrap();
        let c = ledger.mint(30, 20240101, &wallet2()).unwrap();
        ledger.retire(b, &wallet1()).unwrap();

        let ids = |v: Vec<&Credit>| v.into_iter().map(|c| c.id()).collect::<Vec<_>>();
        assert_eq!(ids(ledger.list(None, None)), vec![a, b, c]);
        assert_eq!(ids(ledger.list(Some(&wallet1()), None)), vec![a, b]);
        assert_eq!(
            ids(ledger.list(Some(&wallet1()), Some(CreditStatus::Active))),
            vec![a]
        );
        assert_eq!(ids(ledger.list(None, Some(CreditStatus::Retired))), vec![b]);
        assert_eq!(
            ids(ledger.credits_owned_by(&wallet2(), None)),
            vec![c]
        );
    }

    #[test]
    fn test_history_of_unknown_credit_is_not_found() {
        let ledger = CreditLedger::new();
        assert!(matches!(
            ledger.history(CreditId::new(0)),
            Err(LedgerError::NotFound { .. })
        ));
    }

    #[test]
    fn test_summary_counts() {
        let mut ledger = CreditLedger::new();
        ledger.mint(10, 20240101, &wallet1()).unwrap();
        let b = ledger.mint(20, 20240101, &wallet1()).unwrap();
        ledger.mint(30, 20240101, &wallet2()).unwrap();
        ledger.retire(b, &wallet1()).unwrap();

        assert_eq!(
            ledger.summary(),
            LedgerSummary {
                total_credits: 3,
                active_credits: 2,
                retired_credits: 1,
                active_amount: 40,
                retired_amount: 20,
            }
        );
    }

    #[test]
    fn test_event_sequence_is_gap_free_across_rejections() {
        let mut ledger = CreditLedger::new();
        let id = ledger.mint(10, 20240101, &wallet1()).unwrap();
        let _ = ledger.mint(0, 20240101, &wallet1());
        let _ = ledger.transfer(id, &wallet2(), &wallet2());
        ledger.transfer(id, &wallet2(), &wallet1()).unwrap();
        let _ = ledger.retire(id, &wallet1());
        ledger.retire(id, &wallet2()).unwrap();

        let seqs: Vec<u64> = ledger.events().iter().map(|e| e.sequence).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
    }

    // ── Snapshots ────────────────────────────────────────────────────

    fn populated() -> CreditLedger {
        let mut ledger = CreditLedger::new();
        let a = ledger.mint(100, 20240129, &wallet1()).unwrap();
        ledger.mint(50, 20230601, &wallet2()).unwrap();
        ledger.transfer(a, &wallet2(), &wallet1()).unwrap();
        ledger.retire(a, &wallet2()).unwrap();
        ledger
    }

    #[test]
    fn test_snapshot_restores_identical_ledger() {
        let ledger = populated();
        let restored = CreditLedger::from_snapshot(ledger.snapshot()).unwrap();
        assert_eq!(restored.snapshot(), ledger.snapshot());
        assert_eq!(
            restored.state_digest().unwrap(),
            ledger.state_digest().unwrap()
        );
        assert_eq!(restored.next_id(), CreditId::new(2));
    }

    #[test]
    fn test_snapshot_survives_json() {
        let ledger = populated();
        let json = serde_json::to_string(&ledger.snapshot()).unwrap();
        let parsed: LedgerSnapshot = serde_json::from_str(&json).unwrap();
        let restored = CreditLedger::from_snapshot(parsed).unwrap();
        assert_eq!(restored.snapshot(), ledger.snapshot());
    }

    #[test]
    fn test_restored_ledger_continues_numbering() {
        let ledger = populated();
        let mut restored = CreditLedger::from_snapshot(ledger.snapshot()).unwrap();
        assert_eq!(restored.mint(1, 20240101, &wallet1()).unwrap(), CreditId::new(2));
    }

    #[test]
    fn test_snapshot_with_missing_credit_rejected() {
        let mut snapshot = populated().snapshot();
        snapshot.credits.remove(0);
        assert!(matches!(
            CreditLedger::from_snapshot(snapshot),
            Err(LedgerError::CorruptSnapshot(_))
        ));
    }

    #[test]
    fn test_snapshot_with_rewound_counter_rejected() {
        let mut snapshot = populated().snapshot();
        snapshot.next_id = CreditId::new(1);
        assert!(matches!(
            CreditLedger::from_snapshot(snapshot),
            Err(LedgerError::CorruptSnapshot(_))
        ));
    }

    #[test]
    fn test_snapshot_with_event_gap_rejected() {
        let mut snapshot = populated().snapshot();
        snapshot.events.remove(1);
        assert!(matches!(
            CreditLedger::from_snapshot(snapshot),
            Err(LedgerError::CorruptSnapshot(_))
        ));
    }

    #[test]
    fn test_failed_operation_keeps_digest() {
        let mut ledger = populated();
        let before = ledger.state_digest().unwrap();
        let _ = ledger.retire(CreditId::new(0), &wallet2());
        let _ = ledger.transfer(CreditId::new(1), &wallet1(), &wallet1());
        let _ = ledger.mint(-1, 20240101, &wallet1());
        assert_eq!(ledger.state_digest().unwrap(), before);
    }
}

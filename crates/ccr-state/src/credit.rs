//! # Credit Record and Status
//!
//! ## States
//!
//! ```text
//! Active ──▶ Retired (terminal)
//! ```
//!
//! `Active` is the only state in which a credit's owner can change. Once a
//! credit is `Retired` none of its fields change again; the guarded
//! transitions below check for the terminal state before anything else.

use serde::{Deserialize, Serialize};

use ccr_core::{Amount, CreditId, Principal, Timestamp, Vintage};

use crate::error::LedgerError;

// ─── Credit Status ───────────────────────────────────────────────────

/// The lifecycle state of a credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditStatus {
    /// In circulation and transferable by its owner.
    Active,
    /// Permanently consumed (terminal).
    Retired,
}

impl CreditStatus {
    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Retired)
    }

    /// Lowercase label, as used in query strings and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Retired => "retired",
        }
    }
}

impl std::fmt::Display for CreditStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Active => "ACTIVE",
            Self::Retired => "RETIRED",
        })
    }
}

impl std::str::FromStr for CreditStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "retired" => Ok(Self::Retired),
            other => Err(format!("unknown credit status {other:?}")),
        }
    }
}

// ─── Credit ──────────────────────────────────────────────────────────

/// A single tokenized carbon credit.
///
/// Fields are private: only the ledger creates credits, and only the guarded
/// transitions on this type mutate them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credit {
    id: CreditId,
    amount: Amount,
    vintage: Vintage,
    owner: Principal,
    status: CreditStatus,
    minted_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    retired_at: Option<Timestamp>,
}

impl Credit {
    pub(crate) fn new(
        id: CreditId,
        amount: Amount,
        vintage: Vintage,
        owner: Principal,
        minted_at: Timestamp,
    ) -> Self {
        Self {
            id,
            amount,
            vintage,
            owner,
            status: CreditStatus::Active,
            minted_at,
            retired_at: None,
        }
    }

    pub fn id(&self) -> CreditId {
        self.id
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn vintage(&self) -> Vintage {
        self.vintage
    }

    pub fn owner(&self) -> &Principal {
        &self.owner
    }

    pub fn status(&self) -> CreditStatus {
        self.status
    }

    pub fn minted_at(&self) -> Timestamp {
        self.minted_at
    }

    /// When the credit was retired, if it has been.
    pub fn retired_at(&self) -> Option<Timestamp> {
        self.retired_at
    }

    pub fn is_retired(&self) -> bool {
        self.status.is_terminal()
    }

    /// Hand the credit to `new_owner` (ACTIVE → ACTIVE).
    ///
    /// Returns the previous owner. A transfer to the current owner succeeds
    /// and leaves the record unchanged.
    pub(crate) fn transfer_to(
        &mut self,
        new_owner: Principal,
        caller: &Principal,
    ) -> Result<Principal, LedgerError> {
        self.require_active_owner(caller)?;
        Ok(std::mem::replace(&mut self.owner, new_owner))
    }

    /// Retire the credit (ACTIVE → RETIRED).
    pub(crate) fn retire(&mut self, caller: &Principal, at: Timestamp) -> Result<(), LedgerError> {
        self.require_active_owner(caller)?;
        self.status = CreditStatus::Retired;
        self.retired_at = Some(at);
        Ok(())
    }

    /// Terminal state wins over ownership: a retired credit reports
    /// `AlreadyRetired` to every caller.
    fn require_active_owner(&self, caller: &Principal) -> Result<(), LedgerError> {
        if self.status.is_terminal() {
            return Err(LedgerError::AlreadyRetired { id: self.id });
        }
        if &self.owner != caller {
            return Err(LedgerError::Unauthorized {
                id: self.id,
                caller: caller.clone(),
            });
        }
        Ok(())
    }

    /// Internal consistency of a single record, used when loading snapshots.
    pub(crate) fn check_consistency(&self) -> Result<(), String> {
        match (self.status, self.retired_at) {
            (CreditStatus::Active, Some(_)) => {
                Err(format!("{} is active but carries a retirement time", self.id))
            }
            (CreditStatus::Retired, None) => {
                Err(format!("{} is retired without a retirement time", self.id))
            }
            _ => Ok(()),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

//! # Ledger Event Log
//!
//! Every successful mutation appends exactly one event. Sequence numbers
//! start at 0 and have no gaps; rejected operations append nothing.

use serde::{Deserialize, Serialize};

use ccr_core::{Amount, CreditId, Principal, Timestamp, Vintage};

/// One entry in the ledger's append-only log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Position in the log.
    pub sequence: u64,
    /// When the mutation was applied.
    pub timestamp: Timestamp,
    /// What happened.
    #[serde(flatten)]
    pub kind: LedgerEventKind,
}

/// The mutation recorded by a [`LedgerEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEventKind {
    Minted {
        credit_id: CreditId,
        amount: Amount,
        vintage: Vintage,
        owner: Principal,
    },
    Transferred {
        credit_id: CreditId,
        from: Principal,
        to: Principal,
    },
    Retired {
        credit_id: CreditId,
        owner: Principal,
    },
}

impl LedgerEventKind {
    /// The credit this event concerns.
    pub fn credit_id(&self) -> CreditId {
        match self {
            Self::Minted { credit_id, .. }
            | Self::Transferred { credit_id, .. }
            | Self::Retired { credit_id, .. } => *credit_id,
        }
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Minted { .. } => "minted",
            Self::Transferred { .. } => "transferred",
            Self::Retired { .. } => "retired",
        }
    }
}

//! # Credit Subcommands
//!
//! Every command loads the ledger from the snapshot file, applies at most
//! one operation, and writes the file back if the ledger changed. The file
//! is the same digest-checked format the HTTP service writes.
//!
//! Mutating commands hold an exclusive lock on `<ledger>.lock` from the
//! load until the write, so concurrent `ccr` runs against the same file
//! queue instead of handing out the same id.
//!
//! ## Subcommands
//!
//! - `mint` — Issue a new credit to the caller.
//! - `transfer` — Move a credit to another principal.
//! - `retire` — Permanently retire a credit.
//! - `show` — Print one credit as JSON.
//! - `list` — Print credits as JSON, optionally filtered.
//! - `history` — Print the events for one credit.
//! - `verify` — Check the file's digest and invariants.

use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::{Subcommand, ValueEnum};
use serde::Serialize;

use ccr_core::{CreditId, Principal};
use ccr_state::{CreditLedger, CreditStatus, LedgerSummary, SnapshotStore};

/// Credit ledger subcommands.
#[derive(Subcommand, Debug)]
pub enum CreditCommand {
    /// Issue a new credit owned by the caller. Prints the new id.
    Mint {
        /// Positive credit amount.
        #[arg(long, allow_negative_numbers = true)]
        amount: i64,
        /// Issuance date as YYYYMMDD.
        #[arg(long, allow_negative_numbers = true)]
        vintage: i64,
        /// Principal performing the mint; becomes the owner.
        #[arg(long)]
        caller: Principal,
    },

    /// Transfer a credit owned by the caller to another principal.
    Transfer {
        /// Credit id.
        #[arg(long)]
        id: u64,
        /// New owner.
        #[arg(long)]
        to: Principal,
        /// Current owner.
        #[arg(long)]
        caller: Principal,
    },

    /// Permanently retire a credit owned by the caller.
    Retire {
        /// Credit id.
        #[arg(long)]
        id: u64,
        /// Current owner.
        #[arg(long)]
        caller: Principal,
    },

    /// Print one credit as JSON.
    Show {
        #[arg(long)]
        id: u64,
    },

    /// Print credits as JSON.
    List {
        /// Only credits owned by this principal.
        #[arg(long)]
        owner: Option<Principal>,
        /// Only credits in this status.
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
    },

    /// Print the event history of one credit as JSON.
    History {
        #[arg(long)]
        id: u64,
    },

    /// Verify the ledger file's digest and invariants.
    Verify,
}

/// Credit status filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Active,
    Retired,
}

impl From<StatusArg> for CreditStatus {
    fn from(s: StatusArg) -> Self {
        match s {
            StatusArg::Active => CreditStatus::Active,
            StatusArg::Retired => CreditStatus::Retired,
        }
    }
}

/// Output of `ccr verify`.
#[derive(Debug, Serialize)]
struct VerifyReport {
    path: String,
    state_digest: String,
    next_id: u64,
    events: usize,
    #[serde(flatten)]
    summary: LedgerSummary,
}

/// Execute a credit subcommand against the ledger file at `ledger_path`,
/// writing command output to `out`.
pub fn run_credit(cmd: &CreditCommand, ledger_path: &Path, out: &mut impl Write) -> Result<u8> {
    let store = SnapshotStore::new(ledger_path);

    match cmd {
        CreditCommand::Mint {
            amount,
            vintage,
            caller,
        } => {
            let id = store.update(|l| -> Result<CreditId> {
                Ok(l.mint(*amount, *vintage, caller)?)
            })?;
            tracing::info!(credit_id = %id, owner = %caller, "credit minted");
            writeln!(out, "{}", id.value())?;
        }

        CreditCommand::Transfer { id, to, caller } => {
            store.update(|l| -> Result<()> {
                l.transfer(CreditId::new(*id), to, caller)?;
                Ok(())
            })?;
            tracing::info!(credit_id = id, from = %caller, to = %to, "credit transferred");
        }

        CreditCommand::Retire { id, caller } => {
            store.update(|l| -> Result<()> {
                l.retire(CreditId::new(*id), caller)?;
                Ok(())
            })?;
            tracing::info!(credit_id = id, owner = %caller, "credit retired");
        }

        CreditCommand::Show { id } => {
            let ledger = load(&store)?;
            let credit = ledger.get(CreditId::new(*id))?;
            print_json(out, credit)?;
        }

        CreditCommand::List { owner, status } => {
            let ledger = load(&store)?;
            let credits = ledger.list(owner.as_ref(), status.map(CreditStatus::from));
            print_json(out, &credits)?;
        }

        CreditCommand::History { id } => {
            let ledger = load(&store)?;
            let events = ledger.history(CreditId::new(*id))?;
            print_json(out, &events)?;
        }

        CreditCommand::Verify => {
            let Some(ledger) = store
                .load()
                .with_context(|| format!("ledger file {} failed verification", ledger_path.display()))?
            else {
                bail!("no ledger file at {}", ledger_path.display());
            };
            let report = VerifyReport {
                path: ledger_path.display().to_string(),
                state_digest: ledger.state_digest()?.to_hex(),
                next_id: ledger.next_id().value(),
                events: ledger.events().len(),
                summary: ledger.summary(),
            };
            print_json(out, &report)?;
        }
    }

    Ok(0)
}

fn load(store: &SnapshotStore) -> Result<CreditLedger> {
    store
        .load_or_default()
        .with_context(|| format!("failed to load ledger from {}", store.path().display()))
}

fn print_json(out: &mut impl Write, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

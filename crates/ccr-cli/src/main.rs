//! # ccr CLI entry point
//!
//! Parses command-line arguments and dispatches to the credit subcommands.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ccr_cli::credit::{run_credit, CreditCommand};

/// Carbon credit registry CLI.
///
/// Mints, transfers, retires, and inspects credits in a local ledger file.
#[derive(Parser, Debug)]
#[command(name = "ccr", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the ledger snapshot file.
    #[arg(long, global = true, default_value = ccr_cli::DEFAULT_LEDGER_PATH)]
    ledger: PathBuf,

    #[command(subcommand)]
    command: CreditCommand,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(ledger = %cli.ledger.display(), "ccr starting");

    let mut stdout = std::io::stdout().lock();
    match run_credit(&cli.command, &cli.ledger, &mut stdout) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

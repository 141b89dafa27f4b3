//! # Ledger API
//!
//! Read-only views over the whole ledger: aggregate counts with the state
//! digest, and the full event log.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::routes::credits::EventRecord;
use crate::state::AppState;

/// Aggregate ledger counts.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SummaryResponse {
    pub total_credits: u64,
    pub active_credits: u64,
    pub retired_credits: u64,
    pub active_amount: u64,
    pub retired_amount: u64,
    /// The id the next successful mint will receive.
    pub next_id: u64,
    /// Number of events in the log.
    pub event_count: u64,
    /// SHA-256 of the canonical ledger snapshot, lowercase hex.
    pub state_digest: String,
}

/// Build the ledger router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/ledger/summary", get(ledger_summary))
        .route("/v1/ledger/events", get(ledger_events))
}

/// GET /v1/ledger/summary — Counts, next id, and state digest.
#[utoipa::path(
    get,
    path = "/v1/ledger/summary",
    responses(
        (status = 200, description = "Ledger summary", body = SummaryResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "ledger"
)]
async fn ledger_summary(State(state): State<AppState>) -> Result<Json<SummaryResponse>, AppError> {
    let (summary, next_id, event_count, digest) = state.ledger.read(|l| {
        (
            l.summary(),
            l.next_id(),
            l.events().len() as u64,
            l.state_digest(),
        )
    });
    let digest = digest.map_err(|e| AppError::Internal(format!("state digest failed: {e}")))?;

    Ok(Json(SummaryResponse {
        total_credits: summary.total_credits,
        active_credits: summary.active_credits,
        retired_credits: summary.retired_credits,
        active_amount: summary.active_amount,
        retired_amount: summary.retired_amount,
        next_id: next_id.value(),
        event_count,
        state_digest: digest.to_hex(),
    }))
}

/// GET /v1/ledger/events — The full event log, oldest first.
#[utoipa::path(
    get,
    path = "/v1/ledger/events",
    responses(
        (status = 200, description = "All ledger events", body = [EventRecord]),
    ),
    security(("bearer_auth" = [])),
    tag = "ledger"
)]
async fn ledger_events(State(state): State<AppState>) -> Json<Vec<EventRecord>> {
    Json(state.ledger.read(|l| l.events().iter().map(EventRecord::from).collect::<Vec<_>>()))
}

//! # Credit API
//!
//! Mint, transfer, and retire credits, and read them back.
//!
//! Mutating routes require the [`Caller`] header; the ledger decides whether
//! that caller may act. Every successful mutation is written through to the
//! snapshot store before the response is sent.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use ccr_core::{CreditId, Principal};
use ccr_state::{Credit, CreditStatus, LedgerEvent, LedgerEventKind};

use crate::auth::Caller;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_path, extract_query};
use crate::state::AppState;

// ── DTOs ────────────────────────────────────────────────────────────────────

/// A credit as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreditRecord {
    pub id: u64,
    pub amount: u64,
    /// Issuance date as YYYYMMDD.
    pub vintage: u32,
    pub owner: String,
    /// `active` or `retired`.
    pub status: String,
    pub minted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retired_at: Option<DateTime<Utc>>,
}

impl From<&Credit> for CreditRecord {
    fn from(c: &Credit) -> Self {
        Self {
            id: c.id().value(),
            amount: c.amount().value(),
            vintage: c.vintage().value(),
            owner: c.owner().to_string(),
            status: c.status().as_str().to_string(),
            minted_at: *c.minted_at().as_datetime(),
            retired_at: c.retired_at().map(|t| *t.as_datetime()),
        }
    }
}

/// One ledger event. Which optional fields are present depends on `type`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventRecord {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    /// `minted`, `transferred`, or `retired`.
    #[serde(rename = "type")]
    pub kind: String,
    pub credit_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vintage: Option<u32>,
    /// Owner at mint or retirement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

impl From<&LedgerEvent> for EventRecord {
    fn from(e: &LedgerEvent) -> Self {
        let mut record = Self {
            sequence: e.sequence,
            timestamp: *e.timestamp.as_datetime(),
            kind: e.kind.label().to_string(),
            credit_id: e.kind.credit_id().value(),
            amount: None,
            vintage: None,
            owner: None,
            from: None,
            to: None,
        };
        match &e.kind {
            LedgerEventKind::Minted {
                amount,
                vintage,
                owner,
                ..
            } => {
                record.amount = Some(amount.value());
                record.vintage = Some(vintage.value());
                record.owner = Some(owner.to_string());
            }
            LedgerEventKind::Transferred { from, to, .. } => {
                record.from = Some(from.to_string());
                record.to = Some(to.to_string());
            }
            LedgerEventKind::Retired { owner, .. } => {
                record.owner = Some(owner.to_string());
            }
        }
        record
    }
}

/// Request to mint a credit owned by the caller.
#[derive(Debug, Deserialize, ToSchema)]
pub struct MintRequest {
    /// Must be positive.
    pub amount: i64,
    /// Issuance date as YYYYMMDD. Must be positive.
    pub vintage: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MintResponse {
    pub id: u64,
}

/// Request to transfer a credit to another principal.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TransferRequest {
    #[schema(value_type = String)]
    pub new_owner: Principal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Filters for listing credits.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Only credits owned by this principal.
    pub owner: Option<String>,
    /// `active` or `retired`.
    pub status: Option<String>,
}

impl ListParams {
    fn parse(self) -> Result<(Option<Principal>, Option<CreditStatus>), AppError> {
        let owner = self
            .owner
            .map(Principal::new)
            .transpose()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        let status = self
            .status
            .map(|s| s.parse::<CreditStatus>())
            .transpose()
            .map_err(AppError::Validation)?;
        Ok((owner, status))
    }
}

// ── Router ──────────────────────────────────────────────────────────────────

/// Build the credits router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/credits", post(mint_credit).get(list_credits))
        .route("/v1/credits/:id", get(get_credit))
        .route("/v1/credits/:id/transfer", post(transfer_credit))
        .route("/v1/credits/:id/retire", post(retire_credit))
        .route("/v1/credits/:id/history", get(credit_history))
}

// ── Handlers ────────────────────────────────────────────────────────────────

/// POST /v1/credits — Mint a new credit owned by the caller.
#[utoipa::path(
    post,
    path = "/v1/credits",
    request_body = MintRequest,
    params(("x-caller-principal" = String, Header, description = "Acting principal")),
    responses(
        (status = 201, description = "Credit minted", body = MintResponse),
        (status = 401, description = "Missing caller", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid amount or vintage", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "credits"
)]
async fn mint_credit(
    State(state): State<AppState>,
    Caller(caller): Caller,
    body: Result<Json<MintRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MintResponse>), AppError> {
    let req = extract_json(body)?;
    let (amount, vintage, owner) = (req.amount, req.vintage, caller.clone());
    let id = state
        .commit(move |l| l.mint(amount, vintage, &owner))
        .await?;
    tracing::info!(credit_id = %id, owner = %caller, amount = req.amount, "credit minted");
    Ok((StatusCode::CREATED, Json(MintResponse { id: id.value() })))
}

/// GET /v1/credits — List credits, optionally filtered.
#[utoipa::path(
    get,
    path = "/v1/credits",
    params(ListParams),
    responses(
        (status = 200, description = "Matching credits in id order", body = [CreditRecord]),
        (status = 422, description = "Invalid filter", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "credits"
)]
async fn list_credits(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<CreditRecord>>, AppError> {
    let (owner, status) = extract_query(params)?.parse()?;
    let records = state.ledger.read(|l| {
        l.list(owner.as_ref(), status)
            .into_iter()
            .map(CreditRecord::from)
            .collect::<Vec<_>>()
    });
    Ok(Json(records))
}

/// GET /v1/credits/:id — Get one credit.
#[utoipa::path(
    get,
    path = "/v1/credits/{id}",
    params(("id" = u64, Path, description = "Credit ID")),
    responses(
        (status = 200, description = "Credit found", body = CreditRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "credits"
)]
async fn get_credit(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<CreditRecord>, AppError> {
    let id = CreditId::new(extract_path(id)?);
    let credit = state.ledger.get(id)?;
    Ok(Json(CreditRecord::from(&credit)))
}

/// POST /v1/credits/:id/transfer — Transfer a credit owned by the caller.
#[utoipa::path(
    post,
    path = "/v1/credits/{id}/transfer",
    params(
        ("id" = u64, Path, description = "Credit ID"),
        ("x-caller-principal" = String, Header, description = "Acting principal"),
    ),
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Transferred", body = SuccessResponse),
        (status = 401, description = "Missing caller", body = crate::error::ErrorBody),
        (status = 403, description = "Caller is not the owner", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Credit is retired", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "credits"
)]
async fn transfer_credit(
    State(state): State<AppState>,
    Caller(caller): Caller,
    id: Result<Path<u64>, PathRejection>,
    body: Result<Json<TransferRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, AppError> {
    let id = CreditId::new(extract_path(id)?);
    let req = extract_json(body)?;
    let (to, from) = (req.new_owner.clone(), caller.clone());
    state.commit(move |l| l.transfer(id, &to, &from)).await?;
    tracing::info!(credit_id = %id, from = %caller, to = %req.new_owner, "credit transferred");
    Ok(Json(SuccessResponse { success: true }))
}

/// POST /v1/credits/:id/retire — Permanently retire a credit owned by the caller.
#[utoipa::path(
    post,
    path = "/v1/credits/{id}/retire",
    params(
        ("id" = u64, Path, description = "Credit ID"),
        ("x-caller-principal" = String, Header, description = "Acting principal"),
    ),
    responses(
        (status = 200, description = "Retired", body = SuccessResponse),
        (status = 401, description = "Missing caller", body = crate::error::ErrorBody),
        (status = 403, description = "Caller is not the owner", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Already retired", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "credits"
)]
async fn retire_credit(
    State(state): State<AppState>,
    Caller(caller): Caller,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<SuccessResponse>, AppError> {
    let id = CreditId::new(extract_path(id)?);
    let owner = caller.clone();
    state.commit(move |l| l.retire(id, &owner)).await?;
    tracing::info!(credit_id = %id, owner = %caller, "credit retired");
    Ok(Json(SuccessResponse { success: true }))
}

/// GET /v1/credits/:id/history — Events concerning one credit.
#[utoipa::path(
    get,
    path = "/v1/credits/{id}/history",
    params(("id" = u64, Path, description = "Credit ID")),
    responses(
        (status = 200, description = "Events, oldest first", body = [EventRecord]),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "credits"
)]
async fn credit_history(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<Vec<EventRecord>>, AppError> {
    let id = CreditId::new(extract_path(id)?);
    let events = state.ledger.read(|l| {
        l.history(id)
            .map(|events| events.into_iter().map(EventRecord::from).collect::<Vec<_>>())
    })?;
    Ok(Json(events))
}

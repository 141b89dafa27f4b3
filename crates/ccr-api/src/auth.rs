//! # Authentication & Caller Identity
//!
//! Two separate concerns:
//!
//! - **Bearer token** (`auth_middleware`): when a token is configured, every
//!   `/v1/*` request must present `Authorization: Bearer <token>`. This
//!   gates access to the service as a whole.
//! - **Caller principal** ([`Caller`]): the identity on whose behalf an
//!   operation runs, read from the `x-caller-principal` header. The ledger
//!   checks ownership against this value.
//!
//! The service trusts the header. Deployments place it behind a gateway that
//! authenticates end users and sets the header.

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;

use ccr_core::Principal;

use crate::error::AppError;

/// Header carrying the caller's principal.
pub const CALLER_HEADER: &str = "x-caller-principal";

// ── Caller ──────────────────────────────────────────────────────────────────

/// The principal performing a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub Principal);

/// Returns 401 if the header is missing, not UTF-8, or not a valid principal.
#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(CALLER_HEADER)
            .ok_or_else(|| AppError::Unauthorized(format!("missing {CALLER_HEADER} header")))?
            .to_str()
            .map_err(|_| AppError::Unauthorized(format!("{CALLER_HEADER} is not valid UTF-8")))?;
        Principal::new(raw)
            .map(Caller)
            .map_err(|e| AppError::Unauthorized(format!("invalid {CALLER_HEADER}: {e}")))
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
#[derive(Clone)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Constant-time comparison of bearer tokens.
///
/// On length mismatch a dummy comparison still runs so that timing does not
/// depend on where the inputs diverge.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Reject requests without the configured bearer token.
///
/// When `AuthConfig.token` is `None`, every request passes.
pub async fn auth_middleware(request: Request, next: Next) -> Response {
    let expected = request
        .extensions()
        .get::<AuthConfig>()
        .and_then(|c| c.token.clone());

    let Some(expected) = expected else {
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match provided {
        Some(value) => match value.strip_prefix("Bearer ") {
            Some(token) if constant_time_token_eq(token, &expected) => next.run(request).await,
            Some(_) => {
                tracing::warn!("authentication failed: invalid bearer token");
                AppError::Unauthorized("invalid bearer token".into()).into_response()
            }
            None => {
                tracing::warn!("authentication failed: non-Bearer authorization scheme");
                AppError::Unauthorized("authorization header must use Bearer scheme".into())
                    .into_response()
            }
        },
        None => {
            tracing::warn!("authentication failed: missing authorization header");
            AppError::Unauthorized("missing authorization header".into()).into_response()
        }
    }
}

//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps ledger errors to HTTP status codes and JSON bodies carrying a
//! machine-readable code. Internal error details never reach the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use ccr_state::LedgerError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "ALREADY_RETIRED").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Mint amount was not positive (422).
    #[error("{0}")]
    InvalidAmount(String),

    /// Mint vintage was not a positive date-like integer (422).
    #[error("{0}")]
    InvalidVintage(String),

    /// Credit does not exist (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// A query or path parameter failed validation (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (422).
    ///
    /// Syntactically valid HTTP with unusable content is 422, same as
    /// `Validation`. Only malformed framing is left to hyper's 400.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid credentials or caller identity (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but does not own the credit (403).
    #[error("{0}")]
    NotOwner(String),

    /// The credit is retired (409).
    #[error("{0}")]
    AlreadyRetired(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::InvalidAmount(_) => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_AMOUNT"),
            Self::InvalidVintage(_) => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_VINTAGE"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::UNPROCESSABLE_ENTITY, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::NotOwner(_) => (StatusCode::FORBIDDEN, "UNAUTHORIZED_CALLER"),
            Self::AlreadyRetired(_) => (StatusCode::CONFLICT, "ALREADY_RETIRED"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => {
                tracing::error!(error = %self, "internal server error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let msg = err.to_string();
        match err {
            LedgerError::InvalidAmount { .. } => Self::InvalidAmount(msg),
            LedgerError::InvalidVintage { .. } => Self::InvalidVintage(msg),
            LedgerError::NotFound { .. } => Self::NotFound(msg),
            LedgerError::Unauthorized { .. } => Self::NotOwner(msg),
            LedgerError::AlreadyRetired { .. } => Self::AlreadyRetired(msg),
            LedgerError::IdSpaceExhausted | LedgerError::CorruptSnapshot(_) => Self::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccr_core::{CreditId, Principal};
    use http_body_util::BodyExt;

    fn status_of(err: LedgerError) -> (StatusCode, &'static str) {
        AppError::from(err).status_and_code()
    }

    #[test]
    fn ledger_errors_map_to_status_and_code() {
        let id = CreditId::new(3);
        assert_eq!(
            status_of(LedgerError::InvalidAmount { amount: 0 }),
            (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_AMOUNT")
        );
        assert_eq!(
            status_of(LedgerError::InvalidVintage { vintage: -1 }),
            (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_VINTAGE")
        );
        assert_eq!(
            status_of(LedgerError::NotFound { id }),
            (StatusCode::NOT_FOUND, "NOT_FOUND")
        );
        assert_eq!(
            status_of(LedgerError::Unauthorized {
                id,
                caller: Principal::new("mallory").unwrap()
            }),
            (StatusCode::FORBIDDEN, "UNAUTHORIZED_CALLER")
        );
        assert_eq!(
            status_of(LedgerError::AlreadyRetired { id }),
            (StatusCode::CONFLICT, "ALREADY_RETIRED")
        );
        assert_eq!(
            status_of(LedgerError::IdSpaceExhausted),
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
        );
    }

    #[test]
    fn bad_request_is_unprocessable() {
        let (status, code) = AppError::BadRequest("malformed JSON".into()).status_and_code();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(code, "BAD_REQUEST");
    }

    #[tokio::test]
    async fn internal_error_hides_message() {
        let response = AppError::Internal("disk full at /var/lib/ccr".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error.code, "INTERNAL_ERROR");
        assert!(!body.error.message.contains("disk full"));
    }

    #[tokio::test]
    async fn client_error_carries_message() {
        let response = AppError::from(LedgerError::AlreadyRetired {
            id: CreditId::new(0),
        })
        .into_response();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error.message, "credit:0 is already retired");
    }
}

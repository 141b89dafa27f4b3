//! # ccr-api — HTTP Service for the Carbon Credit Registry
//!
//! Exposes the credit ledger over HTTP. Request and response bodies are JSON.
//!
//! ## API Surface
//!
//! | Prefix                  | Module                 | Purpose                    |
//! |-------------------------|------------------------|----------------------------|
//! | `/v1/credits/*`         | [`routes::credits`]    | Mint, transfer, retire, reads |
//! | `/v1/ledger/*`          | [`routes::ledger`]     | Summary and event log      |
//! | `/openapi.json`         | [`openapi`]            | Generated OpenAPI document |
//! | `/health/*`, `/metrics` | this module            | Probes and Prometheus      |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```
//!
//! The acting principal comes from the `x-caller-principal` header via the
//! [`auth::Caller`] extractor. The optional bearer token only gates access
//! to the service.

pub mod auth;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes and `/metrics` are mounted outside the auth middleware so
/// they remain accessible without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = ApiMetrics::new();
    let metrics_on = state.config.metrics_enabled;

    let mut api = Router::new()
        .merge(routes::credits::router())
        .merge(routes::ledger::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(from_fn(auth::auth_middleware));

    if metrics_on {
        api = api
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(Extension(metrics.clone()));
    }

    let api = api
        .layer(TraceLayer::new_for_http())
        .layer(Extension(auth_config))
        .with_state(state.clone());

    let mut unauthenticated = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    if metrics_on {
        unauthenticated = unauthenticated
            .route("/metrics", axum::routing::get(prometheus_metrics))
            .layer(Extension(metrics));
    }

    let unauthenticated = unauthenticated.with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// GET /metrics — Prometheus scrape endpoint.
///
/// Refreshes ledger gauges under the read lock, then encodes every metric.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    state.ledger.read(|l| metrics.observe_ledger(l));

    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — 200 "ready" once the ledger read lock can be taken
/// within a second, 503 otherwise. Writers hold the lock across snapshot
/// writes, so a slow disk shows up here.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let ledger = state.ledger.clone();
    let ready = tokio::task::spawn_blocking(move || {
        ledger
            .try_read_for(std::time::Duration::from_secs(1), |_| ())
            .is_some()
    })
    .await
    .unwrap_or(false);
    if !ready {
        return (StatusCode::SERVICE_UNAVAILABLE, "ledger locked").into_response();
    }
    (StatusCode::OK, "ready").into_response()
}

//! # Middleware Stack
//!
//! - [`metrics`]: Prometheus request metrics and ledger gauges.
//!
//! Request tracing uses `tower_http::trace::TraceLayer` directly in `app()`.

pub mod metrics;

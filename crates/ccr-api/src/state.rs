//! # Application State
//!
//! Shared state for the Axum application: the ledger handle, the optional
//! write-through snapshot store, and configuration read from the
//! environment.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use ccr_state::{CreditLedger, LedgerError, SharedLedger, SnapshotStore, StoreError};

use crate::error::AppError;

// ── Configuration ───────────────────────────────────────────────────────────

/// Log output format for the service binary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Invalid configuration value.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a port number, got {value:?}")]
    InvalidPort { var: &'static str, value: String },

    #[error("{var} must be \"true\" or \"false\", got {value:?}")]
    InvalidBool { var: &'static str, value: String },

    #[error("{var} must be \"text\" or \"json\", got {value:?}")]
    InvalidLogFormat { var: &'static str, value: String },

    #[error("{var} is set but empty")]
    Empty { var: &'static str },
}

/// Service configuration.
///
/// Custom `Debug` redacts the token value to prevent credential leakage in logs.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Static bearer token. If `None`, bearer authentication is disabled.
    pub auth_token: Option<String>,
    /// Write-through snapshot file. If `None`, the ledger is in-memory only.
    pub snapshot_path: Option<PathBuf>,
    /// Serve `/metrics` and record request metrics.
    pub metrics_enabled: bool,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("snapshot_path", &self.snapshot_path)
            .field("metrics_enabled", &self.metrics_enabled)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            snapshot_path: None,
            metrics_enabled: true,
            log_format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    /// Read configuration from `CCR_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup("CCR_PORT") {
            config.port = value.trim().parse().map_err(|_| ConfigError::InvalidPort {
                var: "CCR_PORT",
                value,
            })?;
        }

        if let Some(token) = lookup("CCR_AUTH_TOKEN") {
            if token.is_empty() {
                return Err(ConfigError::Empty {
                    var: "CCR_AUTH_TOKEN",
                });
            }
            config.auth_token = Some(token);
        }

        if let Some(path) = lookup("CCR_SNAPSHOT_PATH") {
            if path.trim().is_empty() {
                return Err(ConfigError::Empty {
                    var: "CCR_SNAPSHOT_PATH",
                });
            }
            config.snapshot_path = Some(PathBuf::from(path));
        }

        if let Some(value) = lookup("CCR_METRICS_ENABLED") {
            config.metrics_enabled = match value.to_lowercase().as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => {
                    return Err(ConfigError::InvalidBool {
                        var: "CCR_METRICS_ENABLED",
                        value,
                    })
                }
            };
        }

        if let Some(value) = lookup("CCR_LOG_FORMAT") {
            config.log_format = match value.to_lowercase().as_str() {
                "text" => LogFormat::Text,
                "json" => LogFormat::Json,
                _ => {
                    return Err(ConfigError::InvalidLogFormat {
                        var: "CCR_LOG_FORMAT",
                        value,
                    })
                }
            };
        }

        Ok(config)
    }
}

// ── State ───────────────────────────────────────────────────────────────────

/// Shared application state passed to all route handlers.
///
/// Cheaply cloneable: all clones share the same ledger and store.
#[derive(Debug, Clone)]
pub struct AppState {
    pub ledger: SharedLedger,
    pub store: Option<Arc<SnapshotStore>>,
    pub config: AppConfig,
}

impl AppState {
    /// Empty in-memory ledger with default configuration.
    pub fn new() -> Self {
        Self::with_ledger(CreditLedger::new(), AppConfig::default())
    }

    /// Wrap an existing ledger. No snapshot store is attached.
    pub fn with_ledger(ledger: CreditLedger, config: AppConfig) -> Self {
        Self {
            ledger: SharedLedger::new(ledger),
            store: None,
            config,
        }
    }

    /// Build state from configuration, loading the snapshot file if one is
    /// configured and present.
    pub fn open(config: AppConfig) -> Result<Self, StoreError> {
        match config.snapshot_path.clone() {
            Some(path) => {
                let store = SnapshotStore::new(path);
                let ledger = store.load_or_default()?;
                Ok(Self {
                    ledger: SharedLedger::new(ledger),
                    store: Some(Arc::new(store)),
                    config,
                })
            }
            None => Ok(Self::with_ledger(CreditLedger::new(), config)),
        }
    }

    /// Apply a ledger mutation and, when a snapshot store is attached,
    /// write the resulting snapshot before the change becomes visible.
    ///
    /// A rejected operation or a failed write leaves the ledger exactly as
    /// it was. With a store, the whole step runs on the blocking pool since
    /// the file write happens under the ledger's write lock.
    pub async fn commit<R, F>(&self, op: F) -> Result<R, AppError>
    where
        R: Send + 'static,
        F: FnOnce(&mut CreditLedger) -> Result<R, LedgerError> + Send + 'static,
    {
        let Some(store) = self.store.clone() else {
            return self.ledger.apply(op, |_| Ok(())).map_err(AppError::from);
        };
        let ledger = self.ledger.clone();
        tokio::task::spawn_blocking(move || {
            ledger.apply(
                |l| op(l).map_err(AppError::from),
                |l| {
                    store.save(l.snapshot()).map(|_| ()).map_err(|e| {
                        tracing::error!(error = %e, "failed to persist ledger snapshot");
                        AppError::Internal(format!("snapshot write failed: {e}"))
                    })
                },
            )
        })
        .await
        .map_err(|e| AppError::Internal(format!("ledger task failed: {e}")))?
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

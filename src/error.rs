//! Crate-wide error type.

/// Errors surfaced by the replication and audit layers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("table '{table}' is not in the sync allowlist")]
    TableNotAllowed { table: String },

    #[error("invalid SQL identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("invalid row payload: {0}")]
    InvalidRow(String),

    #[error("a full sync is already running")]
    SyncInProgress,

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

//! Error types for client-side connection handling.

use d1_core::D1Error;
use thiserror::Error;

/// Errors that can occur while resolving, caching, or opening databases.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No current database has been selected.
    #[error("no database connected, call connect first")]
    NotConnected,

    /// The named database is not in the cache.
    #[error("database {0} not connected, call connect first")]
    DatabaseNotConnected(String),

    /// Resolving a database name to its identifier failed.
    #[error("failed to connect to database {name}: {source}")]
    Connect {
        name: String,
        #[source]
        source: D1Error,
    },

    /// Local SQLite failure.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A query issued through the client failed.
    #[error(transparent)]
    Query(#[from] D1Error),
}

/// Convenience alias for results with [`ClientError`].
pub type Result<T> = std::result::Result<T, ClientError>;

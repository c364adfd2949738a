//! Error types for migration parsing, discovery, and execution.

use d1_core::D1Error;
use thiserror::Error;

use crate::migration::Direction;

/// Errors that can occur while loading or applying migrations.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// Migration text could not be read.
    #[error("error parsing migration ({id}): {source}")]
    Parse {
        id: String,
        #[source]
        source: std::io::Error,
    },

    /// File I/O failure while listing or opening migration files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A migration source could not produce its migrations.
    #[error("migration source error: {0}")]
    Source(String),

    /// The ledger table could not be created or read.
    #[error("migration ledger error: {0}")]
    Ledger(#[source] D1Error),

    /// A statement or ledger update failed while applying a migration.
    ///
    /// `applied` counts the migrations that completed before the failure.
    #[error("failed to apply migration {id} ({direction}) after {applied} applied: {source}")]
    Execution {
        id: String,
        direction: Direction,
        applied: usize,
        #[source]
        source: D1Error,
    },

    /// Ledger table name contains invalid characters.
    #[error("invalid table name '{0}': must contain only alphanumeric characters and underscores")]
    InvalidTableName(String),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl MigrateError {
    /// Returns the number of migrations completed before an execution
    /// failure, or zero for errors raised before anything ran.
    pub fn applied(&self) -> usize {
        match self {
            Self::Execution { applied, .. } => *applied,
            _ => 0,
        }
    }
}

/// Convenience alias for results with [`MigrateError`].
pub type Result<T> = std::result::Result<T, MigrateError>;

//! Error types for response decoding and row mapping.
//!
//! A single error type covers every failure the row engine can report, from
//! transport pass-through to per-column conversion failures.

use thiserror::Error;

use crate::value::CoerceError;

/// Errors that can occur while talking to the service or decoding its rows.
#[derive(Debug, Error)]
pub enum D1Error {
    /// Network or transport failure, passed through from the transport.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The request reached the service but it reported a failure.
    #[error("api error: {0}")]
    Api(String),

    /// The envelope did not have the expected structure.
    #[error("unexpected response shape: {0}")]
    Shape(String),

    /// A positional row did not match the width of the column set.
    #[error("row {row} has {actual} values but expected {expected} columns")]
    RowWidthMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// A positional scan was given the wrong number of destinations.
    #[error("expected {expected} destination arguments in scan, not {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    /// A column value could not be coerced into its destination.
    #[error("scan error on column '{column}': {source}")]
    Conversion {
        column: String,
        #[source]
        source: CoerceError,
    },

    /// The cursor was used after [`Cursor::close`](crate::Cursor::close).
    #[error("cursor is closed")]
    CursorClosed,

    /// A scan was attempted while the cursor was not positioned on a row.
    #[error("cursor is not positioned on a row; call next() first")]
    NoCurrentRow,

    /// A single-row lookup found nothing.
    #[error("no rows in result set")]
    NoRows,

    /// Scanning a whole result set failed at the given row.
    #[error("scan failed at row {index}: {source}")]
    Record {
        index: usize,
        #[source]
        source: Box<D1Error>,
    },

    /// A query argument could not be encoded as a parameter.
    #[error("cannot convert parameter #{index}: {message}")]
    Param { index: usize, message: String },
}

impl D1Error {
    /// Wraps any transport-level error.
    pub fn transport(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Transport(err.into())
    }
}

/// Convenience alias for results with [`D1Error`].
pub type Result<T> = std::result::Result<T, D1Error>;

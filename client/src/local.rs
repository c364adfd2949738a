//! A transport that runs statements against a local SQLite database.
//!
//! D1 is SQLite underneath, so a local file is a faithful stand-in during
//! development and in tests. [`LocalTransport`] answers with the same
//! envelope the HTTP API produces: positional rows plus a column list for
//! queries, `meta.changes`/`meta.last_row_id` for writes, and
//! `success: false` with the SQLite message when a statement fails.

use std::path::{Path, PathBuf};

use d1_core::{Envelope, Transport};
use rusqlite::Connection;
use rusqlite::types::ValueRef;
use serde_json::{Number, Value, json};
use tracing::debug;

use crate::error::Result;
use crate::pool::Connector;

/// Error code reported in failure envelopes, matching the remote service.
const SQL_ERROR_CODE: i64 = 7500;

/// Executes statements on a local SQLite connection.
#[derive(Debug)]
pub struct LocalTransport {
    conn: Connection,
}

impl LocalTransport {
    /// Opens (or creates) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            conn: Connection::open(path)?,
        })
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Returns a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Runs one statement and builds the result item for the envelope.
    fn run(&self, sql: &str, params: &[String]) -> rusqlite::Result<Value> {
        let statement = sql.trim().trim_end_matches(';').trim_end();
        let mut stmt = self.conn.prepare(statement)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let bound = rusqlite::params_from_iter(params.iter());

        if columns.is_empty() {
            let changes = stmt.execute(bound)?;
            return Ok(json!({
                "results": { "columns": [], "rows": [] },
                "meta": {
                    "changes": changes,
                    "rows_written": changes,
                    "last_row_id": self.conn.last_insert_rowid(),
                },
                "success": true,
            }));
        }

        let mut rows = stmt.query(bound)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let values = (0..columns.len())
                .map(|i| row.get_ref(i).map(wire_value))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            out.push(Value::Array(values));
        }
        let rows_read = out.len();
        Ok(json!({
            "results": { "columns": columns, "rows": out },
            "meta": {
                "changes": 0,
                "rows_read": rows_read,
                "last_row_id": self.conn.last_insert_rowid(),
            },
            "success": true,
        }))
    }
}

fn wire_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Number(i.into()),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}

impl Transport for LocalTransport {
    fn query(&self, sql: &str, params: &[String]) -> d1_core::Result<Envelope> {
        match self.run(sql, params) {
            Ok(item) => Ok(Envelope::ok(item)),
            Err(err) => {
                debug!(error = %err, "local statement failed");
                Ok(Envelope::failure(SQL_ERROR_CODE, err.to_string()))
            }
        }
    }
}

/// Resolves database names to `<root>/<name>.sqlite` files.
#[derive(Debug, Clone)]
pub struct LocalConnector {
    root: PathBuf,
}

impl LocalConnector {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the file backing `database_id`.
    pub fn path_for(&self, database_id: &str) -> PathBuf {
        self.root.join(format!("{database_id}.sqlite"))
    }
}

impl Connector for LocalConnector {
    type Transport = LocalTransport;

    fn resolve(&self, name: &str) -> d1_core::Result<String> {
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
            return Err(d1_core::D1Error::Api(format!(
                "database with name {name} not found"
            )));
        }
        Ok(name.to_string())
    }

    fn open(&self, database_id: &str) -> d1_core::Result<LocalTransport> {
        LocalTransport::open(self.path_for(database_id)).map_err(d1_core::D1Error::transport)
    }
}

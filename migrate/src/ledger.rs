//! The ledger table recording applied migrations.
//!
//! Rows are read in insertion (`rowid`) order so the down plan can walk
//! them back most recent first.

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use d1_core::record;

use crate::error::{MigrateError, Result};

/// Table name used when none is configured.
pub const DEFAULT_TABLE: &str = "d1_migrations";

/// One applied migration as stored in the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerRecord {
    pub id: String,
    /// RFC 3339 timestamp written when the migration was applied.
    pub applied_at: String,
}

record!(LedgerRecord { id, applied_at });

impl LedgerRecord {
    /// Parses [`applied_at`](Self::applied_at), if it holds an RFC 3339
    /// timestamp.
    pub fn applied_at_time(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.applied_at).ok()
    }
}

/// Validates that a table name is safe to interpolate into SQL.
pub(crate) fn validate_table_name(table: &str) -> Result<()> {
    if table.is_empty() || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(MigrateError::InvalidTableName(table.to_string()));
    }
    Ok(())
}

pub(crate) fn create_table_sql(table: &str) -> String {
    format!("CREATE TABLE IF NOT EXISTS {table} (id TEXT PRIMARY KEY, applied_at DATETIME)")
}

pub(crate) fn select_sql(table: &str) -> String {
    format!("SELECT id, applied_at FROM {table} ORDER BY rowid ASC")
}

pub(crate) fn insert_sql(table: &str) -> String {
    format!("INSERT INTO {table} (id, applied_at) VALUES (?, ?)")
}

pub(crate) fn delete_sql(table: &str) -> String {
    format!("DELETE FROM {table} WHERE id = ?")
}

/// Current time as stored in `applied_at`.
pub(crate) fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_table_name() {
        assert!(validate_table_name("d1_migrations").is_ok());
        assert!(validate_table_name("Schema2").is_ok());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("x; DROP TABLE y").is_err());
        assert!(validate_table_name("with-dash").is_err());
    }

    #[test]
    fn test_sql_uses_table_name() {
        assert_eq!(
            create_table_sql("ledger"),
            "CREATE TABLE IF NOT EXISTS ledger (id TEXT PRIMARY KEY, applied_at DATETIME)"
        );
        assert!(select_sql("ledger").contains("FROM ledger ORDER BY rowid"));
        assert!(insert_sql("ledger").starts_with("INSERT INTO ledger"));
        assert!(delete_sql("ledger").starts_with("DELETE FROM ledger"));
    }

    #[test]
    fn test_applied_at_round_trips_through_chrono() {
        let record = LedgerRecord {
            id: "1".to_string(),
            applied_at: now(),
        };
        assert!(record.applied_at_time().is_some());
        assert!(record.applied_at.ends_with('Z'));

        let unparsable = LedgerRecord {
            id: "2".to_string(),
            applied_at: "yesterday".to_string(),
        };
        assert!(unparsable.applied_at_time().is_none());
    }
}

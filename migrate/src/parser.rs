//! Parser for annotated SQL migration files.
//!
//! A migration file is plain SQL split into sections by directive comments:
//!
//! ```sql
//! -- +migrate Up
//! CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);
//!
//! -- +migrate Down notransaction
//! DROP TABLE users;
//! ```
//!
//! Text before the first directive belongs to the Up section. Each section is
//! split on `;` without regard for quotes or comments, so a literal
//! semicolon inside a string breaks the statement in two.
//! `StatementBegin`/`StatementEnd` directives are accepted and ignored.

use std::io::BufRead;

use tracing::debug;

use crate::error::{MigrateError, Result};
use crate::migration::{Direction, Migration};

const UP_DIRECTIVE: &str = "-- +migrate Up";
const DOWN_DIRECTIVE: &str = "-- +migrate Down";
const STATEMENT_BEGIN_DIRECTIVE: &str = "-- +migrate StatementBegin";
const STATEMENT_END_DIRECTIVE: &str = "-- +migrate StatementEnd";
const NO_TRANSACTION: &str = "notransaction";

const STATEMENT_TERMINATOR: char = ';';

/// Parses migration text read from `reader`.
///
/// # Errors
///
/// Returns [`MigrateError::Parse`] naming `id` if the text cannot be read,
/// including when it is not valid UTF-8.
pub fn parse_migration(id: impl Into<String>, reader: impl BufRead) -> Result<Migration> {
    let mut migration = Migration::new(id);
    let mut direction = Direction::Up;
    let mut buffer = String::new();

    for line in reader.lines() {
        let line = line.map_err(|source| MigrateError::Parse {
            id: migration.id.clone(),
            source,
        })?;

        if line.starts_with(UP_DIRECTIVE) {
            flush(&mut migration, direction, &mut buffer);
            direction = Direction::Up;
            if line.contains(NO_TRANSACTION) {
                migration.disable_transaction_up = true;
            }
        } else if line.starts_with(DOWN_DIRECTIVE) {
            flush(&mut migration, direction, &mut buffer);
            direction = Direction::Down;
            if line.contains(NO_TRANSACTION) {
                migration.disable_transaction_down = true;
            }
        } else if line.starts_with(STATEMENT_BEGIN_DIRECTIVE)
            || line.starts_with(STATEMENT_END_DIRECTIVE)
        {
            continue;
        } else {
            if !buffer.is_empty() {
                buffer.push('\n');
            }
            buffer.push_str(&line);
        }
    }
    flush(&mut migration, direction, &mut buffer);

    debug!(
        id = %migration.id,
        up = migration.up.len(),
        down = migration.down.len(),
        "parsed migration"
    );
    Ok(migration)
}

/// Splits the buffered section into statements and appends them.
fn flush(migration: &mut Migration, direction: Direction, buffer: &mut String) {
    if buffer.is_empty() {
        return;
    }
    let target = match direction {
        Direction::Up => &mut migration.up,
        Direction::Down => &mut migration.down,
    };
    target.extend(
        buffer
            .split(STATEMENT_TERMINATOR)
            .map(str::trim)
            .filter(|statement| !statement.is_empty())
            .map(String::from),
    );
    buffer.clear();
}

impl Migration {
    /// Parses migration text held in memory.
    ///
    /// ```
    /// use d1_migrate::Migration;
    ///
    /// let m = Migration::parse(
    ///     "1_init",
    ///     "-- +migrate Up\nCREATE TABLE t(x);\n-- +migrate Down\nDROP TABLE t;\n",
    /// )
    /// .unwrap();
    /// assert_eq!(m.up, ["CREATE TABLE t(x)"]);
    /// assert_eq!(m.down, ["DROP TABLE t"]);
    /// ```
    pub fn parse(id: impl Into<String>, text: &str) -> Result<Self> {
        parse_migration(id, text.as_bytes())
    }
}

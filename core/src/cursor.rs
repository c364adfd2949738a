//! Forward-only cursor over a normalized result set.
//!
//! A [`Cursor`] starts before the first row. Each [`next`](Cursor::next)
//! advances by one; once past the last row it stays exhausted. Scans read
//! the current row either positionally (in column-set order) or by name
//! through a [`Record`] descriptor.
//!
//! The cursor mutates a single position and is not meant to be advanced from
//! several threads at once.
//!
//! # Example
//!
//! ```
//! use d1_core::{Cursor, RowSet};
//! use serde_json::json;
//!
//! let set = RowSet {
//!     columns: vec!["id".into(), "name".into()],
//!     rows: vec![json!({"id": 1, "name": "ada"}).as_object().cloned().unwrap()],
//! };
//! let mut cursor = Cursor::new(set);
//! let (mut id, mut name) = (0i64, String::new());
//! while cursor.next() {
//!     cursor.scan(&mut [&mut id, &mut name]).unwrap();
//! }
//! assert_eq!((id, name.as_str()), (1, "ada"));
//! ```

use serde_json::Value;

use crate::envelope::RowSet;
use crate::error::{D1Error, Result};
use crate::record::Record;
use crate::value::{RawRow, ScanTarget};

/// Stateful iterator over normalized rows.
#[derive(Debug)]
pub struct Cursor {
    columns: Vec<String>,
    /// `None` once closed.
    rows: Option<Vec<RawRow>>,
    /// `-1` until the first call to `next`.
    position: isize,
}

impl Cursor {
    /// Opens a cursor positioned before the first row.
    pub fn new(set: RowSet) -> Self {
        Self {
            columns: set.columns,
            rows: Some(set.rows),
            position: -1,
        }
    }

    /// Returns the ordered column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the number of rows, or zero once closed.
    pub fn len(&self) -> usize {
        self.rows.as_ref().map_or(0, Vec::len)
    }

    /// Returns `true` if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` after [`close`](Self::close).
    pub fn is_closed(&self) -> bool {
        self.rows.is_none()
    }

    /// Advances to the next row and reports whether one is available.
    ///
    /// Returns `false` forever once the rows are exhausted or the cursor is
    /// closed.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> bool {
        let len = self.len() as isize;
        if self.position < len {
            self.position += 1;
        }
        self.position < len
    }

    /// Releases the row buffer. Calling it again has no effect.
    pub fn close(&mut self) {
        self.rows = None;
    }

    /// Returns the row the cursor is positioned on.
    pub fn row(&self) -> Result<&RawRow> {
        let rows = self.rows.as_ref().ok_or(D1Error::CursorClosed)?;
        usize::try_from(self.position)
            .ok()
            .and_then(|index| rows.get(index))
            .ok_or(D1Error::NoCurrentRow)
    }

    /// Copies the current row into `dest` in column-set order.
    ///
    /// `dest` must hold exactly one destination per column. A column missing
    /// from a keyed row is read as null.
    pub fn scan(&self, dest: &mut [&mut dyn ScanTarget]) -> Result<()> {
        let row = self.row()?;
        if dest.len() != self.columns.len() {
            return Err(D1Error::ArityMismatch {
                expected: self.columns.len(),
                actual: dest.len(),
            });
        }
        for (column, target) in self.columns.iter().zip(dest.iter_mut()) {
            let value = row.get(column).unwrap_or(&Value::Null);
            target
                .assign(value)
                .map_err(|source| D1Error::Conversion {
                    column: column.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Populates `dest` from the named columns of the current row.
    pub fn scan_record<R: Record>(&self, dest: &mut R) -> Result<()> {
        R::descriptor().apply(self.row()?, dest)
    }

    /// Scans every remaining row into a new `R`, appending to `dest`.
    pub fn scan_all_into<R: Record>(&mut self, dest: &mut Vec<R>) -> Result<()> {
        if self.is_closed() {
            return Err(D1Error::CursorClosed);
        }
        let mut index = 0;
        while self.next() {
            let mut record = R::default();
            self.scan_record(&mut record)
                .map_err(|source| D1Error::Record {
                    index,
                    source: Box::new(source),
                })?;
            dest.push(record);
            index += 1;
        }
        Ok(())
    }

    /// Scans every remaining row into a new `R`.
    ///
    /// Returns an empty vector when there are no rows.
    pub fn scan_all<R: Record>(&mut self) -> Result<Vec<R>> {
        let mut records = Vec::with_capacity(self.len());
        self.scan_all_into(&mut records)?;
        Ok(records)
    }

    /// Advances once and scans that row into a new `R`.
    pub fn first<R: Record>(&mut self) -> Result<R> {
        if self.is_closed() {
            return Err(D1Error::CursorClosed);
        }
        if !self.next() {
            return Err(D1Error::NoRows);
        }
        let mut record = R::default();
        self.scan_record(&mut record)?;
        Ok(record)
    }
}

impl From<RowSet> for Cursor {
    fn from(set: RowSet) -> Self {
        Self::new(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, PartialEq)]
    struct Person {
        id: i64,
        name: String,
        age: i32,
    }

    crate::record!(Person { id, name, age });

    fn people() -> Cursor {
        Cursor::new(RowSet {
            columns: vec!["id".into(), "name".into(), "age".into()],
            rows: vec![
                json!({"id": 1.0, "name": "ada", "age": 36.0})
                    .as_object()
                    .cloned()
                    .unwrap(),
                json!({"id": 2.0, "name": "grace", "age": null})
                    .as_object()
                    .cloned()
                    .unwrap(),
            ],
        })
    }

    #[test]
    fn test_empty_cursor() {
        let mut cursor = Cursor::new(RowSet::default());
        assert!(!cursor.next());
        assert!(cursor.scan_all::<Person>().unwrap().is_empty());
    }

    #[test]
    fn test_next_stays_exhausted() {
        let mut cursor = people();
        assert!(cursor.next());
        assert!(cursor.next());
        assert!(!cursor.next());
        assert!(!cursor.next());
        assert!(matches!(cursor.row(), Err(D1Error::NoCurrentRow)));
    }

    #[test]
    fn test_scan_before_next_fails() {
        let cursor = people();
        let mut id = 0i64;
        let mut name = String::new();
        let mut age = 0i32;
        assert!(matches!(
            cursor.scan(&mut [&mut id, &mut name, &mut age]),
            Err(D1Error::NoCurrentRow)
        ));
    }

    #[test]
    fn test_positional_scan() {
        let mut cursor = people();
        let (mut id, mut name, mut age) = (0i64, String::new(), 0i32);
        assert!(cursor.next());
        cursor.scan(&mut [&mut id, &mut name, &mut age]).unwrap();
        assert_eq!((id, name.as_str(), age), (1, "ada", 36));
        assert!(cursor.next());
        cursor.scan(&mut [&mut id, &mut name, &mut age]).unwrap();
        assert_eq!((id, name.as_str(), age), (2, "grace", 0));
    }

    #[test]
    fn test_positional_scan_arity_mismatch() {
        let mut cursor = people();
        cursor.next();
        let mut id = 0i64;
        match cursor.scan(&mut [&mut id]).unwrap_err() {
            D1Error::ArityMismatch { expected, actual } => assert_eq!((expected, actual), (3, 1)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_scan_all() {
        let mut cursor = people();
        let all: Vec<Person> = cursor.scan_all().unwrap();
        assert_eq!(
            all,
            vec![
                Person {
                    id: 1,
                    name: "ada".into(),
                    age: 36
                },
                Person {
                    id: 2,
                    name: "grace".into(),
                    age: 0
                },
            ]
        );
        assert!(!cursor.next());
    }

    #[test]
    fn test_scan_all_appends_from_current_position() {
        let mut cursor = people();
        cursor.next();
        let mut rest = vec![Person::default()];
        cursor.scan_all_into(&mut rest).unwrap();
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[1].name, "grace");
    }

    #[test]
    fn test_scan_all_reports_row_index() {
        let mut cursor = Cursor::new(RowSet {
            columns: vec!["id".into()],
            rows: vec![
                json!({"id": 1}).as_object().cloned().unwrap(),
                json!({"id": "x"}).as_object().cloned().unwrap(),
            ],
        });
        match cursor.scan_all::<Person>().unwrap_err() {
            D1Error::Record { index, source } => {
                assert_eq!(index, 1);
                assert!(matches!(*source, D1Error::Conversion { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_first() {
        let mut cursor = people();
        let person: Person = cursor.first().unwrap();
        assert_eq!(person.name, "ada");

        let mut empty = Cursor::new(RowSet::default());
        assert!(matches!(empty.first::<Person>(), Err(D1Error::NoRows)));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut cursor = people();
        cursor.next();
        cursor.close();
        cursor.close();
        assert!(cursor.is_closed());
        assert!(!cursor.next());
        assert!(matches!(cursor.row(), Err(D1Error::CursorClosed)));
        let mut person = Person::default();
        assert!(matches!(
            cursor.scan_record(&mut person),
            Err(D1Error::CursorClosed)
        ));
        assert!(matches!(
            cursor.scan_all::<Person>(),
            Err(D1Error::CursorClosed)
        ));
        assert!(matches!(cursor.first::<Person>(), Err(D1Error::CursorClosed)));
    }
}

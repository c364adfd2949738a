//! Response envelope decoding and row normalization.
//!
//! The service answers every query with the same envelope:
//!
//! ```json
//! {
//!   "success": true,
//!   "result": [{ "results": { "columns": ["id", "name"], "rows": [[1, "ada"]] },
//!                "meta": { "changes": 0, "last_row_id": 0 } }],
//!   "errors": []
//! }
//! ```
//!
//! Rows arrive either keyed (one object per row) or positional (one array per
//! row, ordered by `columns`). [`Envelope::normalize`] turns both shapes into a
//! [`RowSet`] of keyed rows so that the [`Cursor`] only deals with one shape.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::cursor::Cursor;
use crate::error::{D1Error, Result};
use crate::record::Record;
use crate::value::RawRow;

/// Decodes an explicit `null` the same way as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A message reported in the envelope's `errors` or `messages` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiMessage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub code: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
}

/// The decoded top-level response of a query call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, deserialize_with = "null_as_default")]
    pub success: bool,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub errors: Vec<ApiMessage>,
    /// Informational notices. Never interpreted, so any shape is accepted.
    #[serde(default)]
    pub messages: Option<Value>,
}

/// Normalized rows: the ordered column set plus keyed rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// Write summary read from the `meta` block of a result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecSummary {
    pub last_row_id: i64,
    pub rows_affected: i64,
}

impl Envelope {
    /// Decodes an envelope from response body text.
    pub fn from_json(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| D1Error::Shape(format!("invalid envelope: {e}")))
    }

    /// Builds a successful envelope holding a single result item.
    pub fn ok(item: Value) -> Self {
        Self {
            success: true,
            result: Some(Value::Array(vec![item])),
            errors: Vec::new(),
            messages: None,
        }
    }

    /// Builds a failed envelope carrying one error message.
    pub fn failure(code: i64, message: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            errors: vec![ApiMessage {
                code,
                message: message.into(),
            }],
            messages: None,
        }
    }

    /// Fails with [`D1Error::Api`] if the service reported a failure.
    pub fn check(&self) -> Result<()> {
        if self.success {
            return Ok(());
        }
        let message = self
            .errors
            .first()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| "unknown error".to_string());
        Err(D1Error::Api(message))
    }

    /// Returns the result items, or `ShapeError` if `result` is not a list.
    fn result_items(&self) -> Result<&[Value]> {
        self.check()?;
        match &self.result {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(D1Error::Shape("result is not an array".to_string())),
        }
    }

    /// Normalizes the first result set into columns and keyed rows.
    ///
    /// An empty result list yields an empty [`RowSet`], as does a `rows`
    /// field that is present but not a list. Every result item must carry a
    /// `results` object, and every `columns` entry must be a string.
    ///
    /// Without a `columns` list, the column set is taken from the keys of
    /// the first keyed row in alphabetical order. Positional scans over such
    /// a result see that order, and keys appearing only in later rows are
    /// not part of the column set (named scans still find them).
    pub fn normalize(&self) -> Result<RowSet> {
        let items = self.result_items()?;
        if items.is_empty() {
            return Ok(RowSet::default());
        }

        let blocks = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                item.get("results").and_then(Value::as_object).ok_or_else(|| {
                    D1Error::Shape(format!("result item {index} is missing the results map"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let results = blocks[0];

        let Some(raw_rows) = results.get("rows").and_then(Value::as_array) else {
            return Ok(RowSet::default());
        };

        let mut columns: Vec<String> = match results.get("columns").and_then(Value::as_array) {
            Some(cols) => cols
                .iter()
                .enumerate()
                .map(|(index, col)| {
                    col.as_str().map(String::from).ok_or_else(|| {
                        D1Error::Shape(format!("column {index} is not a string: {col}"))
                    })
                })
                .collect::<Result<_>>()?,
            None => Vec::new(),
        };

        let mut rows = Vec::with_capacity(raw_rows.len());
        for (index, raw) in raw_rows.iter().enumerate() {
            let row = match raw {
                Value::Object(map) => map.clone(),
                Value::Array(values) => {
                    if values.len() != columns.len() {
                        return Err(D1Error::RowWidthMismatch {
                            row: index,
                            expected: columns.len(),
                            actual: values.len(),
                        });
                    }
                    columns
                        .iter()
                        .cloned()
                        .zip(values.iter().cloned())
                        .collect()
                }
                other => {
                    return Err(D1Error::Shape(format!(
                        "row {index} is neither an object nor an array: {other}"
                    )));
                }
            };
            rows.push(row);
        }

        // Keyed rows without a column list: take the first row's keys, which
        // the map keeps sorted.
        if columns.is_empty() {
            if let Some(first_row) = rows.first() {
                columns = first_row.keys().cloned().collect();
            }
        }

        debug!(
            columns = columns.len(),
            rows = rows.len(),
            "normalized result set"
        );
        Ok(RowSet { columns, rows })
    }

    /// Normalizes the envelope and opens a cursor over its rows.
    pub fn into_cursor(self) -> Result<Cursor> {
        Ok(Cursor::new(self.normalize()?))
    }

    /// Scans every row into a new `R`.
    pub fn scan_all<R: Record>(&self) -> Result<Vec<R>> {
        let mut cursor = Cursor::new(self.normalize()?);
        let records = cursor.scan_all();
        cursor.close();
        records
    }

    /// Scans the first row into an `R`, failing with `NoRows` if there is none.
    pub fn get<R: Record>(&self) -> Result<R> {
        let mut cursor = Cursor::new(self.normalize()?);
        let record = cursor.first();
        cursor.close();
        record
    }

    /// Reads the write summary from the first result's `meta` block.
    ///
    /// `changes` is preferred over `rows_written` as the affected-row count.
    /// A missing result or `meta` block yields zeros.
    pub fn summary(&self) -> Result<ExecSummary> {
        let items = self.result_items()?;
        let Some(first) = items.first() else {
            return Ok(ExecSummary::default());
        };
        let item = first
            .as_object()
            .ok_or_else(|| D1Error::Shape("unexpected result item format".to_string()))?;
        let Some(meta) = item.get("meta").and_then(Value::as_object) else {
            return Ok(ExecSummary::default());
        };

        let number = |key: &str| meta.get(key).and_then(Value::as_f64).map(|f| f as i64);
        Ok(ExecSummary {
            last_row_id: number("last_row_id").unwrap_or(0),
            rows_affected: number("changes")
                .or_else(|| number("rows_written"))
                .unwrap_or(0),
        })
    }
}

//! Typed access to results returned by the Cloudflare D1 HTTP API.
//!
//! The API answers every statement with a JSON envelope whose rows are either
//! keyed objects or positional arrays of untyped values. This crate turns
//! those envelopes into something a caller can work with:
//!
//! - [`Envelope`]: the decoded response, with [`normalize`](Envelope::normalize)
//!   producing a uniform [`RowSet`] and [`summary`](Envelope::summary)
//!   reading the write metadata.
//! - [`Cursor`]: a forward-only iterator with positional and named scans.
//! - [`Record`] / [`record!`]: per-type field descriptors that map column
//!   names onto struct fields through the [`ScanTarget`] coercion table.
//! - [`Transport`] / [`QueryExt`]: the boundary to the network layer and the
//!   typed `select`/`get`/`exec` helpers built on it.
//!
//! # Example
//!
//! ```
//! use d1_core::{Envelope, record};
//!
//! #[derive(Debug, Default)]
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//! record!(User { id, name });
//!
//! let body = r#"{
//!     "success": true,
//!     "result": [{ "results": { "columns": ["id", "name"], "rows": [[1, "ada"]] } }],
//!     "errors": []
//! }"#;
//! let users: Vec<User> = Envelope::from_json(body).unwrap().scan_all().unwrap();
//! assert_eq!(users[0].name, "ada");
//! ```
//!
//! All operations are synchronous and never retry; failures come back as
//! [`D1Error`] with enough context to find the offending row or column.

mod cursor;
mod envelope;
mod error;
mod params;
mod record;
mod transport;
mod value;

pub use cursor::Cursor;
pub use envelope::{ApiMessage, Envelope, ExecSummary, RowSet};
pub use error::{D1Error, Result};
pub use params::{Json, ToParam, convert_params};
pub use record::{FieldDescriptor, Record, RecordDescriptor, RecordDescriptorBuilder, Setter};
pub use transport::{QueryExt, Transport};
pub use value::{CoerceError, RawRow, ScanTarget, WireValue, number_text};

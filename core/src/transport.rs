//! The boundary to whatever actually carries queries to the database.
//!
//! A [`Transport`] takes one SQL statement plus its string parameters and
//! returns the decoded [`Envelope`]. Request construction, authentication and
//! retries are the transport's business. [`QueryExt`] layers the typed
//! helpers on top of any transport.

use tracing::debug;

use crate::cursor::Cursor;
use crate::envelope::{Envelope, ExecSummary};
use crate::error::Result;
use crate::params::{ToParam, convert_params};
use crate::record::Record;

/// Issues single SQL statements against a database.
pub trait Transport {
    /// Runs `sql` with positional `params` and returns the raw envelope.
    ///
    /// Transport failures must be reported as
    /// [`D1Error::Transport`](crate::D1Error::Transport). A service-reported
    /// failure is returned as an envelope with `success == false`.
    fn query(&self, sql: &str, params: &[String]) -> Result<Envelope>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn query(&self, sql: &str, params: &[String]) -> Result<Envelope> {
        (**self).query(sql, params)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn query(&self, sql: &str, params: &[String]) -> Result<Envelope> {
        (**self).query(sql, params)
    }
}

/// Typed query helpers available on every [`Transport`].
///
/// # Examples
///
/// ```no_run
/// use d1_core::{QueryExt, Transport, record};
///
/// #[derive(Debug, Default)]
/// struct User {
///     id: i64,
///     name: String,
/// }
/// record!(User { id, name });
///
/// fn adults(db: &impl Transport) -> d1_core::Result<Vec<User>> {
///     db.select("SELECT id, name FROM users WHERE age > ?", &[&18])
/// }
/// ```
pub trait QueryExt: Transport {
    /// Runs a statement and fails on a service-reported error.
    fn execute(&self, sql: &str, args: &[&dyn ToParam]) -> Result<Envelope> {
        let params = convert_params(args)?;
        debug!(sql, params = params.len(), "issuing statement");
        let envelope = self.query(sql, &params)?;
        envelope.check()?;
        Ok(envelope)
    }

    /// Runs a query and opens a cursor over its rows.
    fn query_rows(&self, sql: &str, args: &[&dyn ToParam]) -> Result<Cursor> {
        self.execute(sql, args)?.into_cursor()
    }

    /// Runs a query and scans every row into a new `R`.
    fn select<R: Record>(&self, sql: &str, args: &[&dyn ToParam]) -> Result<Vec<R>> {
        self.execute(sql, args)?.scan_all()
    }

    /// Runs a query and scans its first row, failing with `NoRows` if empty.
    fn get<R: Record>(&self, sql: &str, args: &[&dyn ToParam]) -> Result<R> {
        self.execute(sql, args)?.get()
    }

    /// Runs a write and returns its summary.
    fn exec(&self, sql: &str, args: &[&dyn ToParam]) -> Result<ExecSummary> {
        self.execute(sql, args)?.summary()
    }
}

impl<T: Transport + ?Sized> QueryExt for T {}

//! The migration model and its ordering rule.

use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static NUMERIC_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)").expect("static regex must compile"));

/// Which way a migration runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => f.write_str("up"),
            Self::Down => f.write_str("down"),
        }
    }
}

/// A parsed migration: an identity plus the statements for each direction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Migration {
    pub id: String,
    pub up: Vec<String>,
    pub down: Vec<String>,
    /// Set by `notransaction` on the Up directive. Informational only;
    /// statements always run one request at a time.
    pub disable_transaction_up: bool,
    /// Set by `notransaction` on the Down directive.
    pub disable_transaction_down: bool,
}

impl Migration {
    /// Creates an empty migration with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Builder-style setter for the up statements.
    pub fn with_up<I, S>(mut self, statements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.up = statements.into_iter().map(Into::into).collect();
        self
    }

    /// Builder-style setter for the down statements.
    pub fn with_down<I, S>(mut self, statements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.down = statements.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the statements to run in `direction`.
    pub fn statements(&self, direction: Direction) -> &[String] {
        match direction {
            Direction::Up => &self.up,
            Direction::Down => &self.down,
        }
    }

    /// Returns the `notransaction` flag for `direction`.
    pub fn disable_transaction(&self, direction: Direction) -> bool {
        match direction {
            Direction::Up => self.disable_transaction_up,
            Direction::Down => self.disable_transaction_down,
        }
    }

    /// Returns the leading run of ASCII digits in the id, if any.
    pub fn numeric_prefix(&self) -> Option<&str> {
        numeric_prefix(&self.id)
    }

    /// Returns the numeric prefix as an integer, or `None` if the id has no
    /// prefix or it does not fit in a `u64`.
    pub fn version(&self) -> Option<u64> {
        self.numeric_prefix().and_then(|digits| digits.parse().ok())
    }

    /// Returns `true` if this migration sorts before `other`.
    pub fn less(&self, other: &Migration) -> bool {
        compare_ids(&self.id, &other.id) == Ordering::Less
    }
}

fn numeric_prefix(id: &str) -> Option<&str> {
    NUMERIC_PREFIX
        .captures(id)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Compares two digit strings by numeric value without parsing them, so
/// arbitrarily long prefixes never overflow.
fn compare_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Orders migration ids.
///
/// Ids with a numeric prefix compare by its value and sort before ids
/// without one. Everything else, including equal prefixes, falls back to a
/// plain string comparison.
///
/// ```
/// use d1_migrate::compare_ids;
/// use std::cmp::Ordering;
///
/// assert_eq!(compare_ids("2_y", "10_x"), Ordering::Less);
/// assert_eq!(compare_ids("10_x", "alpha"), Ordering::Less);
/// ```
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    match (numeric_prefix(a), numeric_prefix(b)) {
        (Some(x), Some(y)) => compare_digits(x, y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Sorts migrations in place by [`compare_ids`].
pub fn sort_migrations(migrations: &mut [Migration]) {
    migrations.sort_by(|a, b| compare_ids(&a.id, &b.id));
}

//! Field descriptors for mapping named columns onto destination records.
//!
//! A [`RecordDescriptor`] is built once per destination type and maps column
//! names to typed setter functions. The [`record!`](crate::record) macro
//! generates the [`Record`] impl and caches the descriptor in a static, so
//! scanning never inspects the destination type at runtime.
//!
//! Fields without an explicit column name map to their lower-cased field
//! name. Fields that are not listed are left at their default value, and
//! columns that no field claims are ignored.
//!
//! # Example
//!
//! ```
//! use d1_core::{Record, record};
//!
//! #[derive(Debug, Default)]
//! struct User {
//!     id: i64,
//!     name: String,
//!     email: Option<String>,
//! }
//!
//! record!(User { id, name => "user_name", email });
//!
//! let columns: Vec<&str> = User::descriptor().columns().collect();
//! assert_eq!(columns, ["id", "user_name", "email"]);
//! ```

use crate::error::{D1Error, Result};
use crate::value::{CoerceError, RawRow, WireValue};

/// Writes one coerced column value into a field of `T`.
pub type Setter<T> = fn(&mut T, &WireValue) -> std::result::Result<(), CoerceError>;

/// One destination field and the column it is read from.
pub struct FieldDescriptor<T> {
    column: String,
    setter: Setter<T>,
}

impl<T> FieldDescriptor<T> {
    /// Returns the column name this field is populated from.
    pub fn column(&self) -> &str {
        &self.column
    }
}

impl<T> std::fmt::Debug for FieldDescriptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("column", &self.column)
            .finish_non_exhaustive()
    }
}

/// Column-to-setter mapping for a destination record type.
#[derive(Debug)]
pub struct RecordDescriptor<T> {
    fields: Vec<FieldDescriptor<T>>,
}

impl<T> RecordDescriptor<T> {
    /// Starts an empty descriptor.
    pub fn builder() -> RecordDescriptorBuilder<T> {
        RecordDescriptorBuilder { fields: Vec::new() }
    }

    /// Iterates over the mapped column names in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(FieldDescriptor::column)
    }

    /// Returns the number of mapped fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if no fields are mapped.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Populates `dest` from the named columns of `row`.
    ///
    /// Fields whose column is absent from the row are left untouched.
    pub fn apply(&self, row: &RawRow, dest: &mut T) -> Result<()> {
        for field in &self.fields {
            if let Some(value) = row.get(&field.column) {
                (field.setter)(dest, value).map_err(|source| D1Error::Conversion {
                    column: field.column.clone(),
                    source,
                })?;
            }
        }
        Ok(())
    }
}

/// Builder returned by [`RecordDescriptor::builder`].
pub struct RecordDescriptorBuilder<T> {
    fields: Vec<FieldDescriptor<T>>,
}

impl<T> RecordDescriptorBuilder<T> {
    /// Maps `column` to a field setter.
    pub fn field(mut self, column: impl Into<String>, setter: Setter<T>) -> Self {
        self.fields.push(FieldDescriptor {
            column: column.into(),
            setter,
        });
        self
    }

    pub fn build(self) -> RecordDescriptor<T> {
        RecordDescriptor {
            fields: self.fields,
        }
    }
}

/// A destination type that named scans can populate.
///
/// Usually implemented with [`record!`](crate::record); a manual impl must
/// return the same cached descriptor on every call.
pub trait Record: Default + Sized + 'static {
    fn descriptor() -> &'static RecordDescriptor<Self>;
}

/// Implements [`Record`] for a struct whose fields implement
/// [`ScanTarget`](crate::ScanTarget).
///
/// List the fields to map; append `=> "column"` to read a field from a
/// column other than its lower-cased name.
#[macro_export]
macro_rules! record {
    ($ty:ty { $($field:ident $(=> $column:literal)?),* $(,)? }) => {
        impl $crate::Record for $ty {
            fn descriptor() -> &'static $crate::RecordDescriptor<Self> {
                static DESCRIPTOR: ::std::sync::LazyLock<$crate::RecordDescriptor<$ty>> =
                    ::std::sync::LazyLock::new(|| {
                        $crate::RecordDescriptor::builder()
                            $(.field(
                                $crate::__record_column!($field $(, $column)?),
                                |record: &mut $ty, value: &$crate::WireValue| {
                                    $crate::ScanTarget::assign(&mut record.$field, value)
                                },
                            ))*
                            .build()
                    });
                &DESCRIPTOR
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __record_column {
    ($field:ident) => {
        stringify!($field).to_lowercase()
    };
    ($field:ident, $column:literal) => {
        ::std::string::String::from($column)
    };
}

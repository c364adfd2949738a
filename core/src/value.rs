//! Wire values and the type coercion table.
//!
//! Every cell arriving from the service is an untyped JSON value. Numbers are
//! floating point at the wire boundary, so integer destinations truncate
//! toward zero rather than round. Nested arrays and objects are passed
//! through verbatim and never interpreted.
//!
//! | destination      | null    | number            | string             | boolean     |
//! |------------------|---------|-------------------|--------------------|-------------|
//! | `String`         | `""`    | textual form      | passthrough        | `true`/`false` |
//! | integers         | `0`     | truncate to zero  | parse base-10      | error       |
//! | `f32`/`f64`      | `0.0`   | passthrough       | error              | error       |
//! | `bool`           | `false` | nonzero is `true` | error              | passthrough |
//! | [`WireValue`]    | null    | passthrough       | passthrough        | passthrough |
//! | `Option<T>`      | `None`  | `Some(T)`         | `Some(T)`          | `Some(T)`   |

use serde_json::{Number, Value};
use thiserror::Error;

/// An untyped value as decoded from the response envelope.
pub type WireValue = Value;

/// One row keyed by column name.
pub type RawRow = serde_json::Map<String, Value>;

/// A wire value could not be converted to the requested destination kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert {found} to {target}")]
pub struct CoerceError {
    /// Rust type name of the destination.
    pub target: &'static str,
    /// Description of the offending wire value.
    pub found: String,
}

impl CoerceError {
    pub(crate) fn new(target: &'static str, value: &WireValue) -> Self {
        Self {
            target,
            found: describe(value),
        }
    }
}

fn describe(value: &WireValue) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => format!("string {s:?}"),
        Value::Array(_) => "array".to_string(),
        Value::Object(_) => "object".to_string(),
    }
}

/// A destination that a single column value can be written into.
///
/// Implemented for the kinds listed in the module-level coercion table.
/// Positional scans take `&mut dyn ScanTarget`, and record descriptors call
/// [`assign`](Self::assign) on each mapped field.
pub trait ScanTarget {
    /// Coerces `value` and stores the result in `self`.
    fn assign(&mut self, value: &WireValue) -> Result<(), CoerceError>;
}

/// Renders a wire number the way it reads in SQL output: integral values
/// without a fractional part, everything else in shortest float form.
pub fn number_text(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        Some(f) => format!("{f}"),
        None => n.to_string(),
    }
}

impl ScanTarget for String {
    fn assign(&mut self, value: &WireValue) -> Result<(), CoerceError> {
        *self = match value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            Value::Number(n) => number_text(n),
            Value::Bool(b) => b.to_string(),
            nested => nested.to_string(),
        };
        Ok(())
    }
}

fn integer_from_number(n: &Number) -> Option<i128> {
    if let Some(i) = n.as_i64() {
        return Some(i.into());
    }
    if let Some(u) = n.as_u64() {
        return Some(u.into());
    }
    let f = n.as_f64()?;
    f.is_finite().then(|| f.trunc() as i128)
}

macro_rules! impl_integer_target {
    ($($t:ty),* $(,)?) => {$(
        impl ScanTarget for $t {
            fn assign(&mut self, value: &WireValue) -> Result<(), CoerceError> {
                *self = match value {
                    Value::Null => 0,
                    Value::Number(n) => integer_from_number(n)
                        .and_then(|i| <$t>::try_from(i).ok())
                        .ok_or_else(|| CoerceError::new(stringify!($t), value))?,
                    Value::String(s) => s
                        .trim()
                        .parse::<$t>()
                        .map_err(|_| CoerceError::new(stringify!($t), value))?,
                    _ => return Err(CoerceError::new(stringify!($t), value)),
                };
                Ok(())
            }
        }
    )*};
}

impl_integer_target!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl ScanTarget for f64 {
    fn assign(&mut self, value: &WireValue) -> Result<(), CoerceError> {
        *self = match value {
            Value::Null => 0.0,
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| CoerceError::new("f64", value))?,
            _ => return Err(CoerceError::new("f64", value)),
        };
        Ok(())
    }
}

impl ScanTarget for f32 {
    fn assign(&mut self, value: &WireValue) -> Result<(), CoerceError> {
        let mut wide = 0.0f64;
        wide.assign(value)
            .map_err(|_| CoerceError::new("f32", value))?;
        *self = wide as f32;
        Ok(())
    }
}

impl ScanTarget for bool {
    fn assign(&mut self, value: &WireValue) -> Result<(), CoerceError> {
        *self = match value {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            _ => return Err(CoerceError::new("bool", value)),
        };
        Ok(())
    }
}

impl ScanTarget for WireValue {
    fn assign(&mut self, value: &WireValue) -> Result<(), CoerceError> {
        *self = value.clone();
        Ok(())
    }
}

impl<T: ScanTarget + Default> ScanTarget for Option<T> {
    fn assign(&mut self, value: &WireValue) -> Result<(), CoerceError> {
        if value.is_null() {
            *self = None;
            return Ok(());
        }
        let mut inner = T::default();
        inner.assign(value)?;
        *self = Some(inner);
        Ok(())
    }
}

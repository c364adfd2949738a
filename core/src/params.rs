//! Encoding of query arguments as the string parameters the API accepts.
//!
//! The HTTP API binds every `?` placeholder from a JSON array of strings, so
//! each argument is rendered to text before the request is built:
//!
//! - strings pass through unchanged
//! - integers and floats use their shortest decimal form
//! - booleans become `1` or `0`
//! - `None` becomes the empty string
//! - date-times use `YYYY-MM-DD HH:MM:SS`
//! - anything else can be wrapped in [`Json`] and sent as JSON text

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use serde::Serialize;

use crate::error::{D1Error, Result};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A value that can be sent as a query parameter.
pub trait ToParam {
    /// Renders the value as parameter text.
    fn to_param(&self) -> std::result::Result<String, String>;
}

/// Renders every argument, reporting the index of the first failure.
///
/// # Examples
///
/// ```
/// use d1_core::convert_params;
///
/// let params = convert_params(&[&"ada", &36, &true, &None::<i64>]).unwrap();
/// assert_eq!(params, ["ada", "36", "1", ""]);
/// ```
pub fn convert_params(args: &[&dyn ToParam]) -> Result<Vec<String>> {
    args.iter()
        .enumerate()
        .map(|(index, arg)| {
            arg.to_param()
                .map_err(|message| D1Error::Param { index, message })
        })
        .collect()
}

impl ToParam for str {
    fn to_param(&self) -> std::result::Result<String, String> {
        Ok(self.to_string())
    }
}

impl ToParam for String {
    fn to_param(&self) -> std::result::Result<String, String> {
        Ok(self.clone())
    }
}

impl<T: ToParam + ?Sized> ToParam for &T {
    fn to_param(&self) -> std::result::Result<String, String> {
        (**self).to_param()
    }
}

macro_rules! impl_display_param {
    ($($t:ty),* $(,)?) => {$(
        impl ToParam for $t {
            fn to_param(&self) -> std::result::Result<String, String> {
                Ok(self.to_string())
            }
        }
    )*};
}

impl_display_param!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64
);

impl ToParam for bool {
    fn to_param(&self) -> std::result::Result<String, String> {
        Ok(if *self { "1" } else { "0" }.to_string())
    }
}

impl<T: ToParam> ToParam for Option<T> {
    fn to_param(&self) -> std::result::Result<String, String> {
        match self {
            Some(value) => value.to_param(),
            None => Ok(String::new()),
        }
    }
}

impl ToParam for [u8] {
    fn to_param(&self) -> std::result::Result<String, String> {
        Ok(String::from_utf8_lossy(self).into_owned())
    }
}

impl ToParam for Vec<u8> {
    fn to_param(&self) -> std::result::Result<String, String> {
        self.as_slice().to_param()
    }
}

impl ToParam for NaiveDateTime {
    fn to_param(&self) -> std::result::Result<String, String> {
        Ok(self.format(DATETIME_FORMAT).to_string())
    }
}

impl ToParam for NaiveDate {
    fn to_param(&self) -> std::result::Result<String, String> {
        Ok(self.format("%Y-%m-%d").to_string())
    }
}

impl<Tz: TimeZone> ToParam for DateTime<Tz>
where
    Tz::Offset: std::fmt::Display,
{
    fn to_param(&self) -> std::result::Result<String, String> {
        Ok(self.format(DATETIME_FORMAT).to_string())
    }
}

/// Sends the wrapped value as JSON text.
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

impl<T: Serialize> ToParam for Json<T> {
    fn to_param(&self) -> std::result::Result<String, String> {
        serde_json::to_string(&self.0).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use std::collections::HashMap;

    #[test]
    fn test_scalars() {
        assert_eq!("x".to_param().unwrap(), "x");
        assert_eq!(String::from("y").to_param().unwrap(), "y");
        assert_eq!((-12i32).to_param().unwrap(), "-12");
        assert_eq!(u64::MAX.to_param().unwrap(), "18446744073709551615");
        assert_eq!(2.5f64.to_param().unwrap(), "2.5");
        assert_eq!(25.0f64.to_param().unwrap(), "25");
        assert_eq!(true.to_param().unwrap(), "1");
        assert_eq!(false.to_param().unwrap(), "0");
    }

    #[test]
    fn test_none_is_empty() {
        assert_eq!(None::<String>.to_param().unwrap(), "");
        assert_eq!(Some(4u8).to_param().unwrap(), "4");
    }

    #[test]
    fn test_datetimes() {
        let naive = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(7, 5, 1)
            .unwrap();
        assert_eq!(naive.to_param().unwrap(), "2024-03-09 07:05:01");
        assert_eq!(
            Utc.from_utc_datetime(&naive).to_param().unwrap(),
            "2024-03-09 07:05:01"
        );
        assert_eq!(naive.date().to_param().unwrap(), "2024-03-09");
    }

    #[test]
    fn test_bytes_and_json() {
        assert_eq!(b"raw".to_vec().to_param().unwrap(), "raw");
        let mut tags = HashMap::new();
        tags.insert("k", vec![1, 2]);
        assert_eq!(Json(&tags).to_param().unwrap(), r#"{"k":[1,2]}"#);
    }

    #[test]
    fn test_convert_params() {
        let name = String::from("ada");
        let params = convert_params(&[&name, &7i64, &Json(vec!["a"])]).unwrap();
        assert_eq!(params, ["ada", "7", r#"["a"]"#]);
        assert!(convert_params(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_convert_params_reports_index() {
        struct Broken;
        impl ToParam for Broken {
            fn to_param(&self) -> std::result::Result<String, String> {
                Err("unsupported".into())
            }
        }
        match convert_params(&[&1, &Broken]).unwrap_err() {
            D1Error::Param { index, message } => {
                assert_eq!(index, 1);
                assert_eq!(message, "unsupported");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

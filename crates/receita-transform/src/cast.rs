//! Field parsing for registry columns
//!
//! Empty columns are absent values, never errors. Anything else that fails to
//! parse is a structural error naming the field.

use crate::error::{Result, TransformError};
use chrono::NaiveDate;

pub fn to_int(value: &str, field: &str) -> Result<Option<i64>> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|e| TransformError::structural(field, format!("invalid integer {value:?}: {e}")))
}

/// Like [`to_int`] but an empty column is an error too
pub fn required_int(value: &str, field: &str) -> Result<i64> {
    to_int(value, field)?.ok_or_else(|| TransformError::structural(field, "missing required integer"))
}

/// Decimal numbers use a comma as separator (`1061004829,23`)
pub fn to_float(value: &str, field: &str) -> Result<Option<f64>> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .replace(',', ".")
        .parse()
        .map(Some)
        .map_err(|e| TransformError::structural(field, format!("invalid number {value:?}: {e}")))
}

/// `S` and `N` flags; anything else is unknown
pub fn to_bool(value: &str) -> Option<bool> {
    match value.to_uppercase().as_str() {
        "S" => Some(true),
        "N" => Some(false),
        _ => None,
    }
}

/// `YYYYMMDD` dates; empty or all-zero columns mean no date
pub fn to_date(value: &str, field: &str) -> Result<Option<NaiveDate>> {
    if value.is_empty() || value.bytes().all(|b| b == b'0') {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, "%Y%m%d")
        .map(Some)
        .map_err(|e| TransformError::structural(field, format!("invalid date {value:?}: {e}")))
}

/// Empty string as `None`
pub fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_to_int() {
        assert_eq!(to_int("02", "f").unwrap(), Some(2));
        assert_eq!(to_int("", "f").unwrap(), None);
        assert!(to_int("2a", "situacao").unwrap_err().to_string().contains("situacao"));
    }

    #[test]
    fn test_required_int() {
        assert_eq!(required_int("2018", "ano").unwrap(), 2018);
        assert!(required_int("", "ano").is_err());
    }

    #[test]
    fn test_to_float_with_comma() {
        assert_eq!(to_float("1061004829,23", "capital").unwrap(), Some(1061004829.23));
        assert_eq!(to_float("10.5", "capital").unwrap(), Some(10.5));
        assert_eq!(to_float("", "capital").unwrap(), None);
        assert!(to_float("dez", "capital").is_err());
    }

    #[test]
    fn test_to_bool() {
        assert_eq!(to_bool("S"), Some(true));
        assert_eq!(to_bool("n"), Some(false));
        assert_eq!(to_bool(""), None);
        assert_eq!(to_bool("X"), None);
    }

    #[test]
    fn test_to_date() {
        assert_eq!(to_date("20140101", "d").unwrap(), NaiveDate::from_ymd_opt(2014, 1, 1));
        assert_eq!(to_date("", "d").unwrap(), None);
        assert_eq!(to_date("00000000", "d").unwrap(), None);
        assert_eq!(to_date("0", "d").unwrap(), None);
        assert!(to_date("20141301", "d").is_err());
        assert!(to_date("2014-01-01", "d").is_err());
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(""), None);
        assert_eq!(non_empty("x"), Some("x".to_string()));
    }
}

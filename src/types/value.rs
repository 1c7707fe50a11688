//! JSON ↔ SQLite value conversions.
//!
//! Rows cross the API boundary as `serde_json` maps; bound parameters cross
//! the driver boundary as `rusqlite::types::Value`. Both directions live
//! here so the mapping rules are stated once.

use rusqlite::types::ValueRef;
use serde_json::Value;

use crate::types::{DatabaseError, Result};

/// The bindable SQLite value type, re-exported so callers can build
/// [`NamedParams`] without depending on the driver crate directly.
pub use rusqlite::types::Value as SqlValue;

/// A result row: column name → JSON value, in SELECT order.
pub type Row = serde_json::Map<String, Value>;

/// Ordered named parameters, e.g. `[("@whr1", 18), ("@whr2", "active")]`.
pub type NamedParams = Vec<(String, SqlValue)>;

/// Convert a JSON scalar into a bindable SQLite value.
///
/// Strict: arrays and objects are rejected. This is the conversion used in
/// predicate positions, where a compound value means the caller got the
/// filter shape wrong.
///
/// # Errors
///
/// Returns `DatabaseError::InvalidColumnValue` (with the serialized value)
/// for arrays, objects, and non-finite numbers.
pub fn scalar_value(value: &Value) -> Result<SqlValue> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(SqlValue::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(SqlValue::Real(f))
            } else {
                Err(DatabaseError::column_value(value))
            }
        }
        Value::String(s) => Ok(SqlValue::Text(s.clone())),
        Value::Array(_) | Value::Object(_) => Err(DatabaseError::column_value(value)),
    }
}

/// Convert a JSON value into a bindable SQLite value for an INSERT/UPDATE
/// assignment.
///
/// Lenient: compound values serialize to their JSON text, so document-style
/// columns round-trip through TEXT.
pub fn column_value(value: &Value) -> SqlValue {
    match value {
        Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
        _ => scalar_value(value).unwrap_or(SqlValue::Null),
    }
}

/// Convert a SQLite column value into JSON.
///
/// Blobs render as lossy UTF-8 strings; non-finite reals become `null`.
pub fn value_ref_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_conversions() {
        assert_eq!(scalar_value(&json!(null)).unwrap(), SqlValue::Null);
        assert_eq!(scalar_value(&json!(true)).unwrap(), SqlValue::Integer(1));
        assert_eq!(scalar_value(&json!(42)).unwrap(), SqlValue::Integer(42));
        assert_eq!(scalar_value(&json!(1.5)).unwrap(), SqlValue::Real(1.5));
        assert_eq!(
            scalar_value(&json!("hi")).unwrap(),
            SqlValue::Text("hi".to_string())
        );
    }

    #[test]
    fn test_scalar_rejects_compound() {
        assert!(scalar_value(&json!([1])).is_err());
        assert!(scalar_value(&json!({"a": 1})).is_err());
    }

    #[test]
    fn test_column_value_serializes_compound() {
        assert_eq!(
            column_value(&json!({"a": 1})),
            SqlValue::Text(r#"{"a":1}"#.to_string())
        );
        assert_eq!(column_value(&json!([1, 2])), SqlValue::Text("[1,2]".to_string()));
    }
}

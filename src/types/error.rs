//! Error types for the turnstile layer.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `From`
//! implementations for the underlying driver and serde errors.

use thiserror::Error;

/// Error type for all turnstile operations.
///
/// Shape errors (`InvalidShape`, `InvalidColumnValue`) are raised
/// synchronously while a statement is being built, before anything reaches a
/// scheduler queue; they indicate a malformed filter or row and should be
/// treated as programmer errors. Everything else surfaces on the future of
/// the specific operation that failed.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Filter tree is not a valid `Where` value
    #[error("invalid filter shape: {0}")]
    InvalidShape(String),

    /// A condition entry carries a value its operator cannot take
    #[error("invalid column value: {0}")]
    InvalidColumnValue(String),

    /// Operation submitted to a scheduler that has been closed
    #[error("scheduler is closed; operation was not accepted")]
    SchedulerClosed,

    /// Execution error from the embedded engine
    #[error("SQL error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (script file loading)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl DatabaseError {
    /// Shape error with the serialized offending value embedded.
    pub(crate) fn shape(value: &serde_json::Value) -> Self {
        Self::InvalidShape(value.to_string())
    }

    /// Column-value error with the serialized offending value embedded.
    pub(crate) fn column_value(value: &serde_json::Value) -> Self {
        Self::InvalidColumnValue(value.to_string())
    }
}

/// Convenience result type used throughout the crate.
pub type Result<T> = std::result::Result<T, DatabaseError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_column_value_error_carries_serialized_value() {
        let err = DatabaseError::column_value(&json!({"operator": "="}));
        assert!(err.to_string().contains(r#"{"operator":"="}"#));
    }

    #[test]
    fn test_shape_error_carries_serialized_value() {
        let err = DatabaseError::shape(&json!([1, 2]));
        assert!(err.to_string().contains("[1,2]"));
    }
}

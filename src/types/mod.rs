//! Core types shared across the crate.

pub mod error;
pub mod value;

pub use error::{DatabaseError, Result};
pub use value::{column_value, scalar_value, value_ref_to_json, NamedParams, Row, SqlValue};

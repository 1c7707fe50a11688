//! Statement assembly on top of the predicate compiler.
//!
//! These builders produce full SQL strings plus their named parameters;
//! execution happens elsewhere, behind a scheduler. Values are always
//! parameterized. Identifiers (table and column names, ORDER BY terms) are
//! caller-trusted input, matching the bare-identifier fragments the
//! predicate compiler emits.

use serde_json::Value;

use crate::query::compiler::{compile, ParamSet};
use crate::query::predicate::Connector;
use crate::types::{column_value, DatabaseError, NamedParams, Result};

/// Options for a SELECT statement.
#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    /// Columns to project; empty means `*`.
    pub columns: Vec<String>,
    /// Filter tree (wire format).
    pub filter: Option<Value>,
    /// Connector for a top-level condition's keys.
    pub connector: Connector,
    /// Raw ORDER BY term, e.g. `"age DESC"`.
    pub order_by: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl SelectOptions {
    pub fn filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn connector(mut self, connector: Connector) -> Self {
        self.connector = connector;
        self
    }

    pub fn order_by(mut self, term: impl Into<String>) -> Self {
        self.order_by = Some(term.into());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Build a SELECT statement.
pub fn select_sql(table: &str, opts: &SelectOptions) -> Result<(String, NamedParams)> {
    let predicate = compile(opts.filter.as_ref(), opts.connector)?;
    let projection = if opts.columns.is_empty() {
        "*".to_string()
    } else {
        opts.columns.join(", ")
    };
    let mut sql = format!("SELECT {projection} FROM {table}{}", predicate.where_clause());
    if let Some(order) = &opts.order_by {
        sql.push_str(&format!(" ORDER BY {order}"));
    }
    if let Some(limit) = opts.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    if let Some(offset) = opts.offset {
        sql.push_str(&format!(" OFFSET {offset}"));
    }
    Ok((sql, predicate.params))
}

/// Build an INSERT statement; values bind as `@ins{N}`.
///
/// An empty row compiles to `INSERT INTO t DEFAULT VALUES`.
///
/// # Errors
///
/// `InvalidShape` if `row` is not a JSON object.
pub fn insert_sql(table: &str, row: &Value) -> Result<(String, NamedParams)> {
    let map = match row {
        Value::Object(map) => map,
        other => return Err(DatabaseError::shape(other)),
    };
    if map.is_empty() {
        return Ok((format!("INSERT INTO {table} DEFAULT VALUES"), NamedParams::new()));
    }
    let mut params = ParamSet::new("ins");
    let mut columns = Vec::with_capacity(map.len());
    let mut names = Vec::with_capacity(map.len());
    for (column, value) in map {
        columns.push(column.as_str());
        names.push(params.bind(column_value(value)));
    }
    let sql = format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        columns.join(", "),
        names.join(", ")
    );
    Ok((sql, params.into_values()))
}

/// Build an UPDATE statement; assignments bind as `@update{N}`, the
/// predicate as `@whr{N}`.
///
/// # Errors
///
/// `InvalidShape` if `set` is not a non-empty JSON object, or if the filter
/// is malformed.
pub fn update_sql(
    table: &str,
    set: &Value,
    filter: Option<&Value>,
    connector: Connector,
) -> Result<(String, NamedParams)> {
    let map = match set {
        Value::Object(map) if !map.is_empty() => map,
        other => return Err(DatabaseError::shape(other)),
    };
    let mut assignments = ParamSet::new("update");
    let mut terms = Vec::with_capacity(map.len());
    for (column, value) in map {
        let name = assignments.bind(column_value(value));
        terms.push(format!("{column} = {name}"));
    }
    let predicate = compile(filter, connector)?;
    let sql = format!(
        "UPDATE {table} SET {}{}",
        terms.join(", "),
        predicate.where_clause()
    );
    let mut params = assignments.into_values();
    params.extend(predicate.params);
    Ok((sql, params))
}

/// Build a DELETE statement.
pub fn delete_sql(
    table: &str,
    filter: Option<&Value>,
    connector: Connector,
) -> Result<(String, NamedParams)> {
    let predicate = compile(filter, connector)?;
    Ok((
        format!("DELETE FROM {table}{}", predicate.where_clause()),
        predicate.params,
    ))
}

/// Build a `SELECT COUNT(*)` statement; the count column is aliased `n`.
pub fn count_sql(
    table: &str,
    filter: Option<&Value>,
    connector: Connector,
) -> Result<(String, NamedParams)> {
    let predicate = compile(filter, connector)?;
    Ok((
        format!("SELECT COUNT(*) AS n FROM {table}{}", predicate.where_clause()),
        predicate.params,
    ))
}

/// Build a `SELECT EXISTS(...)` statement; the flag column is aliased
/// `present`.
pub fn exists_sql(
    table: &str,
    filter: Option<&Value>,
    connector: Connector,
) -> Result<(String, NamedParams)> {
    let predicate = compile(filter, connector)?;
    Ok((
        format!(
            "SELECT EXISTS(SELECT 1 FROM {table}{}) AS present",
            predicate.where_clause()
        ),
        predicate.params,
    ))
}

//! Predicate compiler: filter tree → parameterized SQL fragment.
//!
//! Pure: no I/O, no shared state. The parameter counter lives in a
//! [`ParamSet`] threaded explicitly through the recursion, so one
//! compilation pass hands out globally unique, order-stable names
//! (`@whr1`, `@whr2`, ...) across the whole tree.

use serde_json::Value;

use crate::query::predicate::{parse_filter, Connector, FieldFilter, WhereNode};
use crate::types::{scalar_value, NamedParams, Result};

/// Compiler context: a name prefix, a monotonic counter, and the ordered
/// values bound so far.
///
/// Prefixes in use: `whr` (predicates), `update` (UPDATE assignments),
/// `ins` (INSERT values). Distinct prefixes keep the namespaces disjoint
/// when one statement combines sets.
#[derive(Debug)]
pub struct ParamSet {
    prefix: &'static str,
    next: u32,
    values: NamedParams,
}

impl ParamSet {
    pub fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            next: 1,
            values: NamedParams::new(),
        }
    }

    /// Bind a value, returning its fresh parameter name.
    pub fn bind(&mut self, value: rusqlite::types::Value) -> String {
        let name = format!("@{}{}", self.prefix, self.next);
        self.next += 1;
        self.values.push((name.clone(), value));
        name
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> NamedParams {
        self.values
    }
}

/// A compiled predicate: SQL fragment plus its bound parameters.
///
/// The fragment carries no `WHERE` keyword; callers prefix one only when the
/// fragment is non-empty, so "no filter" produces no WHERE clause at all.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPredicate {
    pub sql: String,
    pub params: NamedParams,
}

impl CompiledPredicate {
    fn empty() -> Self {
        Self {
            sql: String::new(),
            params: NamedParams::new(),
        }
    }

    /// ` WHERE <fragment>` when non-empty, `""` otherwise.
    pub fn where_clause(&self) -> String {
        if self.sql.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.sql)
        }
    }
}

/// Compile a wire filter into a parameterized predicate.
///
/// `None` and JSON `null` compile to the empty predicate (no WHERE clause),
/// as does an empty condition `{}`. An empty conditions list (`{"AND": []}`)
/// compiles to the literal fragment `()`.
///
/// `connector` joins the keys of a top-level condition; a conditions list
/// always joins (and passes down) its own connector.
///
/// # Errors
///
/// `InvalidShape` / `InvalidColumnValue` per [`parse_filter`]; nothing else.
pub fn compile(filter: Option<&Value>, connector: Connector) -> Result<CompiledPredicate> {
    let node = match filter {
        None | Some(Value::Null) => return Ok(CompiledPredicate::empty()),
        Some(value) => parse_filter(value)?,
    };
    let mut params = ParamSet::new("whr");
    let sql = compile_node(&node, connector, true, &mut params)?;
    Ok(CompiledPredicate {
        sql,
        params: params.into_values(),
    })
}

fn compile_node(
    node: &WhereNode,
    ambient: Connector,
    top_level: bool,
    params: &mut ParamSet,
) -> Result<String> {
    match node {
        WhereNode::Condition(entries) => {
            let mut parts = Vec::with_capacity(entries.len());
            for (column, filter) in entries {
                parts.push(compile_entry(column, filter, params)?);
            }
            Ok(parts.join(&format!(" {} ", ambient.keyword())))
        }
        WhereNode::Group {
            connector,
            children,
        } => {
            if children.is_empty() {
                return Ok("()".to_string());
            }
            let mut parts = Vec::with_capacity(children.len());
            for child in children {
                let fragment = compile_node(child, *connector, false, params)?;
                parts.push(if is_parenthesized(&fragment) {
                    fragment
                } else {
                    format!("({fragment})")
                });
            }
            let joined = parts.join(&format!(" {} ", connector.keyword()));
            Ok(if top_level {
                joined
            } else {
                format!("({joined})")
            })
        }
    }
}

fn compile_entry(column: &str, filter: &FieldFilter, params: &mut ParamSet) -> Result<String> {
    match filter {
        FieldFilter::Scalar(value) => {
            let name = params.bind(scalar_value(value)?);
            Ok(format!("{column} = {name}"))
        }
        FieldFilter::Compare { op, value } => {
            let name = params.bind(scalar_value(value)?);
            Ok(format!("{column} {} {name}", op.sql()))
        }
        FieldFilter::Set { op, values } => {
            let mut names = Vec::with_capacity(values.len());
            for value in values {
                names.push(params.bind(scalar_value(value)?));
            }
            Ok(format!("{column} {} ({})", op.sql(), names.join(", ")))
        }
    }
}

fn is_parenthesized(fragment: &str) -> bool {
    fragment.starts_with('(') && fragment.ends_with(')')
}

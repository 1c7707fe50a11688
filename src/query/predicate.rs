//! The declarative filter tree and its closed internal representation.
//!
//! The wire format is a JSON object, either a *condition* (column → scalar
//! or `{operator, value}` pair) or a *conditions list* (`{"AND": [...]}` /
//! `{"OR": [...]}`, recursively nestable). Parsing turns it into
//! [`WhereNode`], with operators resolved into the closed [`Operator`] enum
//! up front so compilation never dispatches on strings.

use serde_json::Value;

use crate::types::{DatabaseError, Result};

/// Logical connector joining sibling conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connector {
    #[default]
    And,
    Or,
}

impl Connector {
    /// SQL keyword for this connector.
    pub fn keyword(&self) -> &'static str {
        match self {
            Connector::And => "AND",
            Connector::Or => "OR",
        }
    }
}

/// Comparison operator in a condition entry.
///
/// Closed set: an unknown wire token is rejected at parse time, not at
/// fragment-generation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    Like,
    NotLike,
    In,
    NotIn,
    Is,
    IsNot,
}

impl Operator {
    /// Parse a wire token (case-insensitive) into an operator.
    pub fn parse(token: &str) -> Option<Operator> {
        match token.trim().to_uppercase().as_str() {
            "=" => Some(Operator::Eq),
            "!=" => Some(Operator::Ne),
            ">" => Some(Operator::Gt),
            "<" => Some(Operator::Lt),
            ">=" => Some(Operator::Gte),
            "<=" => Some(Operator::Lte),
            "LIKE" => Some(Operator::Like),
            "NOT LIKE" => Some(Operator::NotLike),
            "IN" => Some(Operator::In),
            "NOT IN" => Some(Operator::NotIn),
            "IS" => Some(Operator::Is),
            "IS NOT" => Some(Operator::IsNot),
            _ => None,
        }
    }

    /// SQL token for this operator.
    pub fn sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Gte => ">=",
            Operator::Lte => "<=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Is => "IS",
            Operator::IsNot => "IS NOT",
        }
    }

    /// Whether this operator takes a list value (`IN` / `NOT IN`).
    pub fn takes_list(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }
}

/// One column's filter inside a condition.
#[derive(Debug, Clone)]
pub(crate) enum FieldFilter {
    /// Bare scalar, implies `=`
    Scalar(Value),
    /// `{operator, value}` with a scalar operand
    Compare { op: Operator, value: Value },
    /// `IN` / `NOT IN` with an array operand
    Set { op: Operator, values: Vec<Value> },
}

/// Parsed filter tree.
#[derive(Debug, Clone)]
pub(crate) enum WhereNode {
    /// Column → filter entries, in wire order
    Condition(Vec<(String, FieldFilter)>),
    /// `AND` / `OR` grouping of nested nodes
    Group {
        connector: Connector,
        children: Vec<WhereNode>,
    },
}

/// Parse a wire filter value into a [`WhereNode`].
///
/// # Errors
///
/// `InvalidShape` for non-objects and malformed conditions lists;
/// `InvalidColumnValue` for condition entries whose value does not fit its
/// operator. Both messages embed the serialized offending value.
pub(crate) fn parse_filter(value: &Value) -> Result<WhereNode> {
    let map = match value {
        Value::Object(map) => map,
        other => return Err(DatabaseError::shape(other)),
    };

    let has_and = map.contains_key("AND");
    let has_or = map.contains_key("OR");
    if has_and || has_or {
        // A conditions list carries exactly one connector key and nothing else.
        if (has_and && has_or) || map.len() != 1 {
            return Err(DatabaseError::shape(value));
        }
        let connector = if has_and { Connector::And } else { Connector::Or };
        let children = match &map[connector.keyword()] {
            Value::Array(items) => items
                .iter()
                .map(parse_filter)
                .collect::<Result<Vec<_>>>()?,
            _ => return Err(DatabaseError::shape(value)),
        };
        return Ok(WhereNode::Group { connector, children });
    }

    let mut entries = Vec::with_capacity(map.len());
    for (column, entry) in map {
        entries.push((column.clone(), parse_entry(entry)?));
    }
    Ok(WhereNode::Condition(entries))
}

fn parse_entry(entry: &Value) -> Result<FieldFilter> {
    match entry {
        Value::Object(pair) => {
            let (op, operand) = match (pair.get("operator"), pair.get("value")) {
                (Some(Value::String(token)), Some(operand)) => {
                    match Operator::parse(token) {
                        Some(op) => (op, operand),
                        None => return Err(DatabaseError::column_value(entry)),
                    }
                }
                _ => return Err(DatabaseError::column_value(entry)),
            };
            if op.takes_list() {
                match operand {
                    Value::Array(items) => Ok(FieldFilter::Set {
                        op,
                        values: items.clone(),
                    }),
                    _ => Err(DatabaseError::column_value(entry)),
                }
            } else {
                match operand {
                    Value::Array(_) | Value::Object(_) => {
                        Err(DatabaseError::column_value(entry))
                    }
                    scalar => Ok(FieldFilter::Compare {
                        op,
                        value: scalar.clone(),
                    }),
                }
            }
        }
        // A bare array only makes sense under IN / NOT IN
        Value::Array(_) => Err(DatabaseError::column_value(entry)),
        scalar => Ok(FieldFilter::Scalar(scalar.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operator_parse_case_insensitive() {
        assert_eq!(Operator::parse("not like"), Some(Operator::NotLike));
        assert_eq!(Operator::parse("In"), Some(Operator::In));
        assert_eq!(Operator::parse("is not"), Some(Operator::IsNot));
        assert_eq!(Operator::parse("~="), None);
    }

    #[test]
    fn test_condition_preserves_key_order() {
        let node = parse_filter(&json!({"b": 1, "a": 2})).unwrap();
        match node {
            WhereNode::Condition(entries) => {
                let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
                assert_eq!(keys, vec!["b", "a"]);
            }
            _ => panic!("expected condition"),
        }
    }

    #[test]
    fn test_list_with_both_connectors_rejected() {
        let err = parse_filter(&json!({"AND": [], "OR": []})).unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidShape(_)));
    }

    #[test]
    fn test_list_with_extra_keys_rejected() {
        let err = parse_filter(&json!({"AND": [], "age": 3})).unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidShape(_)));
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(parse_filter(&json!("age > 3")).is_err());
        assert!(parse_filter(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_bare_array_value_rejected() {
        let err = parse_filter(&json!({"age": [18, 21]})).unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidColumnValue(_)));
        assert!(err.to_string().contains("[18,21]"));
    }

    #[test]
    fn test_in_requires_array() {
        let err =
            parse_filter(&json!({"age": {"operator": "IN", "value": 18}})).unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidColumnValue(_)));
    }

    #[test]
    fn test_operator_pair_requires_both_keys() {
        let err = parse_filter(&json!({"age": {"operator": ">"}})).unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidColumnValue(_)));
    }
}

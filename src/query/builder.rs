use serde_json::{json, Value};

use crate::error::{Error, Result};

/// Operator keys of the search filter language.
pub const OP_EQ: &str = "$EQ";
pub const OP_AND: &str = "$AND";

/// Fields the search filter can match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Iteration,
    WorkItemType,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Iteration => "iteration",
            Field::WorkItemType => "workitemtype",
        }
    }
}

/// A boolean filter expression for the work item search endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Eq { field: Field, value: String },
    And(Vec<Expression>),
}

impl Expression {
    pub fn eq(field: Field, value: impl Into<String>) -> Self {
        Expression::Eq {
            field,
            value: value.into(),
        }
    }

    /// Wire form, e.g. `{"iteration": {"$EQ": "<id>"}}`.
    pub fn to_value(&self) -> Value {
        match self {
            Expression::Eq { field, value } => json!({ field.as_str(): { OP_EQ: value } }),
            Expression::And(terms) => {
                let terms: Vec<Value> = terms.iter().map(Expression::to_value).collect();
                json!({ OP_AND: terms })
            }
        }
    }
}

/// Filter for the work items of one iteration.
///
/// Only a single work item type can be filtered on. With zero or several
/// types the filter matches the iteration alone and the types are ignored.
pub fn build_query(iteration_id: &str, item_types: &[String]) -> Expression {
    match item_types {
        [item_type] => Expression::And(vec![
            Expression::eq(Field::Iteration, iteration_id),
            Expression::eq(Field::WorkItemType, item_type.as_str()),
        ]),
        _ => Expression::eq(Field::Iteration, iteration_id),
    }
}

/// Parse a user supplied filter expression. It must be a JSON object.
pub fn parse_expression(input: &str) -> Result<Value> {
    let value: Value =
        serde_json::from_str(input).map_err(|e| Error::InvalidQuery(e.to_string()))?;
    match value {
        Value::Object(_) => Ok(value),
        other => Err(Error::InvalidQuery(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

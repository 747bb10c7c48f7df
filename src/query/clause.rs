//! Where clauses as accumulated by the builder

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::key::{KeyId, KeyLiteral};

/// Boolean connector placed before a clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connector {
    #[default]
    And,
    Or,
}

impl Connector {
    /// GQL keyword
    pub fn as_str(&self) -> &'static str {
        match self {
            Connector::And => "AND",
            Connector::Or => "OR",
        }
    }
}

/// Right-hand side of a filter
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Plain JSON value, rendered as a GQL literal
    Literal(Value),
    /// Point in time, rendered as `DATETIME('...')`
    Timestamp(DateTime<Utc>),
    /// Key literal produced by the identity rewrite
    Key(KeyLiteral),
}

impl FilterValue {
    /// Returns the JSON value if this is a plain literal
    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            FilterValue::Literal(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Value> for FilterValue {
    fn from(v: Value) -> Self {
        FilterValue::Literal(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::Literal(Value::String(v.to_string()))
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        FilterValue::Literal(Value::String(v))
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        FilterValue::Literal(Value::from(v))
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        FilterValue::Literal(Value::from(v))
    }
}

impl From<u64> for FilterValue {
    fn from(v: u64) -> Self {
        FilterValue::Literal(Value::from(v))
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        FilterValue::Literal(Value::from(v))
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        FilterValue::Literal(Value::Bool(v))
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(v: DateTime<Utc>) -> Self {
        FilterValue::Timestamp(v)
    }
}

impl From<KeyId> for FilterValue {
    fn from(id: KeyId) -> Self {
        FilterValue::Literal(id.to_value())
    }
}

impl From<&KeyId> for FilterValue {
    fn from(id: &KeyId) -> Self {
        FilterValue::Literal(id.to_value())
    }
}

/// A single filter clause.
///
/// The operator is stored as given; it is validated when the query is
/// compiled, not when the clause is added.
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    pub field: String,
    pub operator: String,
    pub value: FilterValue,
    pub connector: Connector,
}

impl WhereClause {
    pub fn new(
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<FilterValue>,
        connector: Connector,
    ) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
            connector,
        }
    }
}

//! JSON query requests
//!
//! ```json
//! {
//!   "kind": "Widget",
//!   "filters": [{"field": "price", "op": ">", "value": 10},
//!               {"field": "name", "op": "=", "value": "bolt", "connector": "or"}],
//!   "select": ["name"],
//!   "order": [{"field": "price", "direction": "desc"}],
//!   "limit": 5
//! }
//! ```

use serde::Deserialize;
use serde_json::Value;

use crate::query::{Connector, QueryBuilder, SortSpec};

/// One filter in a request
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FilterSpec {
    pub field: String,
    pub op: String,
    pub value: Value,
    #[serde(default)]
    pub connector: Connector,
}

/// A query as read from stdin
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryRequest {
    /// Target kind; required by every command except a bare render error
    #[serde(default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub filters: Vec<FilterSpec>,

    /// Projected fields, empty for all
    #[serde(default)]
    pub select: Vec<String>,

    #[serde(default)]
    pub order: Vec<SortSpec>,

    #[serde(default)]
    pub limit: Option<u64>,

    #[serde(default)]
    pub offset: Option<u64>,

    /// Look up a single entity by id instead of listing
    #[serde(default)]
    pub find: Option<Value>,

    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl QueryRequest {
    /// Applies the request to `builder`.
    ///
    /// A `find` id becomes an identity filter with a limit of one.
    pub fn apply(&self, builder: QueryBuilder) -> QueryBuilder {
        let mut builder = match &self.kind {
            Some(kind) => builder.from(kind.as_str()),
            None => builder,
        };

        for filter in &self.filters {
            builder = builder.where_clause(
                filter.field.as_str(),
                filter.op.as_str(),
                filter.value.clone(),
                filter.connector,
            );
        }

        builder = builder.project(self.select.iter().cloned());
        for spec in &self.order {
            builder = builder.order_by(spec.field.as_str(), spec.direction);
        }

        if let Some(limit) = self.limit {
            builder = builder.limit(limit);
        }
        if let Some(offset) = self.offset {
            builder = builder.offset(offset);
        }
        if let Some(secs) = self.timeout_secs {
            builder = builder.timeout(secs);
        }
        if let Some(id) = &self.find {
            builder = builder.filter_eq(crate::key::IDENTITY_FIELD, id.clone()).limit(1);
        }

        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SortDirection;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;

    fn parse(v: Value) -> QueryRequest {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_minimal_request() {
        let request = parse(json!({"kind": "Widget"}));
        assert_eq!(request.kind.as_deref(), Some("Widget"));
        assert!(request.filters.is_empty());
        assert!(request.find.is_none());
    }

    #[test]
    fn test_defaults_for_connector_and_direction() {
        let request = parse(json!({
            "kind": "Widget",
            "filters": [{"field": "n", "op": "=", "value": 1}],
            "order": [{"field": "n"}]
        }));
        assert_eq!(request.filters[0].connector, Connector::And);
        assert_eq!(request.order[0].direction, SortDirection::Asc);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result: Result<QueryRequest, _> =
            serde_json::from_value(json!({"kind": "Widget", "where": []}));
        assert!(result.is_err());
    }

    #[test]
    fn test_apply_renders_expected_gql() {
        let request = parse(json!({
            "kind": "Widget",
            "filters": [
                {"field": "price", "op": ">", "value": 10},
                {"field": "name", "op": "=", "value": "bolt", "connector": "or"}
            ],
            "select": ["name"],
            "order": [{"field": "price", "direction": "desc"}],
            "limit": 5,
            "offset": 2
        }));
        let builder = request.apply(QueryBuilder::new(Arc::new(MemoryStore::new())));

        assert_eq!(
            builder.to_gql().unwrap(),
            "SELECT name FROM Widget WHERE price > 10 OR name = 'bolt' \
             ORDER BY price DESC LIMIT 5 OFFSET 2"
        );
    }

    #[test]
    fn test_apply_find() {
        let request = parse(json!({"kind": "Widget", "find": 7}));
        let builder = request.apply(QueryBuilder::new(Arc::new(MemoryStore::new())));
        assert_eq!(
            builder.to_gql().unwrap(),
            "SELECT * FROM Widget WHERE __key__ = KEY(Widget, 7) LIMIT 1"
        );
    }
}

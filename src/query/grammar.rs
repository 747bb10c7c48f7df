//! GQL grammar
//!
//! Renders a compiled query into the store's textual query language:
//!
//! ```text
//! SELECT <f1>, <f2>, ... | *
//! FROM <kind>
//! [WHERE <field> <op> <value> (AND|OR) ...]
//! [ORDER BY <field> (ASC|DESC), ...]
//! [LIMIT <n>] [OFFSET <n>]
//! ```
//!
//! Output is a single line. Rendering never touches the store, and the same
//! compiled query always renders to the same string.

use chrono::SecondsFormat;
use serde_json::Value;

use super::clause::{FilterValue, WhereClause};
use super::compiler::CompiledQuery;

/// Renders compiled queries as GQL
pub struct Grammar;

impl Grammar {
    /// Renders a full SELECT statement
    pub fn compile_select(query: &CompiledQuery) -> String {
        let state = query.state();
        let mut parts: Vec<String> = Vec::with_capacity(6);

        parts.push(format!("SELECT {}", Self::compile_projection(&state.projections)));
        parts.push(format!("FROM {}", Self::quote_name(query.kind())));

        if !state.wheres.is_empty() {
            parts.push(format!("WHERE {}", Self::compile_wheres(&state.wheres)));
        }

        if !state.orders.is_empty() {
            let orders: Vec<String> = state
                .orders
                .iter()
                .map(|o| format!("{} {}", Self::quote_name(&o.field), o.direction.as_str()))
                .collect();
            parts.push(format!("ORDER BY {}", orders.join(", ")));
        }

        if let Some(limit) = state.limit {
            parts.push(format!("LIMIT {}", limit));
        }

        if let Some(offset) = state.offset {
            parts.push(format!("OFFSET {}", offset));
        }

        parts.join(" ")
    }

    /// Projection list, `*` when empty
    fn compile_projection(projections: &[String]) -> String {
        if projections.is_empty() {
            return "*".to_string();
        }
        projections
            .iter()
            .map(|p| Self::quote_name(p))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Clauses joined by their own connectors, in insertion order.
    /// The first clause's connector has nothing to join and is dropped.
    fn compile_wheres(wheres: &[WhereClause]) -> String {
        let mut out = String::new();
        for (i, clause) in wheres.iter().enumerate() {
            if i > 0 {
                out.push(' ');
                out.push_str(clause.connector.as_str());
                out.push(' ');
            }
            out.push_str(&Self::quote_name(&clause.field));
            out.push(' ');
            out.push_str(&clause.operator);
            out.push(' ');
            out.push_str(&Self::compile_value(&clause.value));
        }
        out
    }

    /// Renders a filter value as a GQL literal
    pub fn compile_value(value: &FilterValue) -> String {
        match value {
            FilterValue::Literal(v) => Self::compile_json(v),
            FilterValue::Timestamp(ts) => format!(
                "DATETIME({})",
                Self::quote_string(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            ),
            FilterValue::Key(lit) => format!("KEY({}, {})", Self::quote_name(&lit.kind), lit.id),
        }
    }

    fn compile_json(value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => Self::quote_string(s),
            Value::Array(items) => {
                let rendered: Vec<String> = items.iter().map(Self::compile_json).collect();
                format!("ARRAY({})", rendered.join(", "))
            }
            Value::Object(_) => Self::quote_string(&value.to_string()),
        }
    }

    /// Single-quotes a string. Backslashes are escaped, embedded quotes doubled.
    pub fn quote_string(s: &str) -> String {
        format!("'{}'", s.replace('\\', "\\\\").replace('\'', "''"))
    }

    /// Back-quotes a kind or field name unless it is a plain identifier
    pub fn quote_name(name: &str) -> String {
        if is_plain_identifier(name) {
            name.to_string()
        } else {
            format!("`{}`", name.replace('\\', "\\\\").replace('`', "``"))
        }
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`, not a reserved word
pub(crate) fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let head_ok = match chars.next() {
        Some(c) => c.is_ascii_alphabetic() || c == '_',
        None => false,
    };
    head_ok
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !is_reserved(name)
}

const RESERVED: &[&str] = &[
    "SELECT", "DISTINCT", "ON", "FROM", "WHERE", "AND", "OR", "NOT", "IN", "IS", "HAS",
    "ANCESTOR", "DESCENDANT", "CONTAINS", "ORDER", "BY", "ASC", "DESC", "LIMIT", "OFFSET",
    "FIRST", "LAST", "KEY", "PROJECT", "DATETIME", "ARRAY", "BLOB", "NULL", "TRUE", "FALSE",
];

fn is_reserved(name: &str) -> bool {
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Connector, QueryState, SortSpec, WhereClause, WhereCompiler};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn render(state: &QueryState) -> String {
        Grammar::compile_select(&WhereCompiler::compile(state).unwrap())
    }

    #[test]
    fn test_select_all() {
        assert_eq!(render(&QueryState::for_kind("Widget")), "SELECT * FROM Widget");
    }

    #[test]
    fn test_full_statement() {
        let mut state = QueryState::for_kind("Widget");
        state.add_projections(["name", "price"]);
        state.wheres.push(WhereClause::new("price", ">", 10, Connector::And));
        state.wheres.push(WhereClause::new("name", "=", "bolt", Connector::Or));
        state.orders.push(SortSpec::desc("price"));
        state.orders.push(SortSpec::asc("name"));
        state.limit = Some(5);
        state.offset = Some(10);

        assert_eq!(
            render(&state),
            "SELECT name, price FROM Widget WHERE price > 10 OR name = 'bolt' \
             ORDER BY price DESC, name ASC LIMIT 5 OFFSET 10"
        );
    }

    #[test]
    fn test_identity_filter() {
        let mut state = QueryState::for_kind("Widget");
        state.wheres.push(WhereClause::new("id", "=", 7, Connector::And));
        state.limit = Some(1);
        assert_eq!(
            render(&state),
            "SELECT * FROM Widget WHERE __key__ = KEY(Widget, 7) LIMIT 1"
        );
    }

    #[test]
    fn test_first_connector_ignored() {
        let mut state = QueryState::for_kind("Widget");
        state.wheres.push(WhereClause::new("a", "=", 1, Connector::Or));
        state.wheres.push(WhereClause::new("b", "=", 2, Connector::And));
        assert_eq!(render(&state), "SELECT * FROM Widget WHERE a = 1 AND b = 2");
    }

    #[test]
    fn test_literal_rendering() {
        assert_eq!(Grammar::compile_value(&json!(null).into()), "NULL");
        assert_eq!(Grammar::compile_value(&json!(true).into()), "true");
        assert_eq!(Grammar::compile_value(&json!(2.5).into()), "2.5");
        assert_eq!(Grammar::compile_value(&json!("it's").into()), "'it''s'");
        assert_eq!(Grammar::compile_value(&json!([1, "a"]).into()), "ARRAY(1, 'a')");

        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(
            Grammar::compile_value(&ts.into()),
            "DATETIME('2024-03-01T12:00:00Z')"
        );
    }

    #[test]
    fn test_quote_name() {
        assert_eq!(Grammar::quote_name("price"), "price");
        assert_eq!(Grammar::quote_name("__key__"), "__key__");
        assert_eq!(Grammar::quote_name("unit price"), "`unit price`");
        assert_eq!(Grammar::quote_name("order"), "`order`");
        assert_eq!(Grammar::quote_name("9lives"), "`9lives`");
        for keyword in [
            "in", "is", "has", "ancestor", "contains", "not", "distinct", "on", "first", "blob",
        ] {
            assert_eq!(Grammar::quote_name(keyword), format!("`{}`", keyword));
        }
        assert_eq!(Grammar::quote_name("a\\b"), "`a\\\\b`");
    }

    #[test]
    fn test_string_backslash_escaped() {
        assert_eq!(Grammar::quote_string("C:\\tmp\\"), "'C:\\\\tmp\\\\'");
        assert_eq!(Grammar::quote_string("o'\\"), "'o''\\\\'");

        let mut state = QueryState::for_kind("Widget");
        state.wheres.push(WhereClause::new("path", "=", "C:\\tmp\\", Connector::And));
        state.wheres.push(WhereClause::new("in", "=", 1, Connector::And));
        state.wheres.push(WhereClause::new("first", "=", 2, Connector::And));
        assert_eq!(
            render(&state),
            "SELECT * FROM Widget WHERE path = 'C:\\\\tmp\\\\' AND `in` = 1 AND `first` = 2"
        );
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let mut a = QueryState::for_kind("Widget");
        a.wheres.push(WhereClause::new("name", "=", "bolt", Connector::And));
        a.limit = Some(3);
        let b = a.clone();
        assert_eq!(render(&a), render(&b));
        assert_eq!(render(&a), render(&a));
    }
}

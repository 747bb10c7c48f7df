//! Where-clause compiler
//!
//! Turns the permissive state accumulated by the builder into a state the
//! grammar can render:
//!
//! 1. Every operator is normalized and checked against the allowed set
//! 2. Filters on the identity field become `__key__ = KEY(<kind>, <id>)`
//! 3. Everything else passes through untouched
//!
//! Compiling an already compiled state yields the same state.

use crate::key::{KeyId, KeyLiteral, IDENTITY_FIELD, KEY_FIELD};

use super::clause::{FilterValue, WhereClause};
use super::errors::{QueryError, QueryResult};
use super::operator::Operator;
use super::state::QueryState;

/// A query state whose clauses have been validated and rewritten.
///
/// Only [`WhereCompiler`] constructs this, so holding one proves the
/// operators are valid and the target kind is set.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    state: QueryState,
    kind: String,
}

impl CompiledQuery {
    /// Target kind
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The compiled state
    pub fn state(&self) -> &QueryState {
        &self.state
    }

    /// Consumes the compiled query, returning its state
    pub fn into_state(self) -> QueryState {
        self.state
    }
}

/// Compiles accumulated where clauses
pub struct WhereCompiler;

impl WhereCompiler {
    /// Compiles a query state.
    ///
    /// Fails with `MissingTargetKind` if no kind is set, or
    /// `UnsupportedOperator` on the first clause with a bad operator.
    pub fn compile(state: &QueryState) -> QueryResult<CompiledQuery> {
        let kind = state
            .kind
            .clone()
            .ok_or_else(QueryError::missing_target_kind)?;

        let wheres = state
            .wheres
            .iter()
            .map(|clause| Self::compile_clause(&kind, clause))
            .collect::<QueryResult<Vec<_>>>()?;

        let mut compiled = state.clone();
        compiled.wheres = wheres;

        Ok(CompiledQuery {
            state: compiled,
            kind,
        })
    }

    /// Compiles a single clause against the given target kind
    pub fn compile_clause(kind: &str, clause: &WhereClause) -> QueryResult<WhereClause> {
        let operator = Operator::parse(&clause.operator)?;

        let mut compiled = clause.clone();
        compiled.operator = operator.as_str().to_string();

        if clause.field == IDENTITY_FIELD {
            compiled.field = KEY_FIELD.to_string();
            compiled.value = match &clause.value {
                FilterValue::Key(lit) => FilterValue::Key(lit.clone()),
                FilterValue::Literal(v) => {
                    FilterValue::Key(KeyLiteral::new(kind, KeyId::from_value(v)))
                }
                FilterValue::Timestamp(ts) => {
                    FilterValue::Key(KeyLiteral::new(kind, KeyId::Name(ts.to_rfc3339())))
                }
            };
        }

        Ok(compiled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Connector, QueryErrorCode};
    use serde_json::json;

    fn state_with(clauses: Vec<WhereClause>) -> QueryState {
        let mut state = QueryState::for_kind("Widget");
        state.wheres = clauses;
        state
    }

    #[test]
    fn test_identity_rewrite() {
        let state = state_with(vec![WhereClause::new("id", "=", 7, Connector::And)]);
        let compiled = WhereCompiler::compile(&state).unwrap();

        let clause = &compiled.state().wheres[0];
        assert_eq!(clause.field, "__key__");
        assert_eq!(
            clause.value,
            FilterValue::Key(KeyLiteral::new("Widget", KeyId::Id(7)))
        );
    }

    #[test]
    fn test_compile_is_idempotent() {
        let state = state_with(vec![
            WhereClause::new("id", "$=", "bolt", Connector::And),
            WhereClause::new("price", "<>", 3, Connector::Or),
        ]);
        let once = WhereCompiler::compile(&state).unwrap();
        let twice = WhereCompiler::compile(once.state()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_other_clauses_pass_through() {
        let state = state_with(vec![WhereClause::new(
            "price",
            ">=",
            json!("10"),
            Connector::Or,
        )]);
        let compiled = WhereCompiler::compile(&state).unwrap();
        let clause = &compiled.state().wheres[0];
        assert_eq!(clause.field, "price");
        assert_eq!(clause.value, FilterValue::Literal(json!("10")));
        assert_eq!(clause.connector, Connector::Or);
    }

    #[test]
    fn test_unsupported_operator() {
        let state = state_with(vec![
            WhereClause::new("name", "=", "bolt", Connector::And),
            WhereClause::new("name", "LIKE", "b%", Connector::And),
        ]);
        let err = WhereCompiler::compile(&state).unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::UnsupportedOperator);
    }

    #[test]
    fn test_missing_kind() {
        let err = WhereCompiler::compile(&QueryState::default()).unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::MissingTargetKind);
    }

    #[test]
    fn test_operator_canonicalized() {
        let state = state_with(vec![WhereClause::new("n", " $<= ", 1, Connector::And)]);
        let compiled = WhereCompiler::compile(&state).unwrap();
        assert_eq!(compiled.state().wheres[0].operator, "<=");
    }
}

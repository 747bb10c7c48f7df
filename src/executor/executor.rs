//! Query executor
//!
//! Execution flow (strict order):
//! 1. Render the compiled query as GQL
//! 2. Wrap it for literal execution with the query's timeout and namespace
//! 3. Submit it to the store exactly once
//! 4. Hand back a lazy cursor that materializes entities into records
//!
//! Nothing is cached and nothing is retried.

use std::time::Duration;

use crate::observability::{log_event_with_fields, Event, ObservationScope};
use crate::query::{CompiledQuery, Grammar, QueryError, QueryResult};
use crate::store::{EntityStore, GqlQuery};

use super::materializer::{Record, RecordCursor};

/// Runs compiled queries against a store client
pub struct QueryExecutor<'a> {
    store: &'a dyn EntityStore,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(store: &'a dyn EntityStore) -> Self {
        Self { store }
    }

    /// Builds the store request for a compiled query without sending it
    pub fn prepare(query: &CompiledQuery) -> GqlQuery {
        let state = query.state();
        GqlQuery::new(Grammar::compile_select(query))
            .with_literals()
            .with_namespace(state.namespace.clone())
            .with_timeout(state.timeout.map(Duration::from_secs))
    }

    /// Submits the query and returns a cursor over its records
    pub fn execute(&self, query: &CompiledQuery) -> QueryResult<RecordCursor> {
        self.submit(query).map_err(|err| {
            log_event_with_fields(
                Event::QueryFailed,
                &[
                    ("code", err.code().code()),
                    ("kind", query.kind()),
                    ("reason", err.message()),
                ],
            );
            err
        })
    }

    /// Submits the query and drains the cursor.
    ///
    /// Failures are reported once, as the scope's `QUERY_ERROR`.
    pub fn execute_all(&self, query: &CompiledQuery) -> QueryResult<Vec<Record>> {
        let scope = ObservationScope::with_fields("QUERY", &[("kind", query.kind())]);

        let records = match self
            .submit(query)
            .and_then(|cursor| cursor.collect::<QueryResult<Vec<_>>>())
        {
            Ok(records) => records,
            Err(e) => {
                scope.fail(e.message());
                return Err(e);
            }
        };

        let count = records.len().to_string();
        scope.complete_with_fields(&[("records", count.as_str())]);
        Ok(records)
    }

    fn submit(&self, query: &CompiledQuery) -> QueryResult<RecordCursor> {
        let request = Self::prepare(query);
        log_event_with_fields(
            Event::QueryCompiled,
            &[("gql", request.query_string.as_str()), ("kind", query.kind())],
        );

        self.store
            .run_query(&request)
            .map(RecordCursor::new)
            .map_err(QueryError::store_query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::capture_events;
    use crate::query::{Connector, QueryErrorCode, QueryState, WhereClause, WhereCompiler};
    use crate::store::{MemoryStore, StoreError};

    fn compiled(state: QueryState) -> CompiledQuery {
        WhereCompiler::compile(&state).unwrap()
    }

    #[test]
    fn test_prepare_sets_literal_mode_and_timeout() {
        let mut state = QueryState::for_kind("Widget");
        state.timeout = Some(30);
        state.namespace = Some("tenant-a".into());
        let request = QueryExecutor::prepare(&compiled(state));

        assert_eq!(request.query_string, "SELECT * FROM Widget");
        assert!(request.allow_literals);
        assert_eq!(request.timeout, Some(Duration::from_secs(30)));
        assert_eq!(request.namespace.as_deref(), Some("tenant-a"));
    }

    #[test]
    fn test_one_round_trip_per_execution() {
        let store = MemoryStore::new();
        let executor = QueryExecutor::new(&store);
        let query = compiled(QueryState::for_kind("Widget"));

        executor.execute_all(&query).unwrap();
        executor.execute_all(&query).unwrap();
        assert_eq!(store.executed_queries().len(), 2);
    }

    #[test]
    fn test_store_failure_is_tagged() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let mut state = QueryState::for_kind("Widget");
        state.wheres.push(WhereClause::new("n", "=", 1, Connector::And));

        let err = QueryExecutor::new(&store)
            .execute_all(&compiled(state))
            .unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::StoreQuery);
        assert_eq!(err.store_error(), Some(&StoreError::Unavailable));
    }

    #[test]
    fn test_failure_logged_once() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let executor = QueryExecutor::new(&store);
        let query = compiled(QueryState::for_kind("Widget"));

        let events = capture_events(|| {
            executor.execute_all(&query).unwrap_err();
        });
        let errors: Vec<_> = events.iter().filter(|e| e["severity"] == "ERROR").collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0]["event"], "QUERY_ERROR");
        assert_eq!(errors[0]["kind"], "Widget");

        let events = capture_events(|| {
            assert!(executor.execute(&query).is_err());
        });
        let errors: Vec<_> = events.iter().filter(|e| e["severity"] == "ERROR").collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0]["event"], "QUERY_FAILED");
        assert_eq!(errors[0]["code"], "KINDQL_STORE_QUERY");
    }
}

//! Fluent query builder
//!
//! Mutators take the builder by value and hand it back, so calls chain.
//! They never fail: operators are checked when the query is compiled,
//! which happens at the start of every terminal operation and before any
//! store call.
//!
//! ```ignore
//! let records = connection
//!     .table("Widget")
//!     .filter("price", ">", 10)
//!     .or_filter("name", "=", "bolt")
//!     .project(["name"])
//!     .limit(5)
//!     .get(&[])?;
//! ```

use std::fmt;
use std::sync::Arc;

use crate::executor::{IdentityAllocator, QueryExecutor, Record, RecordCursor};
use crate::key::{KeyId, IDENTITY_FIELD};
use crate::store::{EntityStore, Properties};

use super::clause::{Connector, FilterValue, WhereClause};
use super::compiler::{CompiledQuery, WhereCompiler};
use super::errors::{QueryError, QueryResult};
use super::grammar::Grammar;
use super::state::{QueryState, SortDirection, SortSpec};

/// Builds and runs one query against a shared store client
#[derive(Clone)]
pub struct QueryBuilder {
    store: Arc<dyn EntityStore>,
    state: QueryState,
}

impl fmt::Debug for QueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl QueryBuilder {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self {
            store,
            state: QueryState::default(),
        }
    }

    /// Accumulated state
    pub fn state(&self) -> &QueryState {
        &self.state
    }

    /// Sets the target kind
    pub fn from(mut self, kind: impl Into<String>) -> Self {
        self.state.kind = Some(kind.into());
        self
    }

    /// Sets the namespace to query and insert into
    pub fn namespace(mut self, namespace: Option<String>) -> Self {
        self.state.namespace = namespace;
        self
    }

    /// Adds a filter clause with an explicit connector
    pub fn where_clause(
        mut self,
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<FilterValue>,
        connector: Connector,
    ) -> Self {
        self.state
            .wheres
            .push(WhereClause::new(field, operator, value, connector));
        self
    }

    /// Adds a filter joined with AND
    pub fn filter(
        self,
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<FilterValue>,
    ) -> Self {
        self.where_clause(field, operator, value, Connector::And)
    }

    /// Adds a filter joined with OR
    pub fn or_filter(
        self,
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<FilterValue>,
    ) -> Self {
        self.where_clause(field, operator, value, Connector::Or)
    }

    /// Adds an equality filter joined with AND
    pub fn filter_eq(self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.filter(field, "=", value)
    }

    /// Adds projected fields
    pub fn project<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.add_projections(fields);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.state.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.state.offset = Some(offset);
        self
    }

    /// Appends a sort specification
    pub fn order_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.state.orders.push(SortSpec {
            field: field.into(),
            direction,
        });
        self
    }

    /// Marks fields as not indexed on insert
    pub fn exclude_from_indexes<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.add_index_exclusions(fields);
        self
    }

    /// Sets the execution timeout passed to the store
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.state.timeout = Some(seconds);
        self
    }

    /// Validates and rewrites the accumulated clauses
    pub fn compile(&self) -> QueryResult<CompiledQuery> {
        WhereCompiler::compile(&self.state)
    }

    /// Renders the query as GQL without running it
    pub fn to_gql(&self) -> QueryResult<String> {
        Ok(Grammar::compile_select(&self.compile()?))
    }

    /// Runs the query, returning a lazy cursor.
    ///
    /// `columns` are projected only when no projection was set on the
    /// builder.
    pub fn cursor(&self, columns: &[&str]) -> QueryResult<RecordCursor> {
        let compiled = self.compile_with_columns(columns)?;
        QueryExecutor::new(self.store.as_ref()).execute(&compiled)
    }

    /// Runs the query and collects every record
    pub fn get(&self, columns: &[&str]) -> QueryResult<Vec<Record>> {
        let compiled = self.compile_with_columns(columns)?;
        QueryExecutor::new(self.store.as_ref()).execute_all(&compiled)
    }

    /// Runs the query with a limit of one
    pub fn first(&self, columns: &[&str]) -> QueryResult<Option<Record>> {
        Ok(self.clone().limit(1).get(columns)?.into_iter().next())
    }

    /// Looks up one entity by id
    pub fn find(&self, id: impl Into<FilterValue>, columns: &[&str]) -> QueryResult<Option<Record>> {
        self.clone()
            .filter(IDENTITY_FIELD, "=", id)
            .first(columns)
    }

    /// Inserts a new entity and returns its store-allocated id
    pub fn insert_get_id(&self, values: Properties) -> QueryResult<KeyId> {
        let kind = self
            .state
            .kind
            .as_deref()
            .ok_or_else(QueryError::missing_target_kind)?;

        IdentityAllocator::new(self.store.as_ref())
            .with_namespace(self.state.namespace.clone())
            .insert_get_id(kind, values, &self.state.exclude_from_indexes)
    }

    /// Inserts several entities, returning their ids in order.
    ///
    /// Stops at the first failure; earlier rows stay inserted.
    pub fn insert<I>(&self, rows: I) -> QueryResult<Vec<KeyId>>
    where
        I: IntoIterator<Item = Properties>,
    {
        rows.into_iter().map(|row| self.insert_get_id(row)).collect()
    }

    fn compile_with_columns(&self, columns: &[&str]) -> QueryResult<CompiledQuery> {
        if self.state.projections.is_empty() && !columns.is_empty() {
            WhereCompiler::compile(&{
                let mut state = self.state.clone();
                state.add_projections(columns.iter().copied());
                state
            })
        } else {
            self.compile()
        }
    }
}

//! Query builder and where-clause compiler
//!
//! A [`QueryBuilder`] accumulates a [`QueryState`]. Terminal operations run
//! it through [`WhereCompiler`], which validates operators and rewrites
//! identity filters into key filters, then [`Grammar`] renders the result
//! as GQL for the executor.
//!
//! # Invariants
//!
//! - Compilation never touches the store
//! - Filters on `id` always become `__key__ = KEY(kind, id)`
//! - Unsupported operators are rejected before any store call

mod builder;
mod clause;
mod compiler;
mod errors;
mod grammar;
mod operator;
mod state;

pub use builder::QueryBuilder;
pub use clause::{Connector, FilterValue, WhereClause};
pub use compiler::{CompiledQuery, WhereCompiler};
pub use errors::{QueryError, QueryErrorCode, QueryResult, Severity as ErrorSeverity};
pub use grammar::Grammar;
pub use operator::Operator;
pub use state::{QueryState, SortDirection, SortSpec};

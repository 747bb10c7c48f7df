//! kindql - fluent queries over a schema-less key/kind entity store
//!
//! Builds filtered, projected, ordered queries, rewrites identity filters
//! into key filters, renders them as GQL and runs them through an
//! [`EntityStore`](store::EntityStore) client. Inserts go through the
//! store's id allocator so the new id comes back immediately.

pub mod cli;
pub mod connection;
pub mod executor;
pub mod key;
pub mod observability;
pub mod query;
pub mod store;

pub use connection::{Connection, ConnectionConfig};
pub use executor::{Record, RecordCursor};
pub use key::{Key, KeyId};
pub use query::{QueryBuilder, QueryError, QueryErrorCode, QueryResult};
pub use store::{EntityStore, MemoryStore};

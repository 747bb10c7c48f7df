//! Entity store client seam
//!
//! The query layer talks to the store only through [`EntityStore`]. The
//! store owns persistence, id allocation and query execution; this crate
//! owns translation.
//!
//! [`MemoryStore`] is a complete in-process implementation that interprets
//! the GQL subset the grammar emits.

mod errors;
pub mod gql;
mod memory;

pub use errors::{StoreError, StoreResult};
pub use memory::{MemoryStore, DEFAULT_PAGE_SIZE};

use std::collections::BTreeSet;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::key::Key;

/// Property map of an entity
pub type Properties = Map<String, Value>;

/// Lazy stream of entities returned by a query
pub type EntityIterator = Box<dyn Iterator<Item = StoreResult<Entity>>>;

/// Options applied when constructing an entity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityOptions {
    /// Properties the store must not index
    pub exclude_from_indexes: BTreeSet<String>,
}

impl EntityOptions {
    pub fn excluding<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exclude_from_indexes: fields.into_iter().map(Into::into).collect(),
        }
    }
}

/// One schema-less record addressed by a key
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    key: Key,
    properties: Properties,
    exclude_from_indexes: BTreeSet<String>,
}

impl Entity {
    pub fn new(key: Key, properties: Properties, options: EntityOptions) -> Self {
        Self {
            key,
            properties,
            exclude_from_indexes: options.exclude_from_indexes,
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Declared properties
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn into_properties(self) -> Properties {
        self.properties
    }

    /// Properties excluded from indexing
    pub fn exclude_from_indexes(&self) -> &BTreeSet<String> {
        &self.exclude_from_indexes
    }

    /// Returns a copy with only the named properties
    pub fn project(&self, fields: &[String]) -> Self {
        let properties = self
            .properties
            .iter()
            .filter(|(k, _)| fields.contains(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self {
            key: self.key.clone(),
            properties,
            exclude_from_indexes: self.exclude_from_indexes.clone(),
        }
    }
}

/// A rendered GQL query plus execution options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GqlQuery {
    pub query_string: String,
    /// Values are embedded in the text rather than bound
    pub allow_literals: bool,
    pub namespace: Option<String>,
    /// Passed to the store; not enforced locally
    pub timeout: Option<Duration>,
}

impl GqlQuery {
    pub fn new(query_string: impl Into<String>) -> Self {
        Self {
            query_string: query_string.into(),
            allow_literals: false,
            namespace: None,
            timeout: None,
        }
    }

    pub fn with_literals(mut self) -> Self {
        self.allow_literals = true;
        self
    }

    pub fn with_namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Remote entity store client
///
/// Implementations are shared between builders and must be usable through
/// a shared reference.
pub trait EntityStore: Send + Sync {
    /// Allocates an id for an incomplete key, returning the completed key.
    /// The entity is not created.
    fn allocate_id(&self, key: &Key) -> StoreResult<Key>;

    /// Persists a new entity with a complete key
    fn insert(&self, entity: Entity) -> StoreResult<Key>;

    /// Runs a GQL query
    fn run_query(&self, query: &GqlQuery) -> StoreResult<EntityIterator>;
}

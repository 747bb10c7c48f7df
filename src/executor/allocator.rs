//! Identity allocation for inserts
//!
//! 1. Build an incomplete key for the kind
//! 2. Ask the store to allocate an id for it
//! 3. Read the id from the allocated key's terminal path element
//! 4. Build the entity on the allocated key with the index-exclusion set
//! 5. Insert it and return the id
//!
//! The entity is always stored under the allocated key, so the returned id
//! addresses it immediately.

use crate::key::{Key, KeyId};
use crate::observability::{log_event_with_fields, Event};
use crate::query::{QueryError, QueryResult};
use crate::store::{Entity, EntityOptions, EntityStore, Properties, StoreError};

/// Allocates keys and inserts new entities
pub struct IdentityAllocator<'a> {
    store: &'a dyn EntityStore,
    namespace: Option<String>,
}

impl<'a> IdentityAllocator<'a> {
    pub fn new(store: &'a dyn EntityStore) -> Self {
        Self {
            store,
            namespace: None,
        }
    }

    pub fn with_namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace;
        self
    }

    /// Inserts `values` as a new entity of `kind`, returning its allocated id
    pub fn insert_get_id(
        &self,
        kind: &str,
        values: Properties,
        exclude_from_indexes: &[String],
    ) -> QueryResult<KeyId> {
        let incomplete = Key::incomplete(kind).with_namespace(self.namespace.clone());

        let allocated = self
            .store
            .allocate_id(&incomplete)
            .map_err(|e| self.write_failed(kind, e))?;
        let id = allocated
            .path_end()
            .id
            .clone()
            .ok_or_else(|| {
                self.write_failed(kind, StoreError::IncompleteKey(allocated.to_string()))
            })?;
        let id_text = id.to_string();
        log_event_with_fields(Event::KeyAllocated, &[("id", id_text.as_str()), ("kind", kind)]);

        let entity = Entity::new(
            allocated,
            values,
            EntityOptions::excluding(exclude_from_indexes.iter().cloned()),
        );
        self.store
            .insert(entity)
            .map_err(|e| self.write_failed(kind, e))?;
        log_event_with_fields(Event::EntityInserted, &[("id", id_text.as_str()), ("kind", kind)]);

        Ok(id)
    }

    fn write_failed(&self, kind: &str, source: StoreError) -> QueryError {
        let err = QueryError::store_write(source);
        log_event_with_fields(
            Event::WriteFailed,
            &[("kind", kind), ("reason", err.message())],
        );
        err
    }
}

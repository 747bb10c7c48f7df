//! Result materialization
//!
//! Flattens returned entities into plain records. Only the entity's
//! declared property map is read; nested values are kept as-is.

use std::ops::Index;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::query::{QueryError, QueryResult};
use crate::store::{Entity, EntityIterator};

/// A field-name-to-value mapping for one returned entity
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    /// Flattens an entity
    pub fn from_entity(entity: Entity) -> Self {
        Self {
            fields: entity.into_properties(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Field names in map order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }

    /// JSON object form
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

impl Index<&str> for Record {
    type Output = Value;

    /// Missing fields index to `Value::Null`, like `serde_json::Value`
    fn index(&self, field: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.fields.get(field).unwrap_or(&NULL)
    }
}

/// Lazy, single-pass stream of records from one query execution.
///
/// Not restartable: run the query again for a fresh stream.
pub struct RecordCursor {
    entities: EntityIterator,
    yielded: usize,
}

impl RecordCursor {
    pub(crate) fn new(entities: EntityIterator) -> Self {
        Self {
            entities,
            yielded: 0,
        }
    }

    /// Records produced so far
    pub fn yielded(&self) -> usize {
        self.yielded
    }
}

impl Iterator for RecordCursor {
    type Item = QueryResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.entities.next()?;
        Some(match next {
            Ok(entity) => {
                self.yielded += 1;
                Ok(Record::from_entity(entity))
            }
            Err(e) => Err(QueryError::store_query(e)),
        })
    }
}

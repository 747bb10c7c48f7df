//! In-memory entity store
//!
//! A complete [`EntityStore`] that keeps entities in process and executes
//! GQL by parsing it. Used by the CLI and the tests.
//!
//! Entities are partitioned by namespace, then kind, and kept in key order
//! (numeric ids before names), which is the natural order queries return
//! them in when no ORDER BY is given.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::key::{Key, KeyId, KEY_FIELD};
use crate::query::SortDirection;

use super::errors::{StoreError, StoreResult};
use super::gql::{self, Condition, Literal, ParsedQuery};
use super::{Entity, EntityIterator, EntityStore, GqlQuery};

/// Maximum entities returned by a query without a LIMIT
pub const DEFAULT_PAGE_SIZE: u64 = 1000;

type Partition = (Option<String>, String);

#[derive(Debug, Default)]
struct StoreData {
    /// (namespace, kind) -> key path -> entity
    entities: HashMap<Partition, BTreeMap<Vec<KeyId>, Entity>>,
    /// Last allocated numeric id per partition
    sequences: HashMap<Partition, i64>,
}

/// In-memory entity store
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<StoreData>,
    /// Every query received, in order
    executed: RwLock<Vec<GqlQuery>>,
    writes: AtomicUsize,
    allocations: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every operation fails with [`StoreError::Unavailable`]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, AtomicOrdering::SeqCst);
    }

    /// Queries received so far
    pub fn executed_queries(&self) -> Vec<GqlQuery> {
        self.executed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of successful inserts
    pub fn write_count(&self) -> usize {
        self.writes.load(AtomicOrdering::SeqCst)
    }

    /// Number of successful id allocations
    pub fn allocation_count(&self) -> usize {
        self.allocations.load(AtomicOrdering::SeqCst)
    }

    /// Looks up an entity directly by key
    pub fn get(&self, key: &Key) -> Option<Entity> {
        let path = key_path(key)?;
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        data.entities
            .get(&partition_of(key))
            .and_then(|kind| kind.get(&path))
            .cloned()
    }

    /// Number of entities of a kind in the default namespace
    pub fn count(&self, kind: &str) -> usize {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        data.entities
            .get(&(None, kind.to_string()))
            .map_or(0, BTreeMap::len)
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(AtomicOrdering::SeqCst) {
            Err(StoreError::Unavailable)
        } else {
            Ok(())
        }
    }

    fn execute(&self, parsed: &ParsedQuery, namespace: Option<String>) -> Vec<Entity> {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        let mut matched: Vec<Entity> = data
            .entities
            .get(&(namespace, parsed.kind.clone()))
            .map(|kind| {
                kind.values()
                    .filter(|e| matches_filter(e, &parsed.filter))
                    .filter(|e| has_projected(e, &parsed.projection))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        drop(data);

        if !parsed.orders.is_empty() {
            // stable sort keeps key order among ties
            matched.sort_by(|a, b| {
                for spec in &parsed.orders {
                    let ord = compare_for_sort(field_of(a, &spec.field), field_of(b, &spec.field));
                    let ord = match spec.direction {
                        SortDirection::Asc => ord,
                        SortDirection::Desc => ord.reverse(),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        let offset = parsed.offset.unwrap_or(0) as usize;
        let limit = parsed.limit.unwrap_or(DEFAULT_PAGE_SIZE) as usize;

        matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|e| {
                if parsed.projection.is_empty() {
                    e
                } else {
                    e.project(&parsed.projection)
                }
            })
            .collect()
    }
}

impl EntityStore for MemoryStore {
    fn allocate_id(&self, key: &Key) -> StoreResult<Key> {
        self.check_available()?;
        if !key.is_incomplete() {
            return Ok(key.clone());
        }

        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        let seq = data.sequences.entry(partition_of(key)).or_insert(0);
        *seq += 1;
        let allocated = key.with_id(KeyId::Id(*seq));
        self.allocations.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(allocated)
    }

    fn insert(&self, entity: Entity) -> StoreResult<Key> {
        self.check_available()?;
        let key = entity.key().clone();
        let path = key_path(&key).ok_or_else(|| StoreError::IncompleteKey(key.to_string()))?;

        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        let partition = partition_of(&key);

        // keep the sequence ahead of explicitly inserted numeric ids
        if let Some(KeyId::Id(id)) = key.id() {
            let seq = data.sequences.entry(partition.clone()).or_insert(0);
            *seq = (*seq).max(*id);
        }

        let kind = data.entities.entry(partition).or_default();
        if kind.contains_key(&path) {
            return Err(StoreError::AlreadyExists(key.to_string()));
        }
        kind.insert(path, entity);
        self.writes.fetch_add(1, AtomicOrdering::SeqCst);

        Ok(key)
    }

    fn run_query(&self, query: &GqlQuery) -> StoreResult<EntityIterator> {
        self.executed
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(query.clone());
        self.check_available()?;

        let parsed = gql::parse(&query.query_string)?;
        if parsed.has_literals() && !query.allow_literals {
            return Err(StoreError::LiteralsNotAllowed);
        }

        let results = self.execute(&parsed, query.namespace.clone());
        Ok(Box::new(results.into_iter().map(Ok)))
    }
}

fn partition_of(key: &Key) -> Partition {
    (key.namespace.clone(), key.kind().to_string())
}

/// Full id path of a complete key
fn key_path(key: &Key) -> Option<Vec<KeyId>> {
    key.path().iter().map(|e| e.id.clone()).collect()
}

fn field_of<'a>(entity: &'a Entity, field: &str) -> Option<&'a Value> {
    entity.properties().get(field)
}

/// Projection queries only return entities holding every projected field
fn has_projected(entity: &Entity, projection: &[String]) -> bool {
    projection
        .iter()
        .all(|f| entity.properties().contains_key(f))
}

fn matches_filter(entity: &Entity, filter: &[Vec<Condition>]) -> bool {
    filter.is_empty()
        || filter
            .iter()
            .any(|group| group.iter().all(|c| matches_condition(entity, c)))
}

fn matches_condition(entity: &Entity, condition: &Condition) -> bool {
    if condition.field == KEY_FIELD {
        return match &condition.value {
            Literal::Key(path) => {
                compare_key(entity.key(), path).is_some_and(|ord| condition.op.holds(ord))
            }
            _ => false,
        };
    }

    // Missing fields never match
    let actual = match field_of(entity, &condition.field) {
        Some(v) => v,
        None => return false,
    };

    let ordering = match &condition.value {
        Literal::Value(expected) => compare_values(actual, expected),
        Literal::Timestamp(expected) => actual
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|ts| ts.with_timezone(&Utc).cmp(expected)),
        Literal::Key(_) => None,
    };

    match ordering {
        Some(ord) => condition.op.holds(ord),
        // values of different types only differ
        None => condition.op.is_not_equal(),
    }
}

/// Compares an entity key against a literal path.
///
/// Ancestors must match exactly; only the terminal ids are ordered. None if
/// the paths address different kinds.
fn compare_key(key: &Key, literal: &[(String, KeyId)]) -> Option<Ordering> {
    let path = key.path();
    if path.len() != literal.len() {
        return None;
    }
    let ((kind, id), ancestors) = literal.split_last()?;
    for (element, (lit_kind, lit_id)) in path.iter().zip(ancestors) {
        if &element.kind != lit_kind || element.id.as_ref() != Some(lit_id) {
            return None;
        }
    }
    if key.kind() != kind {
        return None;
    }
    key.id().map(|actual| actual.cmp(id))
}

/// Orders two JSON values of the same type; None across types
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(ai), Some(bi)) = (a.as_i64(), b.as_i64()) {
                return Some(ai.cmp(&bi));
            }
            a.as_f64()?.partial_cmp(&b.as_f64()?)
        }
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            Some(if a == b {
                Ordering::Equal
            } else {
                a.to_string().cmp(&b.to_string())
            })
        }
        _ => None,
    }
}

/// Sort order across types: missing, null, bool, number, string, other
fn compare_for_sort(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None => 0,
            Some(Value::Null) => 1,
            Some(Value::Bool(_)) => 2,
            Some(Value::Number(_)) => 3,
            Some(Value::String(_)) => 4,
            Some(_) => 5,
        }
    }
    match (a, b) {
        (Some(x), Some(y)) => compare_values(x, y).unwrap_or_else(|| rank(a).cmp(&rank(b))),
        _ => rank(a).cmp(&rank(b)),
    }
}

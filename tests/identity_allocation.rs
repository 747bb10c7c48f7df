//! Identity Allocation and Materialization Tests
//!
//! Tests for inserts and reads through a connection:
//! - insert_get_id returns an id that find() resolves immediately
//! - Projection, limit and natural order shape the returned records
//! - Index exclusions and namespaces reach the store

use std::sync::Arc;

use kindql::connection::{Connection, ConnectionConfig};
use kindql::key::{Key, KeyId};
use kindql::query::SortDirection;
use kindql::store::{MemoryStore, Properties};
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn props(value: Value) -> Properties {
    value.as_object().cloned().unwrap()
}

fn connect(store: &Arc<MemoryStore>) -> Connection {
    Connection::new(ConnectionConfig::for_project("inventory"), store.clone()).unwrap()
}

fn seed_widgets(conn: &Connection, count: i64) -> Vec<KeyId> {
    (1..=count)
        .map(|n| {
            conn.table("Widget")
                .insert_get_id(props(json!({"name": format!("w{n}"), "price": n * 10})))
                .unwrap()
        })
        .collect()
}

// =============================================================================
// Insert / Find Tests
// =============================================================================

/// A fresh id addresses the inserted entity straight away.
#[test]
fn test_insert_then_find() {
    let store = Arc::new(MemoryStore::new());
    let conn = connect(&store);

    let id = conn
        .table("Widget")
        .insert_get_id(props(json!({"name": "bolt"})))
        .unwrap();

    let record = conn.table("Widget").find(&id, &[]).unwrap().unwrap();
    assert_eq!(record.to_value(), json!({"name": "bolt"}));
}

/// Ids are never reused within a kind.
#[test]
fn test_ids_unique() {
    let store = Arc::new(MemoryStore::new());
    let conn = connect(&store);
    let ids = seed_widgets(&conn, 5);

    let mut deduped = ids.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped.len(), 5);
    assert_eq!(store.allocation_count(), 5);
    assert_eq!(store.write_count(), 5);
}

/// Entities are stored under exactly the id that was returned.
#[test]
fn test_stored_under_returned_id() {
    let store = Arc::new(MemoryStore::new());
    let conn = connect(&store);
    let id = conn
        .table("Widget")
        .insert_get_id(props(json!({"name": "nut"})))
        .unwrap();

    let entity = store.get(&Key::new("Widget", id)).unwrap();
    assert_eq!(entity.properties()["name"], json!("nut"));
}

/// Bulk insert returns ids in row order.
#[test]
fn test_bulk_insert() {
    let store = Arc::new(MemoryStore::new());
    let conn = connect(&store);
    let ids = conn
        .table("Widget")
        .insert(vec![props(json!({"n": 1})), props(json!({"n": 2}))])
        .unwrap();

    assert_eq!(ids.len(), 2);
    let second = conn.table("Widget").find(&ids[1], &[]).unwrap().unwrap();
    assert_eq!(second["n"], json!(2));
}

/// Index exclusions are attached to the stored entity.
#[test]
fn test_exclude_from_indexes() {
    let store = Arc::new(MemoryStore::new());
    let conn = connect(&store);
    let id = conn
        .table("Widget")
        .exclude_from_indexes(["description"])
        .insert_get_id(props(json!({"name": "bolt", "description": "long text"})))
        .unwrap();

    let entity = store.get(&Key::new("Widget", id)).unwrap();
    assert!(entity.exclude_from_indexes().contains("description"));
    assert!(!entity.exclude_from_indexes().contains("name"));
}

/// Entities in another namespace are invisible.
#[test]
fn test_namespace_partitioning() {
    let store = Arc::new(MemoryStore::new());
    let mut config = ConnectionConfig::for_project("inventory");
    config.namespace = Some("tenant-a".into());
    let tenant = Connection::new(config, store.clone()).unwrap();
    let default = connect(&store);

    seed_widgets(&tenant, 3);
    assert_eq!(tenant.table("Widget").get(&[]).unwrap().len(), 3);
    assert!(default.table("Widget").get(&[]).unwrap().is_empty());
}

// =============================================================================
// Materialization Tests
// =============================================================================

/// Projection keeps only the requested fields.
#[test]
fn test_projection() {
    let store = Arc::new(MemoryStore::new());
    let conn = connect(&store);
    seed_widgets(&conn, 2);

    let records = conn.table("Widget").project(["name"]).get(&[]).unwrap();
    assert_eq!(records.len(), 2);
    for record in &records {
        assert_eq!(record.fields().collect::<Vec<_>>(), vec!["name"]);
        assert!(!record.contains("price"));
    }

    // columns passed at the terminal act the same
    let records = conn.table("Widget").get(&["price"]).unwrap();
    assert_eq!(records[0].to_value(), json!({"price": 10}));
}

/// An unfiltered limit returns the first entities in natural order.
#[test]
fn test_limit_natural_order() {
    let store = Arc::new(MemoryStore::new());
    let conn = connect(&store);
    seed_widgets(&conn, 5);

    let records = conn.table("Widget").limit(2).get(&[]).unwrap();
    let names: Vec<&Value> = records.iter().map(|r| &r["name"]).collect();
    assert_eq!(names, vec![&json!("w1"), &json!("w2")]);
}

/// Filters, ordering and offset combine.
#[test]
fn test_filter_order_offset() {
    let store = Arc::new(MemoryStore::new());
    let conn = connect(&store);
    seed_widgets(&conn, 5);

    let records = conn
        .table("Widget")
        .filter("price", ">", 10)
        .order_by("price", SortDirection::Desc)
        .offset(1)
        .get(&["name"])
        .unwrap();
    let names: Vec<Value> = records.iter().map(|r| r["name"].clone()).collect();
    assert_eq!(names, vec![json!("w4"), json!("w3"), json!("w2")]);
}

/// OR groups match either side.
#[test]
fn test_or_filter() {
    let store = Arc::new(MemoryStore::new());
    let conn = connect(&store);
    seed_widgets(&conn, 5);

    let records = conn
        .table("Widget")
        .filter_eq("name", "w1")
        .or_filter("price", ">=", 50)
        .get(&["name"])
        .unwrap();
    assert_eq!(
        records.iter().map(|r| r.to_value()).collect::<Vec<_>>(),
        vec![json!({"name": "w1"}), json!({"name": "w5"})]
    );
}

/// Backslashes, quotes and keyword field names survive rendering and parsing.
#[test]
fn test_escaped_values_round_trip() {
    let store = Arc::new(MemoryStore::new());
    let conn = connect(&store);
    conn.table("Widget")
        .insert(vec![
            props(json!({"path": "C:\\tmp\\", "in": 1, "note": "it's"})),
            props(json!({"path": "C:\\tmp", "in": 1, "note": "its"})),
        ])
        .unwrap();

    let records = conn
        .table("Widget")
        .filter_eq("path", "C:\\tmp\\")
        .filter_eq("in", 1)
        .get(&[])
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["note"], json!("it's"));

    let gql = store.executed_queries()[0].query_string.clone();
    assert_eq!(
        gql,
        "SELECT * FROM Widget WHERE path = 'C:\\\\tmp\\\\' AND `in` = 1"
    );
}

/// Key comparisons work with range operators too.
#[test]
fn test_key_range() {
    let store = Arc::new(MemoryStore::new());
    let conn = connect(&store);
    seed_widgets(&conn, 5);

    let records = conn.table("Widget").filter("id", ">", 3).get(&["name"]).unwrap();
    assert_eq!(records.len(), 2);
}

/// The cursor is lazy and single pass.
#[test]
fn test_cursor() {
    let store = Arc::new(MemoryStore::new());
    let conn = connect(&store);
    seed_widgets(&conn, 3);

    let mut cursor = conn.table("Widget").cursor(&[]).unwrap();
    assert!(cursor.next().unwrap().is_ok());
    assert_eq!(cursor.yielded(), 1);
    assert_eq!(cursor.count(), 2);
}

/// find and first return None when nothing matches.
#[test]
fn test_missing_entity() {
    let store = Arc::new(MemoryStore::new());
    let conn = connect(&store);

    assert!(conn.table("Widget").find(1, &[]).unwrap().is_none());
    assert!(conn.table("Widget").first(&[]).unwrap().is_none());
}

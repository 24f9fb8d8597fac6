use crate::common::{catalog, row, RecordingConnection};
use std::sync::Arc;
use vellum::prelude::*;
use vellum::Options;

fn cached_options() -> Options {
    Options {
        cache_db: true,
        ..Options::default()
    }
}

fn names(customers: &[Record]) -> Vec<&str> {
    customers.iter().filter_map(|c| c.get("name").and_then(Value::as_str)).collect()
}

#[test]
fn test_repeated_reads_hit_cache() {
    let map = catalog();
    let cache = Arc::new(MemoryCache::new());
    let conn = RecordingConnection::new(Dialect::SQLite);
    conn.respond(vec![row(&[("Customer_id", 1.into()), ("Customer_name", "Ann".into())])]);
    let session = Session::new(conn, &map, cached_options()).with_cache(cache.clone());

    let first = session.collection("Customer", None);
    let second = session.collection("Customer", None);
    assert_eq!(names(&first), ["Ann"]);
    assert_eq!(first, second);
    assert_eq!(session.connection().statements().len(), 1);
    assert_eq!(cache.len(), 1);

    // A different binding is a different statement.
    session.collection("Customer", Some(Criteria::from(2_i64)));
    assert_eq!(session.connection().statements().len(), 2);
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_update_invalidates_related_classes() {
    let map = catalog();
    let cache = Arc::new(MemoryCache::new());
    let conn = RecordingConnection::new(Dialect::SQLite);
    conn.respond(vec![row(&[("Customer_id", 1.into()), ("Customer_name", "Ann".into())])]);
    let session = Session::new(conn, &map, cached_options()).with_cache(cache.clone());

    session.collection("Customer", None);
    session
        .update_collection("Order", [("status", "paid")], Some(Criteria::from(10_i64)))
        .unwrap();
    assert!(cache.is_empty());

    session
        .connection()
        .respond(vec![row(&[("Customer_id", 1.into()), ("Customer_name", "Ann B".into())])]);
    assert_eq!(names(&session.collection("Customer", None)), ["Ann B"]);
    assert_eq!(session.connection().statements().len(), 3);
}

#[test]
fn test_remove_keeps_unrelated_entries() {
    let map = catalog();
    let cache = Arc::new(MemoryCache::new());
    let conn = RecordingConnection::new(Dialect::SQLite);
    conn.respond(vec![row(&[("Customer_id", 1.into()), ("Customer_name", "Ann".into())])]);
    let session = Session::new(conn, &map, cached_options()).with_cache(cache.clone());

    session.collection("Customer", None);
    session.remove_collection("Address", None).unwrap();
    assert_eq!(cache.len(), 1);
    assert_eq!(names(&session.collection("Customer", None)), ["Ann"]);
    assert_eq!(session.connection().statements().len(), 2);

    session.remove_collection("Customer", None).unwrap();
    assert!(cache.is_empty());
}

#[test]
fn test_collections_bypass_cache_when_disabled() {
    let map = catalog();
    let cache = Arc::new(MemoryCache::new());
    let options = Options {
        cache_db_collections: false,
        ..cached_options()
    };
    let session = Session::new(RecordingConnection::new(Dialect::SQLite), &map, options).with_cache(cache.clone());

    session.collection("Customer", None);
    session.collection("Customer", None);
    assert_eq!(session.connection().statements().len(), 2);
    assert!(cache.is_empty());
}

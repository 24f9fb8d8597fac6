use crate::common::catalog;
use std::sync::Arc;
use vellum::prelude::*;
use vellum::rusqlite::SqliteConnection;
use vellum::Options;

const SCHEMA: &str = r#"
CREATE TABLE customer (id INTEGER PRIMARY KEY, name TEXT, email VARCHAR(255), age INTEGER, address INTEGER);
CREATE TABLE orders (id INTEGER PRIMARY KEY, customer INTEGER, status TEXT, total REAL);
CREATE TABLE item ("order" INTEGER, line INTEGER, sku TEXT, qty INTEGER, PRIMARY KEY ("order", line));
CREATE TABLE address (id INTEGER PRIMARY KEY, city TEXT);

INSERT INTO address VALUES (1, 'Oslo');
INSERT INTO customer VALUES (1, 'Ann', 'ann@example.com', 34, 1);
INSERT INTO customer VALUES (2, 'Bo', NULL, 27, NULL);
INSERT INTO customer VALUES (3, 'Cy', 'cy@example.com', 51, 1);
INSERT INTO orders VALUES (10, 1, 'open', 12.5);
INSERT INTO orders VALUES (11, 1, 'vip', 99.0);
INSERT INTO orders VALUES (12, 3, 'void', 0.0);
INSERT INTO item VALUES (10, 1, 'A-1', 2);
INSERT INTO item VALUES (10, 2, 'B-7', 1);
INSERT INTO item VALUES (11, 1, 'A-1', 5);
"#;

fn connection() -> SqliteConnection {
    let conn = SqliteConnection::open_in_memory().unwrap();
    conn.execute_batch(SCHEMA).unwrap();
    conn
}

fn ids(records: &[Record]) -> Vec<i64> {
    let mut ids: Vec<i64> = records.iter().filter_map(|r| r.get("id").and_then(Value::as_i64)).collect();
    ids.sort_unstable();
    ids
}

#[test]
fn test_collection_graph_nests_relations() {
    let map = catalog();
    let session = Session::new(connection(), &map, Options::default());

    let graph: GraphSpec = r#"{"Orders": {"Items": {}}, "Address": {}}"#.parse().unwrap();
    let customers = session.collection_graph("Customer", graph, None);
    assert_eq!(ids(&customers), [1, 2, 3]);

    let ann = &customers[0];
    assert_eq!(ann.get("name"), Some(&Value::from("Ann")));
    assert_eq!(ann.one("Address").and_then(|a| a.get("city")), Some(&Value::from("Oslo")));
    assert_eq!(ids(ann.many("Orders")), [10, 11]);
    let first = ann.many("Orders").iter().find(|o| o.get("id") == Some(&Value::from(10))).unwrap();
    assert_eq!(first.many("Items").len(), 2);
    let second = ann.many("Orders").iter().find(|o| o.get("id") == Some(&Value::from(11))).unwrap();
    assert_eq!(second.many("Items").len(), 1);

    let bo = &customers[1];
    assert!(bo.many("Orders").is_empty());
    assert!(bo.one("Address").is_none());
}

#[test]
fn test_relation_criteria_filter_joined_rows() {
    let map = catalog();
    let session = Session::new(connection(), &map, Options::default());

    let ann = session
        .object_graph("Customer", GraphSpec::new().with("VipOrders", GraphSpec::new()), Some(Criteria::from(1_i64)))
        .unwrap();
    assert_eq!(ids(ann.many("VipOrders")), [11]);
}

#[test]
fn test_counts() {
    let map = catalog();
    let session = Session::new(connection(), &map, Options::default());

    assert_eq!(session.get_count("Customer", None), 3);
    assert_eq!(session.get_count("Customer", Some(Criteria::mapping().with("age:>=", 30))), 2);
    assert_eq!(session.get_count("Item", None), 3);
    assert_eq!(session.get_count("Item", Some(Criteria::mapping().with("sku", "A-1"))), 2);
}

#[test]
fn test_update_and_remove() {
    let map = catalog();
    let session = Session::new(connection(), &map, Options::default());

    let updated = session
        .update_collection("Order", [("status", "paid")], Some(Criteria::mapping().with("customer", 1)))
        .unwrap();
    assert_eq!(updated, 2);
    assert_eq!(session.get_count("Order", Some(Criteria::mapping().with("status", "paid"))), 2);

    let removed = session
        .remove_collection("Order", Some(Criteria::mapping().with("status", "void")))
        .unwrap();
    assert_eq!(removed, 1);
    assert_eq!(session.get_count("Order", None), 2);

    let none = session
        .remove_collection("Customer", Some(Criteria::from(99_i64)))
        .unwrap();
    assert_eq!(none, 0);
}

#[test]
fn test_rejected_clause_matches_nothing() {
    let map = catalog();
    let session = Session::new(connection(), &map, Options::default());

    let found = session.collection("Customer", Some(Criteria::from("1=1; DROP TABLE customer")));
    assert!(found.is_empty());
    assert_eq!(session.get_count("Customer", None), 3);
}

#[test]
fn test_cached_reads_see_writes() {
    let map = catalog();
    let options = Options {
        cache_db: true,
        ..Options::default()
    };
    let session = Session::new(connection(), &map, options).with_cache(Arc::new(MemoryCache::new()));
    let by_id = || Some(Criteria::from(2_i64));

    let before = session.object_graph("Customer", GraphSpec::new(), by_id()).unwrap();
    assert_eq!(before.get("name"), Some(&Value::from("Bo")));

    session
        .update_collection("Customer", [("name", "Bob")], by_id())
        .unwrap();
    let after = session.object_graph("Customer", GraphSpec::new(), by_id()).unwrap();
    assert_eq!(after.get("name"), Some(&Value::from("Bob")));
}

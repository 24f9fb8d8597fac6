use crate::common::{catalog, row, RecordingConnection};
use vellum::prelude::*;
use vellum::{Binding, EntitySource, Options};

fn customer(id: i64, name: &str) -> Row {
    row(&[("Customer_id", id.into()), ("Customer_name", name.into()), ("Customer_age", 44.into())])
}

#[test]
fn test_collection_sql_and_hydration() {
    let map = catalog();
    let conn = RecordingConnection::new(Dialect::SQLite);
    conn.respond(vec![customer(1, "Ann"), customer(2, "Bo")]);
    let session = Session::new(conn, &map, Options::default());

    let customers = session.collection("Customer", Some(Criteria::mapping().with("age:>", 40)));
    assert_eq!(customers.len(), 2);
    assert_eq!(customers[1].get("name"), Some(&Value::from("Bo")));

    let statements = session.connection().statements();
    assert_eq!(statements.len(), 1);
    assert!(statements[0].sql.starts_with(r#"SELECT "Customer"."id" AS "Customer_id""#));
    assert!(statements[0].sql.ends_with(r#"FROM "customer" AS "Customer" WHERE "Customer"."age" > ?"#));
    assert_eq!(statements[0].bindings, vec![Binding::int(40)]);
}

#[test]
fn test_collection_graph_attaches_relations() {
    let map = catalog();
    let conn = RecordingConnection::new(Dialect::SQLite);
    let with_order = |customer_id: i64, order_id: i64, status: &str| {
        let mut row = customer(customer_id, "Ann");
        row.insert("Orders_id".into(), order_id.into());
        row.insert("Orders_customer".into(), customer_id.into());
        row.insert("Orders_status".into(), status.into());
        row
    };
    conn.respond(vec![with_order(1, 10, "open"), with_order(1, 11, "paid")]);
    let session = Session::new(conn, &map, Options::default());

    let graph: GraphSpec = r#"{"Orders": {}}"#.parse().unwrap();
    let customers = session.collection_graph("Customer", graph, None);
    assert_eq!(customers.len(), 1);
    let statuses: Vec<_> = customers[0]
        .many("Orders")
        .iter()
        .filter_map(|order| order.get("status").and_then(Value::as_str))
        .collect();
    assert_eq!(statuses, ["open", "paid"]);
    assert!(
        session
            .connection()
            .last_sql()
            .unwrap()
            .ends_with(r#"ORDER BY "Customer"."id" ASC"#)
    );
}

#[test]
fn test_object_graph_returns_first() {
    let map = catalog();
    let conn = RecordingConnection::new(Dialect::SQLite);
    conn.respond(vec![customer(7, "Cy"), customer(8, "Di")]);
    let session = Session::new(conn, &map, Options::default());

    let found = session.object_graph("Customer", GraphSpec::new(), Some(Criteria::from(7_i64))).unwrap();
    assert_eq!(found.get("id"), Some(&Value::from(7)));
    assert_eq!(session.connection().statements()[0].bindings, vec![Binding::int(7)]);

    assert!(session.object_graph("Customer", GraphSpec::new(), None).is_none());
}

#[test]
fn test_read_failures_degrade() {
    let map = catalog();
    let conn = RecordingConnection::new(Dialect::SQLite);
    conn.fail_next();
    conn.fail_next();
    let session = Session::new(conn, &map, Options::default());

    assert!(session.collection("Customer", None).is_empty());
    assert_eq!(session.get_count("Customer", None), 0);
    assert!(session.collection("Warehouse", None).is_empty());
    assert!(matches!(
        session.try_collection_graph("Warehouse", GraphSpec::new(), None),
        Err(VellumError::UnknownClass(_))
    ));
}

#[test]
fn test_get_count() {
    let map = catalog();
    let conn = RecordingConnection::new(Dialect::SQLite);
    conn.respond(vec![row(&[("COUNT", 12.into())])]);
    let session = Session::new(conn, &map, Options::default());

    let count = session.get_count("Customer", Some(Criteria::mapping().with("name:LIKE", "A%")));
    assert_eq!(count, 12);
    let sql = session.connection().last_sql().unwrap();
    assert!(
        sql.starts_with(r#"SELECT COUNT(DISTINCT "Customer"."id") FROM "customer" AS "Customer""#),
        "{sql}"
    );
    assert!(!sql.contains("ORDER BY"));
}

#[test]
fn test_count_over_compound_key_wraps() {
    let map = catalog();
    let conn = RecordingConnection::new(Dialect::PostgreSQL);
    conn.respond(vec![row(&[("count", 3.into())])]);
    let session = Session::new(conn, &map, Options::default());

    assert_eq!(session.get_count("Item", None), 3);
    let sql = session.connection().last_sql().unwrap();
    assert!(sql.starts_with("SELECT COUNT(*) FROM (SELECT DISTINCT"), "{sql}");
    assert!(sql.ends_with(") cq"));
}

#[derive(Debug, PartialEq)]
enum Shop {
    Customer { name: String, orders: Vec<Shop> },
    Order { id: i64 },
}

impl Entity for Shop {
    fn from_source(_source: &EntitySource<'_>) -> Option<Self> {
        None
    }

    fn primary_key(&self) -> Option<String> {
        match self {
            Shop::Customer { name, .. } => Some(name.clone()),
            Shop::Order { id } => Some(id.to_string()),
        }
    }

    fn attach_one(&mut self, _alias: &str, _related: Self) {}

    fn attach_many(&mut self, _alias: &str, related: Self) {
        if let Shop::Customer { orders, .. } = self {
            orders.push(related);
        }
    }

    fn related_mut(&mut self, _alias: &str, key: Option<&str>) -> Option<&mut Self> {
        let Shop::Customer { orders, .. } = self else {
            return None;
        };
        orders.iter_mut().find(|order| order.primary_key().as_deref() == key)
    }
}

#[test]
fn test_session_with_factories() {
    let map = catalog();
    let conn = RecordingConnection::new(Dialect::SQLite);
    let rows = vec![
        row(&[("Customer_id", 1.into()), ("Customer_name", "Ann".into()), ("Orders_id", 5.into()), ("Orders_customer", 1.into())]),
        row(&[("Customer_id", 1.into()), ("Customer_name", "Ann".into()), ("Orders_id", 5.into()), ("Orders_customer", 1.into())]),
        row(&[("Customer_id", 1.into()), ("Customer_name", "Ann".into()), ("Orders_id", 6.into()), ("Orders_customer", 1.into())]),
    ];
    conn.respond(rows);

    let registry = FactoryRegistry::new()
        .with("Customer", |source: &EntitySource<'_>| {
            Some(Shop::Customer {
                name: source.get("name")?.as_str()?.to_string(),
                orders: Vec::new(),
            })
        })
        .with("Order", |source: &EntitySource<'_>| {
            Some(Shop::Order {
                id: source.get("id")?.as_i64()?,
            })
        });
    let session = Session::new(conn, &map, Options::default()).with_factories(registry);
    assert_eq!(session.factories().len(), 2);

    let shops = session.collection_graph("Customer", GraphSpec::new().with("Orders", GraphSpec::new()), None);
    assert_eq!(
        shops,
        vec![Shop::Customer {
            name: "Ann".into(),
            orders: vec![Shop::Order { id: 5 }, Shop::Order { id: 6 }],
        }]
    );
}

use crate::common::{catalog, ctx, row};
use vellum::prelude::*;
use vellum::{Binding, EntitySource};

#[test]
fn test_bind_graph_sql() {
    let map = catalog();
    let mut query = Query::new(ctx(&map, Dialect::SQLite), "Customer", None).unwrap();
    query.bind_graph(GraphSpec::new().with("Orders", GraphSpec::new()));
    assert_eq!(
        query.to_sql().unwrap(),
        concat!(
            r#"SELECT "Customer"."id" AS "Customer_id", "Customer"."name" AS "Customer_name", "#,
            r#""Customer"."email" AS "Customer_email", "Customer"."age" AS "Customer_age", "#,
            r#""Customer"."address" AS "Customer_address", "#,
            r#""Orders"."id" AS "Orders_id", "Orders"."customer" AS "Orders_customer", "#,
            r#""Orders"."status" AS "Orders_status", "Orders"."total" AS "Orders_total" "#,
            r#"FROM "customer" AS "Customer" "#,
            r#"LEFT JOIN "orders" AS "Orders" ON "Customer"."id" = "Orders"."customer" "#,
            r#"ORDER BY "Customer"."id" ASC"#
        )
    );
}

#[test]
fn test_nested_graph_from_json() {
    let map = catalog();
    let mut query = Query::new(ctx(&map, Dialect::MySQL), "Customer", Some(Criteria::from(3_i64))).unwrap();
    query.bind_graph_json(r#"{"Orders": {"Items": {}}, "Address": {}}"#);
    let compiled = query.compile().unwrap();
    let sql = &compiled.sql;
    assert!(sql.contains("LEFT JOIN `orders` AS `Orders` ON `Customer`.`id` = `Orders`.`customer`"), "{sql}");
    assert!(sql.contains("LEFT JOIN `item` AS `Items` ON `Orders`.`id` = `Items`.`order`"), "{sql}");
    assert!(sql.contains("LEFT JOIN `address` AS `Address` ON `Customer`.`address` = `Address`.`id`"), "{sql}");
    assert!(sql.contains("`Items`.`sku` AS `Items_sku`"));
    assert_eq!(compiled.bindings, vec![Binding::int(3)]);

    let spec = query.snapshot();
    let joins: Vec<(&str, JoinKind)> = spec.joins.iter().map(|j| (j.alias.as_str(), j.kind)).collect();
    assert_eq!(
        joins,
        vec![
            ("Orders", JoinKind::Left),
            ("Items", JoinKind::Left),
            ("Address", JoinKind::Left),
        ]
    );
}

#[test]
fn test_relation_criteria_join_binding() {
    let map = catalog();
    let mut query = Query::new(ctx(&map, Dialect::SQLite), "Customer", None).unwrap();
    query
        .bind_graph(GraphSpec::new().with("VipOrders", GraphSpec::new()))
        .where_(Criteria::mapping().with("age:>", 40));
    let compiled = query.compile().unwrap();
    assert!(compiled.sql.contains(
        r#"LEFT JOIN "orders" AS "VipOrders" ON ("Customer"."id" = "VipOrders"."customer" AND "VipOrders"."status" = ?)"#
    ));
    assert_eq!(compiled.bindings, vec![Binding::text("vip"), Binding::int(40)]);
}

#[test]
fn test_unresolved_alias_is_skipped() {
    let map = catalog();
    let mut query = Query::new(ctx(&map, Dialect::SQLite), "Customer", None).unwrap();
    query.bind_graph(GraphSpec::new().with("Wishlist", GraphSpec::new().with("Items", GraphSpec::new())));
    let sql = query.to_sql().unwrap();
    assert!(!sql.contains("JOIN"), "{sql}");
    assert!(sql.ends_with(r#"ORDER BY "Customer"."id" ASC"#));
}

#[test]
fn test_rebinding_same_graph_is_noop() {
    let map = catalog();
    let graph = GraphSpec::new().with("Orders", GraphSpec::new());
    let mut query = Query::new(ctx(&map, Dialect::SQLite), "Customer", None).unwrap();
    query.bind_graph(graph.clone());
    let once = query.to_sql().unwrap();
    query.bind_graph(graph);
    assert_eq!(query.to_sql().unwrap(), once);
}

#[test]
fn test_graph_for_class_stops_at_cycles() {
    let map = catalog();
    let graph = GraphSpec::for_class(&map, "Customer", 3);
    let orders = graph.get("Orders").unwrap();
    assert!(orders.get("Items").is_some());
    assert!(orders.get("Customer").is_none());
    assert!(graph.get("Address").unwrap().is_empty());
    assert!(GraphSpec::for_class(&map, "Customer", 0).is_empty());
}

fn customer_rows() -> Vec<Row> {
    let customer = |id: i64, name: &str| vec![("Customer_id", Value::from(id)), ("Customer_name", Value::from(name))];
    let order = |id: Option<i64>, customer: Option<i64>| {
        vec![("Orders_id", Value::from(id)), ("Orders_customer", Value::from(customer))]
    };
    let item = |order: Option<i64>, line: Option<i64>, sku: Option<&str>| {
        vec![
            ("Items_order", Value::from(order)),
            ("Items_line", Value::from(line)),
            ("Items_sku", Value::from(sku)),
        ]
    };
    let mk = |parts: Vec<Vec<(&str, Value)>>| row(&parts.concat());
    vec![
        mk(vec![customer(1, "Ann"), order(Some(10), Some(1)), item(Some(10), Some(1), Some("A"))]),
        mk(vec![customer(1, "Ann"), order(Some(10), Some(1)), item(Some(10), Some(2), Some("B"))]),
        mk(vec![customer(1, "Ann"), order(Some(11), Some(1)), item(None, None, None)]),
        mk(vec![customer(2, "Bo"), order(None, None), item(None, None, None)]),
    ]
}

#[test]
fn test_hydrate_nested_graph() {
    let map = catalog();
    let mut query = Query::new(ctx(&map, Dialect::SQLite), "Customer", None).unwrap();
    query.bind_graph(GraphSpec::new().with("Orders", GraphSpec::new().with("Items", GraphSpec::new())));

    let customers = query
        .hydrate_graph(&customer_rows(), &FactoryRegistry::<Record>::new())
        .unwrap();
    assert_eq!(customers.keys().collect::<Vec<_>>(), vec!["1", "2"]);

    let ann = &customers["1"];
    assert_eq!(ann.class(), "Customer");
    assert_eq!(ann.get("name"), Some(&Value::from("Ann")));
    let orders = ann.many("Orders");
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].many("Items").len(), 2);
    assert_eq!(orders[0].many("Items")[1].get("sku"), Some(&Value::from("B")));
    assert!(orders[1].many("Items").is_empty());

    assert!(customers["2"].many("Orders").is_empty());
}

#[test]
fn test_hydrate_uses_registered_factories() {
    let map = catalog();
    let mut query = Query::new(ctx(&map, Dialect::SQLite), "Customer", None).unwrap();
    query.bind_graph(GraphSpec::new().with("Orders", GraphSpec::new()));

    let registry = FactoryRegistry::new().with("Customer", |source: &EntitySource<'_>| {
        // Customers without a name are not materialized.
        source
            .get("name")
            .filter(|name| !name.is_null())
            .map(|_| Record::from_source(source))
    });
    let rows = vec![
        row(&[("Customer_id", 5.into()), ("Customer_name", Value::Null), ("Orders_id", Value::Null)]),
        row(&[("Customer_id", 6.into()), ("Customer_name", "Cy".into()), ("Orders_id", Value::Null)]),
    ];
    let hydrated = query.hydrator(&registry).unwrap().hydrate(&rows);
    assert_eq!(hydrated.len(), 1);
    assert_eq!(hydrated["6"].get("name"), Some(&Value::from("Cy")));
}

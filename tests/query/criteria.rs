use crate::common::{catalog, ctx};
use serde_json::json;
use vellum::prelude::*;
use vellum::{Binding, FieldValue};

#[test]
fn test_keyed_mapping_binds_each_value_once() {
    let map = catalog();
    let mut query = Query::new(ctx(&map, Dialect::SQLite), "Customer", None).unwrap();
    query.where_(
        Criteria::mapping()
            .with("fullname", "Ann")
            .with("age:>=", 21)
            .with("email:LIKE", "%@example.com"),
    );
    let compiled = query.compile().unwrap();
    assert_eq!(compiled.sql.matches('?').count(), 3);
    assert!(compiled.sql.contains(r#""Customer"."name" = ?"#), "{}", compiled.sql);
    assert!(compiled.sql.contains(r#""Customer"."age" >= ?"#));
    assert_eq!(
        compiled.bindings,
        vec![
            Binding::text("Ann"),
            Binding::int(21),
            Binding::text("%@example.com"),
        ]
    );
}

#[test]
fn test_postgres_numbers_placeholders() {
    let map = catalog();
    let mut query = Query::new(ctx(&map, Dialect::PostgreSQL), "Order", None).unwrap();
    query
        .where_(Criteria::mapping().with("status", "open"))
        .and_condition(Criteria::mapping().with("total:>", 10.5), 0);
    let sql = query.to_sql().unwrap();
    assert!(sql.contains(r#""Order"."status" = $1"#), "{sql}");
    assert!(sql.contains(r#""Order"."total" > $2"#), "{sql}");
}

#[test]
fn test_injection_fails_closed() {
    let map = catalog();
    for raw in [
        "Customer.id = 1; DELETE FROM customer",
        "1=1 union select password from users",
    ] {
        let mut query = Query::new(ctx(&map, Dialect::SQLite), "Customer", None).unwrap();
        query.where_(raw);
        let compiled = query.compile().unwrap();
        assert!(compiled.sql.ends_with(" WHERE 2=1"), "{}", compiled.sql);
        assert!(compiled.bindings.is_empty());
    }
}

#[test]
fn test_quoted_semicolon_is_allowed() {
    let map = catalog();
    let mut query = Query::new(ctx(&map, Dialect::SQLite), "Customer", None).unwrap();
    query.where_("Customer.name = 'a;b'");
    assert!(query.to_sql().unwrap().ends_with("WHERE Customer.name = 'a;b'"));
}

#[test]
fn test_in_list_renders_literals() {
    let map = catalog();
    let mut query = Query::new(ctx(&map, Dialect::MySQL), "Order", None).unwrap();
    query.where_(Criteria::mapping().with("id:IN", FieldValue::list([3, 5, 8])));
    let compiled = query.compile().unwrap();
    assert!(compiled.sql.ends_with("WHERE `Order`.`id` IN (3,5,8)"), "{}", compiled.sql);
    assert!(compiled.bindings.is_empty());
}

#[test]
fn test_compound_key_sequence() {
    let map = catalog();
    let query = Query::new(
        ctx(&map, Dialect::SQLite),
        "Item",
        Some(Criteria::from(vec![Value::from(7), Value::from(2)])),
    )
    .unwrap();
    let compiled = query.compile().unwrap();
    assert!(
        compiled.sql.contains(r#""Item"."order" = ? AND "Item"."line" = ?"#),
        "{}",
        compiled.sql
    );
    assert_eq!(compiled.bindings, vec![Binding::int(7), Binding::int(2)]);
}

#[test]
fn test_where_json_shapes() {
    let map = catalog();
    let mut query = Query::new(ctx(&map, Dialect::SQLite), "Customer", None).unwrap();
    query.where_json(&json!({"age:<": 18, "0": {"OR:name": "Al", "OR:name:!=": null}}));
    let compiled = query.compile().unwrap();
    assert!(
        compiled
            .sql
            .contains(r#""Customer"."age" < ? OR ("Customer"."name" = ? OR "Customer"."name" IS NOT NULL)"#),
        "{}",
        compiled.sql
    );
    assert_eq!(compiled.bindings.len(), 2);
}

#[test]
fn test_strict_parse_surfaces_errors() {
    let map = catalog();
    let query = Query::new(ctx(&map, Dialect::SQLite), "Customer", None).unwrap();
    let err = query
        .parse_conditions(&Criteria::from("abc"), Conjunction::And)
        .unwrap_err();
    assert!(matches!(err, VellumError::InvalidExpression(_)));
}

#[test]
fn test_having_and_group_by() {
    let map = catalog();
    let mut query = Query::new(ctx(&map, Dialect::SQLite), "Order", None).unwrap();
    query
        .select("Order.customer, SUM(Order.total) AS spent")
        .group_by("Order.customer", "")
        .having("SUM(Order.total) > 100")
        .sort_by("spent", "desc");
    assert_eq!(
        query.to_sql().unwrap(),
        r#"SELECT Order.customer, SUM(Order.total) AS spent FROM "orders" AS "Order" GROUP BY Order.customer HAVING SUM(Order.total) > 100 ORDER BY spent DESC"#
    );
}

#[test]
fn test_interpolated_debug_sql() {
    let map = catalog();
    let mut query = Query::new(ctx(&map, Dialect::SQLite), "Customer", None).unwrap();
    query
        .select("Customer.id")
        .where_(Criteria::mapping().with("name", "O'Neil").with("age", ""));
    let compiled = query.compile().unwrap();
    assert_eq!(
        compiled.interpolated(&Dialect::SQLite),
        r#"SELECT Customer.id FROM "customer" AS "Customer" WHERE ("Customer"."name" = 'O''Neil' AND "Customer"."age" = 0)"#
    );
}

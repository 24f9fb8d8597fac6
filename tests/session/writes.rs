use crate::common::{catalog, RecordingConnection};
use vellum::prelude::*;
use vellum::{Binding, Options};

#[test]
fn test_update_collection() {
    let map = catalog();
    let session = Session::new(RecordingConnection::new(Dialect::SQLite).with_affected(1), &map, Options::default());

    let affected = session
        .update_collection("Customer", [("fullname", "Bo")], Some(Criteria::from(1_i64)))
        .unwrap();
    assert_eq!(affected, 1);

    let statements = session.connection().statements();
    assert_eq!(statements[0].sql, r#"UPDATE "customer" SET "name" = ? WHERE "customer"."id" = ?"#);
    assert_eq!(statements[0].bindings, vec![Binding::text("Bo"), Binding::int(1)]);
}

#[test]
fn test_update_raw_expression_and_null() {
    let map = catalog();
    let session = Session::new(RecordingConnection::new(Dialect::MySQL).with_affected(4), &map, Options::default());

    let values: Vec<(&str, Value)> = vec![("age", Value::from("age + 1")), ("email", Value::Null)];
    let affected = session
        .update_collection("Customer", values, Some(Criteria::mapping().with("age:<", 30)))
        .unwrap();
    assert_eq!(affected, 4);
    let statement = &session.connection().statements()[0];
    assert_eq!(
        statement.sql,
        "UPDATE `customer` SET `age` = ?, `email` = ? WHERE `customer`.`age` < ?"
    );
    assert_eq!(statement.bindings[1], Binding::null());
}

#[test]
fn test_update_without_known_fields_fails() {
    let map = catalog();
    let session = Session::new(RecordingConnection::new(Dialect::SQLite), &map, Options::default());

    let err = session
        .update_collection("Customer", [("nickname", "Bo")], None)
        .unwrap_err();
    assert!(matches!(err, VellumError::CompilationFailure(_)));
    assert!(session.connection().statements().is_empty());
}

#[test]
fn test_remove_collection() {
    let map = catalog();
    let session = Session::new(RecordingConnection::new(Dialect::PostgreSQL).with_affected(2), &map, Options::default());

    let affected = session
        .remove_collection("Order", Some(Criteria::mapping().with("status", "void")))
        .unwrap();
    assert_eq!(affected, 2);
    assert_eq!(
        session.connection().last_sql().unwrap(),
        r#"DELETE FROM "orders" WHERE "orders"."status" = $1"#
    );
}

#[test]
fn test_write_failures_propagate() {
    let map = catalog();
    let conn = RecordingConnection::new(Dialect::SQLite);
    conn.fail_next();
    let session = Session::new(conn, &map, Options::default());

    let err = session.remove_collection("Customer", None).unwrap_err();
    assert!(matches!(err, VellumError::Execution(_)));
    assert!(matches!(
        session.remove_collection("Warehouse", None),
        Err(VellumError::UnknownClass(_))
    ));
}

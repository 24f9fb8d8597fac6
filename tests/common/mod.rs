//! Shared fixture: a small shop catalog and a connection that records every
//! statement it is handed.

use std::cell::RefCell;
use std::collections::VecDeque;
use vellum::{
    Binding, CompiledQuery, Connection, Context, Dialect, ModelMap, ParamType, Quote, Result, Row, Statement, Value,
    VellumError,
};

pub const MODELS: &str = r#"{
    "Customer": {
        "table": "customer",
        "fields": {
            "id": {"type": "integer", "index": "pk", "nullable": false},
            "name": {"type": "string"},
            "email": {"dbtype": "varchar(255)"},
            "age": {"type": "integer"},
            "address": {"type": "integer"}
        },
        "aliases": {"fullname": "name"},
        "composites": {
            "Orders": {"class": "Order", "local": "id", "foreign": "customer", "cardinality": "many", "owner": "local"}
        },
        "aggregates": {
            "Address": {"class": "Address", "local": "address", "foreign": "id", "cardinality": "one", "owner": "foreign"},
            "VipOrders": {
                "class": "Order", "local": "id", "foreign": "customer", "cardinality": "many",
                "criteria": {"local": {"status": "vip"}}
            }
        }
    },
    "Order": {
        "table": "orders",
        "fields": {
            "id": {"type": "integer", "index": "pk", "nullable": false},
            "customer": {"type": "integer"},
            "status": {"type": "string"},
            "total": {"type": "float"}
        },
        "composites": {
            "Items": {"class": "Item", "local": "id", "foreign": "order", "cardinality": "many"}
        },
        "aggregates": {
            "Customer": {"class": "Customer", "local": "customer", "foreign": "id", "cardinality": "one"}
        }
    },
    "Item": {
        "table": "item",
        "fields": {
            "order": {"type": "integer", "index": "pk"},
            "line": {"type": "integer", "index": "pk"},
            "sku": {"type": "string"},
            "qty": {"type": "integer"}
        }
    },
    "Address": {
        "table": "address",
        "fields": {
            "id": {"type": "integer", "index": "pk"},
            "city": {"type": "string"}
        }
    }
}"#;

pub fn catalog() -> ModelMap {
    ModelMap::from_json(MODELS, "").expect("fixture models parse")
}

pub fn ctx(catalog: &ModelMap, dialect: Dialect) -> Context<'_> {
    Context::new(catalog, dialect)
}

pub fn row(pairs: &[(&str, Value)]) -> Row {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

/// A connection that records statements and answers them from a queue.
#[derive(Debug, Default)]
pub struct RecordingConnection {
    dialect: Dialect,
    statements: RefCell<Vec<CompiledQuery>>,
    responses: RefCell<VecDeque<Result<Vec<Row>>>>,
    affected: usize,
}

impl RecordingConnection {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    pub fn with_affected(mut self, affected: usize) -> Self {
        self.affected = affected;
        self
    }

    /// Queues the rows the next executed statement returns.
    pub fn respond(&self, rows: Vec<Row>) {
        self.responses.borrow_mut().push_back(Ok(rows));
    }

    /// Makes the next executed statement fail.
    pub fn fail_next(&self) {
        self.responses
            .borrow_mut()
            .push_back(Err(VellumError::Execution("connection lost".into())));
    }

    pub fn statements(&self) -> Vec<CompiledQuery> {
        self.statements.borrow().clone()
    }

    pub fn last_sql(&self) -> Option<String> {
        self.statements.borrow().last().map(|s| s.sql.clone())
    }
}

impl Quote for RecordingConnection {
    fn quote(&self, value: &Value, param_type: ParamType) -> String {
        self.dialect.quote(value, param_type)
    }
}

pub struct RecordedStatement<'c> {
    conn: &'c RecordingConnection,
    sql: String,
    bindings: Vec<Binding>,
}

impl Statement for RecordedStatement<'_> {
    fn bind(&mut self, bindings: &[Binding]) -> Result<()> {
        self.bindings = bindings.to_vec();
        Ok(())
    }

    fn execute(&mut self) -> Result<Vec<Row>> {
        self.conn.statements.borrow_mut().push(CompiledQuery {
            sql: self.sql.clone(),
            bindings: self.bindings.clone(),
        });
        self.conn.responses.borrow_mut().pop_front().unwrap_or(Ok(Vec::new()))
    }
}

impl Connection for RecordingConnection {
    type Statement<'c> = RecordedStatement<'c>;

    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn prepare(&self, sql: &str) -> Result<RecordedStatement<'_>> {
        Ok(RecordedStatement {
            conn: self,
            sql: sql.to_string(),
            bindings: Vec::new(),
        })
    }

    fn exec(&self, sql: &str, bindings: &[Binding]) -> Result<usize> {
        self.statements.borrow_mut().push(CompiledQuery {
            sql: sql.to_string(),
            bindings: bindings.to_vec(),
        });
        match self.responses.borrow_mut().pop_front() {
            Some(Err(err)) => Err(err),
            _ => Ok(self.affected),
        }
    }
}

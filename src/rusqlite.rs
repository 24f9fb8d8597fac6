//! Synchronous SQLite driver using [`rusqlite`].
//!
//! # Example
//!
//! ```no_run
//! use vellum::rusqlite::SqliteConnection;
//! use vellum::{ClassDef, FieldMeta, FieldType, ModelMap, Options, Session};
//!
//! fn main() -> vellum::Result<()> {
//!     let conn = SqliteConnection::open_in_memory()?;
//!     let catalog = ModelMap::builder()
//!         .class("Customer", ClassDef::new("customer").field("id", FieldMeta::pk(FieldType::Integer)))
//!         .build()?;
//!     let session = Session::new(conn, &catalog, Options::default());
//!     let customers = session.collection("Customer", None);
//!     println!("{} customers", customers.len());
//!     Ok(())
//! }
//! ```

use crate::connection::{Connection, Statement};
use rusqlite::params_from_iter;
use std::path::Path;
use vellum_core::{Binding, Dialect, ParamType, Quote, Result, Row, Value};

/// A [`rusqlite::Connection`] behind the [`Connection`] contract.
#[derive(Debug)]
pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl SqliteConnection {
    pub fn new(conn: rusqlite::Connection) -> Self {
        Self { conn }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(rusqlite::Connection::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(rusqlite::Connection::open_in_memory()?))
    }

    /// Runs several `;`-separated statements, e.g. a schema.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    pub fn inner(&self) -> &rusqlite::Connection {
        &self.conn
    }

    pub fn into_inner(self) -> rusqlite::Connection {
        self.conn
    }
}

/// The value actually sent for `binding`: integer and boolean binds are
/// coerced to integers, so an empty string binds as `0`.
fn bound_value(binding: &Binding) -> Value {
    match (binding.param_type, &binding.value) {
        (ParamType::Null, _) | (_, Value::Null) => Value::Null,
        (ParamType::Int | ParamType::Bool, value) => Value::Integer(value.to_int_lossy()),
        (ParamType::Str, value) => value.clone(),
    }
}

impl Quote for SqliteConnection {
    fn quote(&self, value: &Value, param_type: ParamType) -> String {
        Dialect::SQLite.quote(value, param_type)
    }
}

impl Connection for SqliteConnection {
    type Statement<'c> = SqliteStatement<'c>;

    fn dialect(&self) -> Dialect {
        Dialect::SQLite
    }

    fn prepare(&self, sql: &str) -> Result<SqliteStatement<'_>> {
        Ok(SqliteStatement {
            stmt: self.conn.prepare(sql)?,
            params: Vec::new(),
        })
    }

    fn exec(&self, sql: &str, bindings: &[Binding]) -> Result<usize> {
        let affected = self
            .conn
            .execute(sql, params_from_iter(bindings.iter().map(bound_value)))?;
        Ok(affected)
    }
}

/// A prepared rusqlite statement with its pending parameters.
pub struct SqliteStatement<'c> {
    stmt: rusqlite::Statement<'c>,
    params: Vec<Value>,
}

impl Statement for SqliteStatement<'_> {
    fn bind(&mut self, bindings: &[Binding]) -> Result<()> {
        self.params = bindings.iter().map(bound_value).collect();
        Ok(())
    }

    fn execute(&mut self) -> Result<Vec<Row>> {
        let columns: Vec<String> = self.stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = self.stmt.query(params_from_iter(self.params.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Row::with_capacity(columns.len());
            for (i, name) in columns.iter().enumerate() {
                record.insert(name.clone(), row.get::<_, Value>(i)?);
            }
            out.push(record);
        }
        Ok(out)
    }
}

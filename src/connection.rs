//! Execution-layer contract.
//!
//! A [`Connection`] prepares statements and quotes literals. The session only
//! ever hands it SQL produced by the compiler, together with the bindings
//! for its placeholders.

use vellum_core::{Binding, Dialect, Quote, Result, Row};

/// A prepared statement.
pub trait Statement {
    /// Binds values to the placeholders, in order.
    fn bind(&mut self, bindings: &[Binding]) -> Result<()>;

    /// Runs the statement and returns every row.
    fn execute(&mut self) -> Result<Vec<Row>>;
}

/// A database connection.
pub trait Connection: Quote {
    type Statement<'c>: Statement
    where
        Self: 'c;

    fn dialect(&self) -> Dialect;

    fn prepare(&self, sql: &str) -> Result<Self::Statement<'_>>;

    /// Runs a statement that returns no rows, returning the affected count.
    fn exec(&self, sql: &str, bindings: &[Binding]) -> Result<usize>;
}

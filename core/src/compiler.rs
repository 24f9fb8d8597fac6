//! Rendering of a [`QuerySpec`] into one parameterized statement.

use crate::condition::{ALWAYS_FALSE, ConditionSet};
use crate::error::{Result, VellumError};
use crate::params::Binding;
use crate::query::{Command, OrderBy, QuerySpec};
use crate::quote::Quote;
use crate::sql::{Sql, SqlChunk, SqlWriter};
use core::fmt::Write;
use serde::{Deserialize, Serialize};
use vellum_types::{Dialect, ParamType};

/// A rendered statement and the bindings for its placeholders, in order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompiledQuery {
    pub sql: String,
    pub bindings: Vec<Binding>,
}

impl CompiledQuery {
    /// The statement with every placeholder replaced by its quoted value.
    ///
    /// Meant for logs and debugging; never execute the result. Empty integer
    /// and boolean values render as `0`. Placeholders inside quoted text are
    /// left alone.
    pub fn interpolated(&self, quoter: &dyn Quote) -> String {
        if self.bindings.is_empty() {
            return self.sql.clone();
        }
        let literals: Vec<String> = self.bindings.iter().map(|b| literal(quoter, b)).collect();
        let mut out = String::with_capacity(self.sql.len() + literals.iter().map(String::len).sum::<usize>());
        let mut next = 0usize;
        let mut quote: Option<char> = None;
        let mut chars = self.sql.char_indices().peekable();
        while let Some((_, ch)) = chars.next() {
            match (quote, ch) {
                (Some(q), c) if c == q => {
                    quote = None;
                    out.push(c);
                }
                (Some(_), c) => out.push(c),
                (None, '\'' | '"' | '`') => {
                    quote = Some(ch);
                    out.push(ch);
                }
                (None, '?') => {
                    match literals.get(next) {
                        Some(lit) => out.push_str(lit),
                        None => out.push('?'),
                    }
                    next += 1;
                }
                (None, '$') if chars.peek().is_some_and(|(_, c)| c.is_ascii_digit()) => {
                    let mut digits = String::new();
                    while let Some((_, c)) = chars.peek().copied() {
                        if !c.is_ascii_digit() {
                            break;
                        }
                        digits.push(c);
                        chars.next();
                    }
                    let index = digits.parse::<usize>().unwrap_or(0);
                    match index.checked_sub(1).and_then(|i| literals.get(i)) {
                        Some(lit) => out.push_str(lit),
                        None => {
                            out.push('$');
                            out.push_str(&digits);
                        }
                    }
                }
                (None, c) => out.push(c),
            }
        }
        out
    }
}

fn literal(quoter: &dyn Quote, binding: &Binding) -> String {
    let empty = match &binding.value {
        crate::value::Value::Null => true,
        crate::value::Value::Text(s) => s.is_empty(),
        crate::value::Value::Bool(b) => !b,
        crate::value::Value::Integer(i) => *i == 0,
        _ => false,
    };
    match binding.param_type {
        ParamType::Int | ParamType::Bool if empty => "0".to_string(),
        param_type => quoter.quote(&binding.value, param_type),
    }
}

/// Renders `spec` for `dialect`.
///
/// Fails with [`VellumError::CompilationFailure`] when `spec` has no root
/// table, when an UPDATE has nothing to set, or when an UPDATE or DELETE
/// carries joins.
pub fn compile(spec: &QuerySpec, dialect: Dialect) -> Result<CompiledQuery> {
    let Some(root) = spec.root() else {
        return Err(VellumError::CompilationFailure("query has no root table".into()));
    };
    let mut w = SqlWriter::new(dialect);

    match spec.command {
        Command::Select => {
            w.push_str("SELECT ");
            if spec.distinct {
                w.push_str("DISTINCT ");
            }
            if spec.columns.is_empty() {
                w.push_str("*");
            } else {
                for (i, column) in spec.columns.iter().enumerate() {
                    if i > 0 {
                        w.push_str(", ");
                    }
                    w.push_sql(column);
                }
            }
            w.push_str(" FROM ");
            for (i, table) in spec.tables.iter().enumerate() {
                if i > 0 {
                    w.push_str(", ");
                }
                w.push_sql(&Sql::ident(table.table.as_str()));
                w.push_str(" AS ");
                w.push_sql(&Sql::ident(table.alias.as_str()));
            }
            for join in &spec.joins {
                w.push_str(" ");
                w.push_str(join.kind.as_str());
                w.push_str(" ");
                w.push_sql(&Sql::ident(join.table.as_str()));
                w.push_str(" AS ");
                w.push_sql(&Sql::ident(join.alias.as_str()));
                if !join.kind.is_natural() && !join.conditions.is_empty() {
                    w.push_str(" ON ");
                    join.conditions.write_to(&mut w);
                }
            }
        }
        Command::Update => {
            if !spec.joins.is_empty() {
                return Err(VellumError::CompilationFailure("UPDATE does not support joins".into()));
            }
            if spec.set.is_empty() {
                return Err(VellumError::CompilationFailure("UPDATE has no values to set".into()));
            }
            w.push_str("UPDATE ");
            w.push_sql(&Sql::ident(root.table.as_str()));
            w.push_str(" SET ");
            for (i, (field, set)) in spec.set.iter().enumerate() {
                if i > 0 {
                    w.push_str(", ");
                }
                w.push_sql(&Sql::ident(field.as_str()));
                w.push_str(" = ");
                match set.param_type {
                    Some(param_type) => w.push_binding(Binding::new(set.value.clone(), param_type)),
                    None => w.push_str(&set.value.to_key_string().unwrap_or_default()),
                }
            }
        }
        Command::Delete => {
            if !spec.joins.is_empty() {
                return Err(VellumError::CompilationFailure("DELETE does not support joins".into()));
            }
            w.push_str("DELETE FROM ");
            w.push_sql(&Sql::ident(root.table.as_str()));
        }
    }

    if spec.rejected {
        w.push_str(" WHERE ");
        w.push_str(ALWAYS_FALSE);
    } else {
        write_conditions(&mut w, " WHERE ", &spec.where_clause);
    }
    if !spec.group_by.is_empty() {
        w.push_str(" GROUP BY ");
        write_terms(&mut w, &spec.group_by);
    }
    write_conditions(&mut w, " HAVING ", &spec.having);
    if !spec.order_by.is_empty() {
        w.push_str(" ORDER BY ");
        write_terms(&mut w, &spec.order_by);
    }
    if spec.limit > 0 {
        let mut tail = String::new();
        let _ = write!(tail, " LIMIT {}", spec.limit);
        if spec.offset > 0 {
            let _ = write!(tail, " OFFSET {}", spec.offset);
        }
        w.push_str(&tail);
    }

    let (sql, bindings) = w.finish();
    crate::vellum_trace_query!(&sql, bindings.len());
    Ok(CompiledQuery { sql, bindings })
}

fn write_conditions(w: &mut SqlWriter, keyword: &str, set: &ConditionSet) {
    if set.is_empty() {
        return;
    }
    w.push_str(keyword);
    set.write_to(w);
}

fn write_terms(w: &mut SqlWriter, terms: &[OrderBy]) {
    let rendered = Sql::join(
        terms.iter().map(|term| {
            let sql = Sql::raw(term.column.as_str());
            if term.direction.is_empty() {
                sql
            } else {
                sql.push(SqlChunk::raw(format!(" {}", term.direction)))
            }
        }),
        ", ",
    );
    w.push_sql(&rendered);
}

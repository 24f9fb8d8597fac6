//! Criteria to condition-tree parsing.

use crate::catalog::ClassMeta;
use crate::condition::{ConditionNode, Conjunction, Group, Leaf};
use crate::criteria::{Criteria, Entry, FieldKey, FieldValue};
use crate::error::{Result, VellumError};
use crate::guard::{is_conditional_clause, validate_clause};
use crate::params::Binding;
use crate::quote::Quote;
use crate::sql::{Sql, SqlChunk};
use crate::value::Value;
use vellum_types::{Dialect, FieldType, ParamType};

/// Parses criteria against one class.
///
/// Unqualified fields are qualified with `alias`, the query's active alias.
pub struct CriteriaParser<'a> {
    meta: &'a ClassMeta,
    alias: &'a str,
    dialect: Dialect,
    quoter: &'a dyn Quote,
}

impl<'a> CriteriaParser<'a> {
    pub fn new(meta: &'a ClassMeta, alias: &'a str, dialect: Dialect, quoter: &'a dyn Quote) -> Self {
        Self {
            meta,
            alias,
            dialect,
            quoter,
        }
    }

    /// Parses `criteria`, tagging top-level conditions with `conjunction`.
    pub fn parse(&self, criteria: &Criteria, conjunction: Conjunction) -> Result<ConditionNode> {
        match criteria {
            Criteria::Sequence(values) => self.parse_sequence(values, conjunction),
            Criteria::Mapping(entries) => self.parse_mapping(entries, conjunction),
            Criteria::Raw(clause) => {
                if is_conditional_clause(clause)? {
                    Ok(Leaf::literal(clause.clone(), conjunction).into())
                } else {
                    self.parse_pk_scalar(&Value::Text(clause.clone()), conjunction)
                }
            }
            Criteria::Scalar(value) => self.parse_pk_scalar(value, conjunction),
            Criteria::Group(items) => {
                let children = items
                    .iter()
                    .map(|item| self.parse(item, conjunction))
                    .collect::<Result<Vec<_>>>()?;
                Ok(group(conjunction, children))
            }
        }
    }

    /// One equality per compound-key component, in key order.
    fn parse_sequence(&self, values: &[Value], conjunction: Conjunction) -> Result<ConditionNode> {
        let pk = &self.meta.primary_key;
        let first_is_clause = match values.first() {
            Some(Value::Text(s)) => is_conditional_clause(s)?,
            _ => false,
        };
        if pk.len() > 1 && values.len() == pk.len() && !first_is_clause {
            let children = pk
                .iter()
                .zip(values)
                .map(|(field, value)| {
                    let param_type = if self.field_type(field).is_quotable() {
                        ParamType::Str
                    } else {
                        ParamType::Int
                    };
                    let sql = Sql::qualified(self.alias, field)
                        .push(SqlChunk::raw(" = "))
                        .push(Binding::new(value.clone(), param_type));
                    ConditionNode::from(Leaf::new(sql, conjunction))
                })
                .collect();
            return Ok(group(conjunction, children));
        }

        let mut children: Vec<ConditionNode> = Vec::with_capacity(values.len());
        for (i, value) in values.iter().enumerate() {
            match value {
                Value::Text(clause) if is_conditional_clause(clause)? => {
                    children.push(Leaf::literal(clause.clone(), conjunction).into());
                }
                other => {
                    crate::vellum_error!(index = i, value = ?other, "vellum.unparseable_condition");
                    return Err(VellumError::InvalidExpression(format!(
                        "cannot parse condition at position {i}: {other:?}"
                    )));
                }
            }
        }
        Ok(group(conjunction, children))
    }

    fn parse_mapping(&self, entries: &[Entry], conjunction: Conjunction) -> Result<ConditionNode> {
        let mut children: Vec<ConditionNode> = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry {
                Entry::Nested(criteria) => children.push(self.parse(criteria, conjunction)?),
                Entry::Clause(clause) => {
                    if !is_conditional_clause(clause)? {
                        crate::vellum_error!(clause = %clause, "vellum.unparseable_condition");
                        return Err(VellumError::InvalidExpression(format!(
                            "not a conditional clause: {clause}"
                        )));
                    }
                    children.push(Leaf::literal(clause.clone(), conjunction).into());
                }
                Entry::Field { key, value } => {
                    if let Some(node) = self.parse_field(key, value, conjunction)? {
                        children.push(node);
                    }
                }
            }
        }
        Ok(group(conjunction, children))
    }

    /// Parses a `key => value` entry; `None` when the key is itself a clause.
    fn parse_field(&self, key: &str, value: &FieldValue, conjunction: Conjunction) -> Result<Option<ConditionNode>> {
        validate_clause(key)?;
        let FieldKey {
            conjunction,
            qualifier,
            field,
            mut operator,
        } = FieldKey::parse(key, conjunction, self.dialect.escape_chars());
        let alias = qualifier.as_deref().unwrap_or(self.alias);

        let field = match self.meta.resolve_field(&field).map(str::to_string) {
            Some(canonical) => canonical,
            None if is_conditional_clause(&field)? => return Ok(None),
            None => field,
        };
        if field.is_empty() {
            return Err(VellumError::InvalidExpression(format!("empty field in key {key}")));
        }

        let column = Sql::qualified(alias, &field);
        let is_list_op = operator == "IN" || operator == "NOT IN";

        match value {
            FieldValue::Value(Value::Null) => {
                if operator != "IS" && operator != "IS NOT" {
                    operator = if operator == "!=" { "IS NOT".into() } else { "IS".into() };
                }
                let sql = column.push(SqlChunk::raw(format!(" {operator} NULL")));
                Ok(Some(Leaf::new(sql, conjunction).into()))
            }
            FieldValue::List(values) if is_list_op => {
                let param_type = self.bind_type(&field);
                let literals: Vec<String> = values
                    .iter()
                    .map(|v| match (v, param_type) {
                        (Value::Null, _) => "NULL".to_string(),
                        (v, ParamType::Int) => v.to_int_lossy().to_string(),
                        (v, _) => self.quoter.quote(v, ParamType::Str),
                    })
                    .collect();
                if literals.is_empty() {
                    crate::vellum_warn!(field = %field, operator = %operator, "vellum.empty_in_list");
                }
                let sql = column.push(SqlChunk::raw(format!(" {operator} ({})", literals.join(","))));
                Ok(Some(Leaf::new(sql, conjunction).into()))
            }
            FieldValue::List(_) => Err(VellumError::InvalidExpression(format!(
                "list value requires IN or NOT IN, got {operator} for {key}"
            ))),
            FieldValue::Value(v) => {
                let binding = Binding::new(v.clone(), self.bind_type(&field));
                let sql = if is_list_op {
                    column
                        .push(SqlChunk::raw(format!(" {operator} (")))
                        .push(binding)
                        .push(SqlChunk::raw(")"))
                } else {
                    column
                        .push(SqlChunk::raw(format!(" {operator} ")))
                        .push(binding)
                };
                Ok(Some(Leaf::new(sql, conjunction).into()))
            }
        }
    }

    /// `pk = ?` for a bare value matching the primary key's type.
    fn parse_pk_scalar(&self, value: &Value, conjunction: Conjunction) -> Result<ConditionNode> {
        let (Some(pk_type), [pk]) = (self.meta.primary_key_type(), self.meta.primary_key.as_slice()) else {
            return Err(VellumError::InvalidExpression(format!(
                "{value:?} does not match the primary key of {}",
                self.meta.class
            )));
        };
        let binding = match (pk_type, value) {
            (FieldType::Integer, v) if v.is_numeric() => Binding::int(v.clone()),
            (FieldType::Integer, _) => {
                return Err(VellumError::InvalidExpression(format!(
                    "{value:?} is not a valid integer key for {}",
                    self.meta.class
                )));
            }
            (_, Value::Text(s)) => {
                validate_clause(s)?;
                Binding::text(s.clone())
            }
            (_, other) => {
                return Err(VellumError::InvalidExpression(format!(
                    "{other:?} is not a valid key for {}",
                    self.meta.class
                )));
            }
        };
        let sql = Sql::qualified(self.alias, pk)
            .push(SqlChunk::raw(" = "))
            .push(binding);
        Ok(Leaf::new(sql, conjunction).into())
    }

    fn field_type(&self, field: &str) -> FieldType {
        self.meta
            .fields
            .get(field)
            .map(|meta| meta.field_type())
            .unwrap_or_default()
    }

    /// Int for known non-quotable fields, Str otherwise.
    fn bind_type(&self, field: &str) -> ParamType {
        match self.meta.fields.get(field) {
            Some(meta) if !meta.is_quotable() => ParamType::Int,
            _ => ParamType::Str,
        }
    }
}

/// A group takes the conjunction of its first child.
fn group(conjunction: Conjunction, children: Vec<ConditionNode>) -> ConditionNode {
    let conjunction = children.first().map_or(conjunction, ConditionNode::conjunction);
    ConditionNode::Group(Group {
        conjunction,
        children,
    })
}

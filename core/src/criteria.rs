//! Criteria expressions accepted by the query builder.
//!
//! A criteria is classified once, when it enters the API, into one of the
//! closed [`Criteria`] shapes. The parser then matches on the shape instead of
//! probing loosely typed input.

use crate::condition::Conjunction;
use crate::error::{Result, VellumError};
use crate::guard::is_conditional_clause;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Criteria {
    /// A bare primary-key value.
    Scalar(Value),
    /// Values for each component of a compound primary key, in key order.
    Sequence(Vec<Value>),
    /// Keyed conditions, in caller order.
    Mapping(Vec<Entry>),
    /// A complete conditional clause used verbatim.
    Raw(String),
    /// Nested criteria, each parsed into its own subgroup.
    Group(Vec<Criteria>),
}

/// One entry of a [`Criteria::Mapping`].
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// `key => value` where the key names a field, optionally with an operator
    /// and conjunction: `field`, `field:OP` or `CONJ:field:OP`.
    Field { key: String, value: FieldValue },
    /// A positional nested expression.
    Nested(Criteria),
    /// A positional raw clause.
    Clause(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Value(Value),
    List(Vec<Value>),
}

impl Criteria {
    /// An empty mapping, for building with [`Criteria::with`].
    pub fn mapping() -> Self {
        Criteria::Mapping(Vec::new())
    }

    /// Adds a keyed field condition to a mapping.
    ///
    /// Any other shape is first wrapped as the mapping's positional entry.
    #[must_use]
    pub fn with(self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        let entry = Entry::Field {
            key: key.into(),
            value: value.into(),
        };
        match self {
            Criteria::Mapping(mut entries) => {
                entries.push(entry);
                Criteria::Mapping(entries)
            }
            other => Criteria::Mapping(vec![Entry::from(other), entry]),
        }
    }

    /// A raw clause.
    pub fn raw(clause: impl Into<String>) -> Self {
        Criteria::Raw(clause.into())
    }

    /// Classifies a JSON criteria expression.
    ///
    /// - scalars become [`Criteria::Scalar`], except strings recognized as a
    ///   conditional clause, which become [`Criteria::Raw`]
    /// - arrays of scalars become [`Criteria::Sequence`], other arrays
    ///   [`Criteria::Group`]
    /// - objects become [`Criteria::Mapping`]; keys made only of digits are
    ///   positional entries
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        use serde_json::Value as Json;
        Ok(match value {
            Json::String(s) if is_conditional_clause(s)? => Criteria::Raw(s.clone()),
            Json::Array(items) if items.iter().all(is_json_scalar) => {
                Criteria::Sequence(items.iter().map(Value::from_json).collect())
            }
            Json::Array(items) => Criteria::Group(
                items
                    .iter()
                    .map(Criteria::from_json)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Json::Object(map) => {
                let mut entries = Vec::with_capacity(map.len());
                for (key, val) in map {
                    entries.push(Entry::from_json(key, val)?);
                }
                Criteria::Mapping(entries)
            }
            scalar => Criteria::Scalar(Value::from_json(scalar)),
        })
    }
}

impl Entry {
    fn from_json(key: &str, value: &serde_json::Value) -> Result<Self> {
        use serde_json::Value as Json;
        let positional = !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit());
        if positional {
            return Ok(match value {
                Json::String(s) => Entry::Clause(s.clone()),
                other => Entry::Nested(Criteria::from_json(other)?),
            });
        }
        let value = match value {
            Json::Array(items) if items.iter().all(is_json_scalar) => {
                FieldValue::List(items.iter().map(Value::from_json).collect())
            }
            Json::Array(_) | Json::Object(_) => {
                return Err(VellumError::InvalidExpression(format!(
                    "nested value for field key {key}"
                )));
            }
            scalar => FieldValue::Value(Value::from_json(scalar)),
        };
        Ok(Entry::Field {
            key: key.to_string(),
            value,
        })
    }
}

fn is_json_scalar(value: &serde_json::Value) -> bool {
    !matches!(value, serde_json::Value::Array(_) | serde_json::Value::Object(_))
}

impl From<Criteria> for Entry {
    fn from(value: Criteria) -> Self {
        match value {
            Criteria::Raw(clause) => Entry::Clause(clause),
            other => Entry::Nested(other),
        }
    }
}

impl TryFrom<serde_json::Value> for Criteria {
    type Error = VellumError;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        Criteria::from_json(&value)
    }
}

impl From<i64> for Criteria {
    fn from(value: i64) -> Self {
        Criteria::Scalar(Value::Integer(value))
    }
}

impl From<Value> for Criteria {
    fn from(value: Value) -> Self {
        Criteria::Scalar(value)
    }
}

/// Strings are raw clauses when they contain a conditional operator and
/// primary-key values otherwise. Strings that fail screening are kept raw so
/// the parser reports them.
impl From<&str> for Criteria {
    fn from(value: &str) -> Self {
        match is_conditional_clause(value) {
            Ok(false) => Criteria::Scalar(Value::from(value)),
            Ok(true) | Err(_) => Criteria::Raw(value.to_string()),
        }
    }
}

impl From<Vec<Value>> for Criteria {
    fn from(value: Vec<Value>) -> Self {
        Criteria::Sequence(value)
    }
}

impl<T: Into<Value>> From<T> for FieldValue {
    fn from(value: T) -> Self {
        FieldValue::Value(value.into())
    }
}

impl FieldValue {
    /// A list value, rendered literally for `IN` / `NOT IN`.
    pub fn list<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        FieldValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// A parsed mapping key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldKey {
    pub conjunction: Conjunction,
    /// Explicit table alias from a `alias.field` key.
    pub qualifier: Option<String>,
    pub field: String,
    /// Upper-cased operator, `=` when none was given.
    pub operator: String,
}

impl FieldKey {
    /// Splits `field`, `field:OP` or `CONJ:field:OP`, with an optional
    /// `alias.` prefix on the field.
    ///
    /// Escape characters and spaces around the alias are trimmed. A key with
    /// any other number of `:` segments is taken whole as the field name.
    pub fn parse(key: &str, default: Conjunction, escape_chars: (char, char)) -> Self {
        let parts: Vec<&str> = key.split(':').collect();
        let (conjunction, field, operator) = match parts.as_slice() {
            [field, op] => (default, *field, op.to_uppercase()),
            [conj, field, op] => (
                Conjunction::parse(conj).unwrap_or(default),
                *field,
                op.to_uppercase(),
            ),
            _ => (default, key, "=".to_string()),
        };
        let (qualifier, field) = match field.split_once('.') {
            Some((alias, rest)) => {
                let (open, close) = escape_chars;
                let alias = alias.trim_matches(|c| c == ' ' || c == open || c == close);
                let rest = rest.split('.').next().unwrap_or(rest);
                (Some(alias.to_string()), rest.to_string())
            }
            None => (None, field.to_string()),
        };
        Self {
            conjunction,
            qualifier,
            field,
            operator,
        }
    }
}

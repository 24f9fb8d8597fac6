use crate::catalog::Cardinality;
use crate::condition::ConditionSet;
use crate::join::JoinKind;
use crate::sql::Sql;
use crate::value::Value;
use indexmap::IndexMap;
use vellum_types::ParamType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Command {
    #[default]
    Select,
    Update,
    Delete,
}

impl Command {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Command::Select => "SELECT",
            Command::Update => "UPDATE",
            Command::Delete => "DELETE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("select") {
            Some(Command::Select)
        } else if s.eq_ignore_ascii_case("update") {
            Some(Command::Update)
        } else if s.eq_ignore_ascii_case("delete") {
            Some(Command::Delete)
        } else {
            None
        }
    }
}

/// A table in the FROM list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub table: String,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinSpec {
    pub table: String,
    pub class: String,
    pub alias: String,
    pub kind: JoinKind,
    pub conditions: ConditionSet,
    /// Declared cardinality when the join came from a relation definition.
    pub cardinality: Option<Cardinality>,
}

/// A GROUP BY or ORDER BY term. `direction` may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub direction: String,
}

/// A value assigned by UPDATE.
#[derive(Debug, Clone, PartialEq)]
pub struct SetValue {
    pub value: Value,
    /// `None` emits the value as a raw SQL expression.
    pub param_type: Option<ParamType>,
}

/// Everything needed to render one statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuerySpec {
    pub command: Command,
    pub distinct: bool,
    pub columns: Vec<Sql>,
    /// Root table first.
    pub tables: Vec<TableRef>,
    pub joins: Vec<JoinSpec>,
    pub where_clause: ConditionSet,
    /// Set when criteria were rejected; WHERE then renders only `2=1`.
    pub rejected: bool,
    pub set: IndexMap<String, SetValue>,
    pub group_by: Vec<OrderBy>,
    pub having: ConditionSet,
    pub order_by: Vec<OrderBy>,
    /// 0 means no limit.
    pub limit: u64,
    pub offset: u64,
}

impl QuerySpec {
    pub fn root(&self) -> Option<&TableRef> {
        self.tables.first()
    }

    pub fn is_grouped(&self) -> bool {
        !self.group_by.is_empty() || !self.having.is_empty()
    }
}

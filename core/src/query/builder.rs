//! The mutable query builder.
//!
//! [`Query`] accumulates a [`QuerySpec`] through chained `&mut self` calls.
//! Compilation works on a [`snapshot`](Query::snapshot), so the builder can
//! keep changing after a query has been rendered.

use super::graph::GraphSpec;
use super::spec::{Command, JoinSpec, OrderBy, QuerySpec, SetValue, TableRef};
use crate::catalog::{Catalog, ClassMeta};
use crate::compiler::{self, CompiledQuery};
use crate::condition::{ConditionNode, ConditionSet, Conjunction};
use crate::criteria::Criteria;
use crate::error::{Result, VellumError};
use crate::guard::{is_conditional_clause, is_valid_clause};
use crate::join::JoinKind;
use crate::params::Binding;
use crate::parser::CriteriaParser;
use crate::quote::Quote;
use crate::sql::{Sql, SqlChunk};
use crate::value::Value;
use vellum_types::{Dialect, ParamType};

// =============================================================================
// Context
// =============================================================================

/// What a query needs from its surroundings: metadata, the target dialect and
/// the literal quoter used for `IN` lists.
///
/// Without an explicit quoter the dialect's own quoting is used.
#[derive(Clone, Copy)]
pub struct Context<'c> {
    catalog: &'c dyn Catalog,
    dialect: Dialect,
    quoter: Option<&'c dyn Quote>,
}

impl<'c> Context<'c> {
    pub fn new(catalog: &'c dyn Catalog, dialect: Dialect) -> Self {
        Self {
            catalog,
            dialect,
            quoter: None,
        }
    }

    #[must_use]
    pub fn with_quoter(mut self, quoter: &'c dyn Quote) -> Self {
        self.quoter = Some(quoter);
        self
    }

    #[inline]
    pub fn catalog(&self) -> &'c dyn Catalog {
        self.catalog
    }

    #[inline]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn quoter(&self) -> &dyn Quote {
        match self.quoter {
            Some(quoter) => quoter,
            None => &self.dialect,
        }
    }
}

impl core::fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Context")
            .field("dialect", &self.dialect)
            .field("quoter", &self.quoter.is_some())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Query
// =============================================================================

/// Where parsed conditions are appended.
#[derive(Debug, Clone, Copy)]
enum Target {
    Where,
    Having,
    Join(usize),
}

/// A query against one root class.
#[derive(Debug, Clone)]
pub struct Query<'c> {
    ctx: Context<'c>,
    class: String,
    meta: &'c ClassMeta,
    table: String,
    alias: String,
    graph: GraphSpec,
    spec: QuerySpec,
}

impl<'c> Query<'c> {
    /// Starts a SELECT on `class`, optionally filtered by `criteria`.
    ///
    /// Fails with [`VellumError::UnknownClass`] when the catalog does not know
    /// the class and [`VellumError::CompilationFailure`] when it has no table.
    pub fn new(ctx: Context<'c>, class: &str, criteria: Option<Criteria>) -> Result<Self> {
        let meta = ctx
            .catalog()
            .class_meta(class)
            .ok_or_else(|| VellumError::UnknownClass(class.to_string()))?;
        let table = meta.table.clone().ok_or_else(|| {
            VellumError::CompilationFailure(format!("class {class} has no table"))
        })?;
        let mut query = Self {
            ctx,
            class: class.to_string(),
            meta,
            table,
            alias: meta.alias().to_string(),
            graph: GraphSpec::new(),
            spec: QuerySpec::default(),
        };
        if let Some(criteria) = criteria {
            query.where_(criteria);
        }
        Ok(query)
    }

    // ==================== accessors ====================

    #[inline]
    pub fn context(&self) -> Context<'c> {
        self.ctx
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn meta(&self) -> &'c ClassMeta {
        self.meta
    }

    /// The root table, prefix applied.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The active alias of the root table.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn graph(&self) -> &GraphSpec {
        &self.graph
    }

    pub fn command_kind(&self) -> Command {
        self.spec.command
    }

    pub(crate) fn set_graph(&mut self, graph: GraphSpec) {
        self.graph = graph;
    }

    pub(crate) fn push_join(&mut self, join: JoinSpec) {
        self.spec.joins.push(join);
    }

    // ==================== statement shape ====================

    /// Switches the statement kind. UPDATE and DELETE address the root table
    /// by its name, so the active alias becomes the table name and columns
    /// already qualified with the old alias are renamed to match.
    pub fn command(&mut self, command: Command) -> &mut Self {
        self.spec.command = command;
        if matches!(command, Command::Update | Command::Delete) && self.alias != self.table {
            let old = std::mem::replace(&mut self.alias, self.table.clone());
            self.spec.where_clause.requalify(&old, &self.alias);
            self.spec.having.requalify(&old, &self.alias);
            for join in &mut self.spec.joins {
                join.conditions.requalify(&old, &self.alias);
            }
        }
        self
    }

    pub fn set_class_alias(&mut self, alias: &str) -> &mut Self {
        self.alias = alias.to_string();
        self
    }

    /// Sets DISTINCT, or toggles it when `on` is `None`.
    pub fn distinct(&mut self, on: Option<bool>) -> &mut Self {
        self.spec.distinct = on.unwrap_or(!self.spec.distinct);
        self
    }

    /// Adds columns from a comma-separated list.
    ///
    /// `*`, `alias.*` and the escaped `alias.*` expand to every field of the
    /// root class, labelled `alias_field`. Columns failing injection
    /// screening are dropped.
    pub fn select(&mut self, columns: &str) -> &mut Self {
        let columns = columns.trim();
        if self.is_root_wildcard(columns) {
            let prefix = format!("{}_", self.alias);
            let expanded = self
                .ctx
                .catalog()
                .select_columns(&self.class, &self.alias, &prefix, &[], false);
            self.spec.columns.extend(expanded);
            return self;
        }
        for column in columns.split(',').map(str::trim).filter(|c| !c.is_empty()) {
            if is_valid_clause(column) {
                self.spec.columns.push(Sql::raw(column));
            } else {
                crate::vellum_error!(column = %column, "vellum.select_column_rejected");
            }
        }
        self
    }

    /// Adds pre-built column expressions.
    pub fn select_sql(&mut self, columns: impl IntoIterator<Item = Sql>) -> &mut Self {
        self.spec.columns.extend(columns);
        self
    }

    fn is_root_wildcard(&self, columns: &str) -> bool {
        columns == "*"
            || columns.strip_suffix(".*").is_some_and(|qualifier| {
                qualifier == self.alias || qualifier == self.ctx.dialect().escape_ident(&self.alias)
            })
    }

    /// Adds another table to the FROM list.
    ///
    /// The alias defaults to the class name. Classes without a table are
    /// logged and ignored.
    pub fn from(&mut self, class: &str, alias: Option<&str>) -> &mut Self {
        match self.ctx.catalog().table_name(class) {
            Some(table) => self.spec.tables.push(TableRef {
                table: table.to_string(),
                alias: alias.filter(|a| !a.is_empty()).unwrap_or(class).to_string(),
            }),
            None => {
                crate::vellum_warn!(class = %class, "vellum.from_class_unknown");
            }
        }
        self
    }

    /// Assigns UPDATE values.
    ///
    /// Keys are resolved through field aliases and unknown fields are skipped.
    /// Null binds as NULL, non-quotable fields as integers. A string holding
    /// an expression, recognized by a `(` or a conditional operator, is
    /// emitted raw when it passes screening; every other value binds as a
    /// string.
    pub fn set<K, V, I>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (key, value) in values {
            let key = key.as_ref();
            let Some(field) = self.meta.resolve_field(key) else {
                crate::vellum_debug!(class = %self.class, field = %key, "vellum.set_field_skipped");
                continue;
            };
            let Some(field_meta) = self.meta.fields.get(field) else {
                continue;
            };
            let value = value.into();
            let param_type = match &value {
                Value::Null => Some(ParamType::Null),
                _ if !field_meta.is_quotable() => Some(ParamType::Int),
                Value::Text(text) if looks_like_expression(text) => None,
                _ => Some(ParamType::Str),
            };
            self.spec.set.insert(field.to_string(), SetValue { value, param_type });
        }
        self
    }

    // ==================== joins ====================

    /// Joins `target`, a class name or a relation alias of the root class.
    ///
    /// `alias` defaults to `target`. Without `conditions` the predicate comes
    /// from the root's relation named `alias`; when there is none the join
    /// is added without a predicate and a warning is logged.
    pub fn join(
        &mut self,
        target: &str,
        alias: Option<&str>,
        kind: JoinKind,
        conditions: Option<Criteria>,
        conjunction: Conjunction,
        cond_group: usize,
    ) -> &mut Self {
        let catalog = self.ctx.catalog();
        let alias = alias.filter(|a| !a.is_empty()).unwrap_or(target).to_string();
        let class = if catalog.has_class(target) {
            target.to_string()
        } else if let Some(relation) = catalog.relation(&self.class, target) {
            relation.class.clone()
        } else {
            crate::vellum_warn!(target = %target, "vellum.join_class_unknown");
            return self;
        };
        let Some(table) = catalog.table_name(&class) else {
            crate::vellum_warn!(class = %class, "vellum.join_class_has_no_table");
            return self;
        };

        let index = self.spec.joins.len();
        let mut join = JoinSpec {
            table: table.to_string(),
            class: class.clone(),
            alias: alias.clone(),
            kind,
            conditions: ConditionSet::new(),
            cardinality: None,
        };

        if conditions.is_none() {
            let related = catalog.class_meta(&class);
            match (catalog.relation(&self.class, &alias), related) {
                (Some(relation), Some(related)) => {
                    join.cardinality = Some(relation.cardinality);
                    match super::graph::relation_predicate(self.meta, &self.alias, &alias, relation, related) {
                        Ok(predicate) => join.conditions.push(cond_group, predicate),
                        Err(err) => self.fail_closed(&err),
                    }
                }
                _ if kind.is_natural() || kind == JoinKind::Cross => {}
                _ => {
                    crate::vellum_warn!(
                        error = %VellumError::UnresolvedRelation {
                            class: self.class.clone(),
                            alias: alias.clone(),
                        },
                        "vellum.join_without_predicate"
                    );
                }
            }
        }
        self.spec.joins.push(join);

        if let Some(criteria) = conditions {
            self.push_condition(Target::Join(index), &criteria, conjunction, cond_group);
        }
        self
    }

    /// `JOIN` using the relation predicate.
    pub fn inner_join(&mut self, target: &str, alias: Option<&str>) -> &mut Self {
        self.join(target, alias, JoinKind::Inner, None, Conjunction::And, 0)
    }

    /// `LEFT JOIN` using the relation predicate.
    pub fn left_join(&mut self, target: &str, alias: Option<&str>) -> &mut Self {
        self.join(target, alias, JoinKind::Left, None, Conjunction::And, 0)
    }

    /// `RIGHT JOIN` using the relation predicate.
    pub fn right_join(&mut self, target: &str, alias: Option<&str>) -> &mut Self {
        self.join(target, alias, JoinKind::Right, None, Conjunction::And, 0)
    }

    // ==================== conditions ====================

    /// ANDs `criteria` into WHERE group 0.
    pub fn where_(&mut self, criteria: impl Into<Criteria>) -> &mut Self {
        self.condition(criteria, Conjunction::And, 0)
    }

    /// Appends `criteria` to WHERE group `cond_group`, joined by `conjunction`.
    ///
    /// Criteria that fail to parse or screen are logged and mark the query
    /// rejected: its WHERE renders only the always-false `2=1`, whatever other
    /// conditions are added before or after.
    pub fn condition(&mut self, criteria: impl Into<Criteria>, conjunction: Conjunction, cond_group: usize) -> &mut Self {
        let criteria = criteria.into();
        self.push_condition(Target::Where, &criteria, conjunction, cond_group);
        self
    }

    pub fn and_condition(&mut self, criteria: impl Into<Criteria>, cond_group: usize) -> &mut Self {
        self.condition(criteria, Conjunction::And, cond_group)
    }

    pub fn or_condition(&mut self, criteria: impl Into<Criteria>, cond_group: usize) -> &mut Self {
        self.condition(criteria, Conjunction::Or, cond_group)
    }

    /// [`where_`](Self::where_) for criteria in JSON form.
    pub fn where_json(&mut self, criteria: &serde_json::Value) -> &mut Self {
        match Criteria::from_json(criteria) {
            Ok(criteria) => self.where_(criteria),
            Err(err) => {
                self.fail_closed(&err);
                self
            }
        }
    }

    /// Adds HAVING criteria, failing closed like [`condition`](Self::condition).
    pub fn having(&mut self, criteria: impl Into<Criteria>) -> &mut Self {
        let criteria = criteria.into();
        self.push_condition(Target::Having, &criteria, Conjunction::And, 0);
        self
    }

    /// Parses `criteria` without the fail-closed fallback.
    pub fn parse_conditions(&self, criteria: &Criteria, conjunction: Conjunction) -> Result<ConditionNode> {
        CriteriaParser::new(self.meta, &self.alias, self.ctx.dialect(), self.ctx.quoter())
            .parse(criteria, conjunction)
    }

    fn push_condition(&mut self, target: Target, criteria: &Criteria, conjunction: Conjunction, cond_group: usize) {
        match self.parse_conditions(criteria, conjunction) {
            Ok(node) => {
                let set = match target {
                    Target::Where => &mut self.spec.where_clause,
                    Target::Having => &mut self.spec.having,
                    Target::Join(index) => match self.spec.joins.get_mut(index) {
                        Some(join) => &mut join.conditions,
                        None => return,
                    },
                };
                set.push(cond_group, node);
            }
            Err(err) => self.fail_closed(&err),
        }
    }

    /// Logs `err` and marks the query rejected, so WHERE matches nothing
    /// whatever else it holds.
    pub(crate) fn fail_closed(&mut self, err: &VellumError) {
        if err.is_fail_closed() {
            crate::vellum_error!(class = %self.class, error = %err, "vellum.condition_rejected");
        } else {
            crate::vellum_warn!(class = %self.class, error = %err, "vellum.condition_rejected");
        }
        self.spec.rejected = true;
    }

    // ==================== ordering and paging ====================

    /// Adds an ORDER BY term.
    ///
    /// Directions other than ASC, DESC, ASCENDING and DESCENDING are dropped.
    /// A column failing injection screening is logged and ignored.
    pub fn sort_by(&mut self, column: &str, direction: &str) -> &mut Self {
        if let Some(term) = order_term(column, direction) {
            self.spec.order_by.push(term);
        }
        self
    }

    /// Adds a GROUP BY term, screened like [`sort_by`](Self::sort_by).
    pub fn group_by(&mut self, column: &str, direction: &str) -> &mut Self {
        if let Some(term) = order_term(column, direction) {
            self.spec.group_by.push(term);
        }
        self
    }

    /// `limit` 0 means no limit.
    pub fn limit(&mut self, limit: u64, offset: u64) -> &mut Self {
        self.spec.limit = limit;
        self.spec.offset = offset;
        self
    }

    // ==================== compilation ====================

    /// An immutable copy of the query as it would be compiled now.
    ///
    /// The root table is placed first in FROM under the active alias, and a
    /// SELECT with no columns selects every root field labelled
    /// `alias_field`.
    pub fn snapshot(&self) -> QuerySpec {
        let mut spec = self.spec.clone();
        spec.tables.insert(
            0,
            TableRef {
                table: self.table.clone(),
                alias: self.alias.clone(),
            },
        );
        if spec.command == Command::Select && spec.columns.is_empty() {
            spec.columns = self.ctx.catalog().select_columns(
                &self.class,
                &self.alias,
                &format!("{}_", self.alias),
                &[],
                false,
            );
        }
        spec
    }

    pub fn compile(&self) -> Result<CompiledQuery> {
        compiler::compile(&self.snapshot(), self.ctx.dialect())
    }

    pub fn to_sql(&self) -> Result<String> {
        Ok(self.compile()?.sql)
    }

    pub fn bindings(&self) -> Result<Vec<Binding>> {
        Ok(self.compile()?.bindings)
    }

    /// A statement counting the distinct root entities the query matches.
    ///
    /// Renders `COUNT(DISTINCT pk)` over the query, or `COUNT(*)` when the
    /// class has no primary key. Grouped queries, and compound keys outside
    /// MySQL, count the rows of `SELECT DISTINCT pk ...` wrapped as a
    /// subquery instead. ORDER BY, LIMIT and OFFSET are dropped.
    pub fn compile_count(&self) -> Result<CompiledQuery> {
        let mut spec = self.snapshot();
        spec.command = Command::Select;
        spec.order_by.clear();
        spec.limit = 0;
        spec.offset = 0;
        let pk: Vec<&str> = self.meta.primary_key.iter().map(String::as_str).collect();
        let dialect = self.ctx.dialect();
        let key_columns = self
            .ctx
            .catalog()
            .select_columns(&self.class, &self.alias, "", &pk, false);

        let wrap = spec.is_grouped() || (pk.len() > 1 && dialect != Dialect::MySQL);
        if wrap {
            spec.distinct = !spec.is_grouped();
            spec.columns = if key_columns.is_empty() {
                vec![Sql::raw("*")]
            } else {
                key_columns
            };
            let inner = compiler::compile(&spec, dialect)?;
            let compiled = CompiledQuery {
                sql: format!("SELECT COUNT(*) FROM ({}) cq", inner.sql),
                bindings: inner.bindings,
            };
            crate::vellum_trace_query!(&compiled.sql, compiled.bindings.len());
            return Ok(compiled);
        }

        spec.distinct = false;
        spec.columns = if key_columns.is_empty() {
            vec![Sql::raw("COUNT(*)")]
        } else {
            vec![
                Sql::raw("COUNT(DISTINCT ")
                    .append(Sql::join(key_columns, ", "))
                    .push(SqlChunk::raw(")")),
            ]
        };
        compiler::compile(&spec, dialect)
    }
}

/// Strings holding SQL expressions are set raw; one that fails screening is
/// bound as plain text instead.
fn looks_like_expression(text: &str) -> bool {
    let expression = text.contains('(') || matches!(is_conditional_clause(text), Ok(true));
    expression && is_valid_clause(text)
}

fn order_term(column: &str, direction: &str) -> Option<OrderBy> {
    let column = column.trim();
    if !is_valid_clause(column) {
        crate::vellum_error!(column = %column, "vellum.order_column_rejected");
        return None;
    }
    if column.is_empty() {
        return None;
    }
    let upper = direction.trim().to_ascii_uppercase();
    let direction = match upper.as_str() {
        "ASC" | "DESC" | "ASCENDING" | "DESCENDING" => upper,
        _ => String::new(),
    };
    Some(OrderBy {
        column: column.to_string(),
        direction,
    })
}

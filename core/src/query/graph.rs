//! Relation graphs: the nested alias maps that drive eager loading.
//!
//! Binding a graph walks it depth-first, adding one LEFT JOIN and one
//! prefixed column set per resolvable relation alias.

use super::builder::Query;
use super::spec::JoinSpec;
use crate::catalog::{Catalog, ClassMeta, JoinConstraints, Relation};
use crate::condition::{ConditionNode, ConditionSet, Conjunction, Group, Leaf};
use crate::error::{Result, VellumError};
use crate::guard::validate_clause;
use crate::join::JoinKind;
use crate::params::Binding;
use crate::sql::{Sql, SqlChunk};
use core::str::FromStr;
use hashbrown::HashSet;
use indexmap::IndexMap;
use vellum_types::ParamType;

/// A relation alias mapped to the graph loaded beneath it.
///
/// An alias present with an empty nested graph still loads that relation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GraphSpec(IndexMap<String, GraphSpec>);

impl GraphSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `alias` with the nested graph `nested`.
    #[must_use]
    pub fn with(mut self, alias: &str, nested: GraphSpec) -> Self {
        self.0.insert(alias.to_string(), nested);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, alias: &str) -> Option<&GraphSpec> {
        self.0.get(alias)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &GraphSpec)> {
        self.0.iter().map(|(alias, nested)| (alias.as_str(), nested))
    }

    /// Reads `{"Orders": {"Items": {}}}`. Values that are not objects load
    /// the relation without nesting.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(map) => GraphSpec(
                map.iter()
                    .map(|(alias, nested)| (alias.clone(), GraphSpec::from_json(nested)))
                    .collect(),
            ),
            _ => GraphSpec::default(),
        }
    }

    /// Every relation reachable from `class`, up to `depth` levels.
    ///
    /// A class already on the current path is not expanded again, which
    /// keeps back-references such as `Order -> Customer -> Orders` out.
    pub fn for_class(catalog: &dyn Catalog, class: &str, depth: usize) -> Self {
        let mut path = HashSet::new();
        path.insert(class.to_string());
        Self::expand(catalog, class, depth, &mut path)
    }

    fn expand(catalog: &dyn Catalog, class: &str, depth: usize, path: &mut HashSet<String>) -> Self {
        let mut graph = GraphSpec::new();
        if depth == 0 {
            return graph;
        }
        let Some(meta) = catalog.class_meta(class) else {
            return graph;
        };
        for (alias, relation) in &meta.relations {
            if path.contains(&relation.class) {
                continue;
            }
            path.insert(relation.class.clone());
            let nested = Self::expand(catalog, &relation.class, depth - 1, path);
            path.remove(&relation.class);
            graph.0.insert(alias.clone(), nested);
        }
        graph
    }
}

impl FromStr for GraphSpec {
    type Err = VellumError;

    fn from_str(s: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(s)?;
        Ok(GraphSpec::from_json(&value))
    }
}

impl<const N: usize> From<[(&str, GraphSpec); N]> for GraphSpec {
    fn from(entries: [(&str, GraphSpec); N]) -> Self {
        GraphSpec(
            entries
                .into_iter()
                .map(|(alias, nested)| (alias.to_string(), nested))
                .collect(),
        )
    }
}

/// The join predicate for `relation`: `parent.local = related.foreign`, ANDed
/// with the relation's fixed constraints.
///
/// `local` constraints apply to the related alias and `foreign` constraints to
/// the parent alias. Raw constraint clauses are screened.
pub fn relation_predicate(
    parent: &ClassMeta,
    parent_alias: &str,
    alias: &str,
    relation: &Relation,
    related: &ClassMeta,
) -> Result<ConditionNode> {
    let mut group = Group::new(Conjunction::And);
    let key_equality = Sql::qualified(parent_alias, &relation.local)
        .push(SqlChunk::raw(" = "))
        .append(Sql::qualified(alias, &relation.foreign));
    group.push(Leaf::new(key_equality, Conjunction::And));
    push_constraints(&mut group, related, alias, &relation.criteria.local)?;
    push_constraints(&mut group, parent, parent_alias, &relation.criteria.foreign)?;
    Ok(group.into())
}

fn push_constraints(
    group: &mut Group,
    meta: &ClassMeta,
    alias: &str,
    constraints: &JoinConstraints,
) -> Result<()> {
    for (field, value) in &constraints.fields {
        let column = Sql::qualified(alias, meta.resolve_field(field).unwrap_or(field));
        let sql = if value.is_null() {
            column.push(SqlChunk::raw(" IS NULL"))
        } else {
            let param_type = match meta.fields.get(field) {
                Some(field_meta) if !field_meta.is_quotable() => ParamType::Int,
                _ => ParamType::Str,
            };
            column
                .push(SqlChunk::raw(" = "))
                .push(Binding::new(value.clone(), param_type))
        };
        group.push(Leaf::new(sql, Conjunction::And));
    }
    for clause in &constraints.clauses {
        validate_clause(clause)?;
        group.push(Leaf::literal(clause.clone(), Conjunction::And));
    }
    Ok(())
}

impl<'c> Query<'c> {
    /// Eager-loads `graph`.
    ///
    /// Selects the root's columns prefixed `alias_`, LEFT JOINs each
    /// resolvable relation under its relation alias with columns prefixed the
    /// same way, and orders by the root primary key. Aliases with no relation
    /// definition are logged and skipped along with everything below them.
    /// Binding the graph already bound is a no-op.
    pub fn bind_graph(&mut self, graph: impl Into<GraphSpec>) -> &mut Self {
        let graph = graph.into();
        if &graph == self.graph() {
            return self;
        }
        let catalog = self.context().catalog();
        let class = self.class().to_string();
        let alias = self.alias().to_string();
        self.select_sql(catalog.select_columns(&class, &alias, &format!("{alias}_"), &[], false));
        for (relation_alias, nested) in graph.iter() {
            self.bind_graph_node(&class, &alias, relation_alias, nested);
        }
        let dialect = self.context().dialect();
        for key in catalog.primary_key(&class) {
            self.sort_by(&dialect.escape_qualified(&alias, key), "ASC");
        }
        self.set_graph(graph);
        self
    }

    /// Binds a graph given as JSON text. Unparseable text binds nothing.
    pub fn bind_graph_json(&mut self, json: &str) -> &mut Self {
        match json.parse::<GraphSpec>() {
            Ok(graph) => self.bind_graph(graph),
            Err(err) => {
                crate::vellum_error!(error = %err, "vellum.invalid_graph");
                self
            }
        }
    }

    fn bind_graph_node(&mut self, parent_class: &str, parent_alias: &str, alias: &str, nested: &GraphSpec) {
        let catalog = self.context().catalog();
        let Some(relation) = catalog.relation(parent_class, alias) else {
            crate::vellum_warn!(
                error = %VellumError::UnresolvedRelation {
                    class: parent_class.to_string(),
                    alias: alias.to_string(),
                },
                "vellum.graph_relation_skipped"
            );
            return;
        };
        let (Some(parent), Some(related)) = (catalog.class_meta(parent_class), catalog.class_meta(&relation.class)) else {
            crate::vellum_warn!(class = %relation.class, alias = %alias, "vellum.graph_class_unknown");
            return;
        };
        let Some(table) = related.table.clone() else {
            crate::vellum_warn!(class = %relation.class, alias = %alias, "vellum.graph_class_has_no_table");
            return;
        };

        self.select_sql(catalog.select_columns(&relation.class, alias, &format!("{alias}_"), &[], false));
        let mut conditions = ConditionSet::new();
        match relation_predicate(parent, parent_alias, alias, relation, related) {
            Ok(predicate) => conditions.push(0, predicate),
            Err(err) => self.fail_closed(&err),
        }
        self.push_join(JoinSpec {
            table,
            class: relation.class.clone(),
            alias: alias.to_string(),
            kind: JoinKind::Left,
            conditions,
            cardinality: Some(relation.cardinality),
        });
        for (child_alias, child_nested) in nested.iter() {
            self.bind_graph_node(&relation.class, alias, child_alias, child_nested);
        }
    }
}

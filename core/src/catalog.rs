//! Model metadata consumed by the builder, binder and hydrator.
//!
//! [`Catalog`] is the read-only lookup contract. [`ModelMap`] is the bundled
//! implementation, built from per-class [`ClassDef`]s that can be written in
//! code or loaded from a JSON map file.

use crate::error::{Result, VellumError};
use crate::sql::Sql;
use crate::value::Value;
use hashbrown::{HashMap, HashSet};
use indexmap::IndexMap;
use serde::Deserialize;
use vellum_types::FieldType;

// =============================================================================
// Metadata types
// =============================================================================

/// Metadata for one field of a class.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct FieldMeta {
    /// Declared type; derived from `dbtype` when absent.
    #[serde(default, rename = "type", alias = "phptype")]
    pub field_type: Option<FieldType>,
    #[serde(default)]
    pub dbtype: Option<String>,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    /// `"pk"` marks a primary-key component.
    #[serde(default)]
    pub index: Option<String>,
    #[serde(default)]
    pub default: Option<Value>,
}

fn default_nullable() -> bool {
    true
}

impl FieldMeta {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type: Some(field_type),
            nullable: true,
            ..Self::default()
        }
    }

    /// A non-null primary-key field.
    pub fn pk(field_type: FieldType) -> Self {
        Self {
            field_type: Some(field_type),
            nullable: false,
            index: Some("pk".into()),
            ..Self::default()
        }
    }

    /// A field typed from its database column type.
    pub fn from_db_type(dbtype: &str) -> Self {
        Self {
            field_type: Some(FieldType::from_db_type(dbtype)),
            dbtype: Some(dbtype.to_string()),
            nullable: true,
            ..Self::default()
        }
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
            .or_else(|| self.dbtype.as_deref().map(FieldType::from_db_type))
            .unwrap_or_default()
    }

    #[inline]
    pub fn is_quotable(&self) -> bool {
        self.field_type().is_quotable()
    }

    pub fn is_pk(&self) -> bool {
        self.index.as_deref() == Some("pk")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    #[default]
    One,
    Many,
}

/// Which side of the relation holds the key the other side refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Owner {
    #[default]
    Local,
    Foreign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    #[default]
    Aggregate,
    Composite,
}

/// Fixed constraints one side of a relation adds to its join predicate.
///
/// In a map file this is an object: named keys are `field => value`
/// equalities, numeric keys are raw clauses.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(from = "IndexMap<String, serde_json::Value>")]
pub struct JoinConstraints {
    pub fields: IndexMap<String, Value>,
    pub clauses: Vec<String>,
}

impl JoinConstraints {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.clauses.is_empty()
    }
}

impl From<IndexMap<String, serde_json::Value>> for JoinConstraints {
    fn from(map: IndexMap<String, serde_json::Value>) -> Self {
        let mut out = JoinConstraints::default();
        for (key, value) in map {
            if key.bytes().all(|b| b.is_ascii_digit()) {
                out.clauses.push(match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                });
            } else {
                out.fields.insert(key, Value::from_json(&value));
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct JoinCriteria {
    /// Applied to the related (joined) alias.
    #[serde(default)]
    pub local: JoinConstraints,
    /// Applied to the parent alias.
    #[serde(default)]
    pub foreign: JoinConstraints,
}

/// A foreign-key relation definition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Relation {
    /// Related class.
    pub class: String,
    /// Column on the parent side.
    pub local: String,
    /// Column on the related side.
    pub foreign: String,
    #[serde(default)]
    pub cardinality: Cardinality,
    #[serde(default)]
    pub owner: Owner,
    /// Set from the section of the class definition the relation came from.
    #[serde(skip)]
    pub kind: RelationKind,
    #[serde(default)]
    pub criteria: JoinCriteria,
}

impl Relation {
    pub fn new(class: &str, local: &str, foreign: &str, cardinality: Cardinality) -> Self {
        Self {
            class: class.to_string(),
            local: local.to_string(),
            foreign: foreign.to_string(),
            cardinality,
            owner: match cardinality {
                Cardinality::Many => Owner::Local,
                Cardinality::One => Owner::Foreign,
            },
            kind: RelationKind::Aggregate,
            criteria: JoinCriteria::default(),
        }
    }

    /// A to-one relation.
    pub fn one(class: &str, local: &str, foreign: &str) -> Self {
        Self::new(class, local, foreign, Cardinality::One)
    }

    /// A to-many relation.
    pub fn many(class: &str, local: &str, foreign: &str) -> Self {
        Self::new(class, local, foreign, Cardinality::Many)
    }

    /// Adds a fixed `field = value` constraint on the related side.
    #[must_use]
    pub fn local_criteria(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.criteria.local.fields.insert(field.to_string(), value.into());
        self
    }

    /// Adds a fixed `field = value` constraint on the parent side.
    #[must_use]
    pub fn foreign_criteria(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.criteria.foreign.fields.insert(field.to_string(), value.into());
        self
    }

    #[inline]
    pub fn is_many(&self) -> bool {
        self.cardinality == Cardinality::Many
    }
}

/// Fully resolved metadata for one class, ancestry already merged in.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassMeta {
    pub class: String,
    /// Prefixed table name; `None` for abstract classes.
    pub table: Option<String>,
    /// The class followed by its ancestors, nearest first.
    pub ancestry: Vec<String>,
    pub fields: IndexMap<String, FieldMeta>,
    pub aliases: IndexMap<String, String>,
    pub primary_key: Vec<String>,
    pub relations: IndexMap<String, Relation>,
}

impl ClassMeta {
    /// Default query alias: the class name without any namespace.
    pub fn alias(&self) -> &str {
        short_name(&self.class)
    }

    /// Type of a single-column primary key.
    pub fn primary_key_type(&self) -> Option<FieldType> {
        match self.primary_key.as_slice() {
            [pk] => self.fields.get(pk).map(FieldMeta::field_type),
            _ => None,
        }
    }

    /// Canonical field name for a field or field alias.
    pub fn resolve_field<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if self.fields.contains_key(name) {
            Some(name)
        } else {
            self.aliases.get(name).map(String::as_str)
        }
    }
}

/// Strips a `\` or `::` namespace from a class name.
pub fn short_name(class: &str) -> &str {
    let tail = class.rsplit('\\').next().unwrap_or(class);
    tail.rsplit("::").next().unwrap_or(tail)
}

// =============================================================================
// Catalog contract
// =============================================================================

/// Read-only metadata lookup.
///
/// Implementors provide [`class_meta`](Catalog::class_meta); every other
/// lookup is derived from it.
pub trait Catalog: Send + Sync {
    fn class_meta(&self, class: &str) -> Option<&ClassMeta>;

    fn has_class(&self, class: &str) -> bool {
        self.class_meta(class).is_some()
    }

    fn table_name(&self, class: &str) -> Option<&str> {
        self.class_meta(class)?.table.as_deref()
    }

    fn field_meta(&self, class: &str) -> Option<&IndexMap<String, FieldMeta>> {
        self.class_meta(class).map(|meta| &meta.fields)
    }

    fn field_aliases(&self, class: &str) -> Option<&IndexMap<String, String>> {
        self.class_meta(class).map(|meta| &meta.aliases)
    }

    /// Primary-key fields in declaration order; empty when none is defined.
    fn primary_key(&self, class: &str) -> &[String] {
        self.class_meta(class)
            .map(|meta| meta.primary_key.as_slice())
            .unwrap_or_default()
    }

    fn primary_key_type(&self, class: &str) -> Option<FieldType> {
        self.class_meta(class)?.primary_key_type()
    }

    /// The foreign-key definition for `alias` on `class`.
    fn relation(&self, class: &str, alias: &str) -> Option<&Relation> {
        self.class_meta(class)?.relations.get(alias)
    }

    fn ancestry(&self, class: &str) -> Vec<String> {
        self.class_meta(class)
            .map(|meta| meta.ancestry.clone())
            .unwrap_or_default()
    }

    /// Column expressions for selecting `class`'s fields.
    ///
    /// Each renders `table_alias.col AS prefix_col`; the qualifier is omitted
    /// when `table_alias` is empty and the `AS` when `column_prefix` is.
    /// A non-empty `columns` keeps only those fields, or drops them when
    /// `exclude` is set.
    fn select_columns(
        &self,
        class: &str,
        table_alias: &str,
        column_prefix: &str,
        columns: &[&str],
        exclude: bool,
    ) -> Vec<Sql> {
        let Some(meta) = self.class_meta(class) else {
            return Vec::new();
        };
        meta.fields
            .keys()
            .filter(|field| columns.is_empty() || columns.contains(&field.as_str()) != exclude)
            .map(|field| {
                let mut sql = if table_alias.is_empty() {
                    Sql::ident(field.as_str())
                } else {
                    Sql::qualified(table_alias, field)
                };
                if !column_prefix.is_empty() {
                    sql = sql
                        .push(crate::sql::SqlChunk::raw(" AS "))
                        .push(crate::sql::SqlChunk::ident(format!("{column_prefix}{field}")));
                }
                sql
            })
            .collect()
    }
}

// =============================================================================
// ModelMap
// =============================================================================

/// Declaration of one class, before ancestry is merged.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ClassDef {
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub extends: Option<String>,
    #[serde(default, alias = "fieldMeta")]
    pub fields: IndexMap<String, FieldMeta>,
    #[serde(default, alias = "fieldAliases")]
    pub aliases: IndexMap<String, String>,
    #[serde(default)]
    pub aggregates: IndexMap<String, Relation>,
    #[serde(default)]
    pub composites: IndexMap<String, Relation>,
}

impl ClassDef {
    pub fn new(table: &str) -> Self {
        Self {
            table: Some(table.to_string()),
            ..Self::default()
        }
    }

    /// A class without a table of its own.
    pub fn abstract_class() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn extends(mut self, parent: &str) -> Self {
        self.extends = Some(parent.to_string());
        self
    }

    #[must_use]
    pub fn field(mut self, name: &str, meta: FieldMeta) -> Self {
        self.fields.insert(name.to_string(), meta);
        self
    }

    #[must_use]
    pub fn alias(mut self, alias: &str, field: &str) -> Self {
        self.aliases.insert(alias.to_string(), field.to_string());
        self
    }

    #[must_use]
    pub fn aggregate(mut self, alias: &str, relation: Relation) -> Self {
        self.aggregates.insert(alias.to_string(), relation);
        self
    }

    #[must_use]
    pub fn composite(mut self, alias: &str, relation: Relation) -> Self {
        self.composites.insert(alias.to_string(), relation);
        self
    }
}

/// In-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct ModelMap {
    classes: HashMap<String, ClassMeta>,
}

impl ModelMap {
    pub fn builder() -> ModelMapBuilder {
        ModelMapBuilder::default()
    }

    /// Loads a JSON object of `class => definition`.
    pub fn from_json(json: &str, table_prefix: &str) -> Result<Self> {
        let defs: IndexMap<String, ClassDef> = serde_json::from_str(json)?;
        let mut builder = ModelMap::builder().table_prefix(table_prefix);
        for (class, def) in defs {
            builder = builder.class(&class, def);
        }
        builder.build()
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }
}

impl Catalog for ModelMap {
    fn class_meta(&self, class: &str) -> Option<&ClassMeta> {
        self.classes.get(class)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModelMapBuilder {
    defs: IndexMap<String, ClassDef>,
    table_prefix: String,
}

impl ModelMapBuilder {
    #[must_use]
    pub fn class(mut self, name: &str, def: ClassDef) -> Self {
        self.defs.insert(name.to_string(), def);
        self
    }

    #[must_use]
    pub fn table_prefix(mut self, prefix: &str) -> Self {
        self.table_prefix = prefix.to_string();
        self
    }

    /// Resolves every class against its ancestry.
    ///
    /// Fields, aliases and relations are merged from the root ancestor down,
    /// so a class overrides what it inherits. Composites override aggregates
    /// of the same alias.
    pub fn build(self) -> Result<ModelMap> {
        let mut classes = HashMap::with_capacity(self.defs.len());
        for name in self.defs.keys() {
            let ancestry = self.ancestry_of(name)?;
            let mut meta = ClassMeta {
                class: name.clone(),
                ancestry: ancestry.clone(),
                ..ClassMeta::default()
            };
            for class in ancestry.iter().rev() {
                let Some(def) = self.defs.get(class) else {
                    continue;
                };
                for (field, field_meta) in &def.fields {
                    let mut field_meta = field_meta.clone();
                    field_meta.field_type = Some(field_meta.field_type());
                    meta.fields.insert(field.clone(), field_meta);
                }
                meta.aliases.extend(def.aliases.clone());
                for (alias, relation) in &def.aggregates {
                    let mut relation = relation.clone();
                    relation.kind = RelationKind::Aggregate;
                    meta.relations.insert(alias.clone(), relation);
                }
                for (alias, relation) in &def.composites {
                    let mut relation = relation.clone();
                    relation.kind = RelationKind::Composite;
                    meta.relations.insert(alias.clone(), relation);
                }
            }
            meta.table = ancestry
                .iter()
                .find_map(|class| self.defs.get(class).and_then(|def| def.table.as_deref()))
                .map(|table| format!("{}{}", self.table_prefix, table));
            meta.primary_key = meta
                .fields
                .iter()
                .filter(|(_, field_meta)| field_meta.is_pk())
                .map(|(field, _)| field.clone())
                .collect();
            classes.insert(name.clone(), meta);
        }
        Ok(ModelMap { classes })
    }

    fn ancestry_of(&self, class: &str) -> Result<Vec<String>> {
        let mut ancestry = vec![class.to_string()];
        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(class);
        let mut current = class;
        while let Some(parent) = self.defs.get(current).and_then(|def| def.extends.as_deref()) {
            if !self.defs.contains_key(parent) {
                return Err(VellumError::Metadata(format!(
                    "class {current} extends unknown class {parent}"
                )));
            }
            if !seen.insert(parent) {
                return Err(VellumError::Metadata(format!(
                    "inheritance cycle through class {parent}"
                )));
            }
            ancestry.push(parent.to_string());
            current = parent;
        }
        Ok(ancestry)
    }
}

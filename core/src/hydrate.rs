//! Graph hydration: flat joined rows back into nested entities.
//!
//! A [`Hydrator`] resolves its graph once, against the catalog and the
//! [`FactoryRegistry`], into a plan of relation nodes. Each row then creates
//! or reuses its root entity by primary key and attaches the related
//! entities found in the row's `alias_column` labels.

use crate::catalog::{Catalog, ClassMeta, Relation};
use crate::error::{Result, VellumError};
use crate::query::{GraphSpec, Query};
use crate::value::{Row, Value};
use hashbrown::HashMap;
use indexmap::IndexMap;
use serde::Serialize;

/// Separator between components of a compound primary key.
pub const KEY_SEPARATOR: char = '-';

/// Escapes [`KEY_SEPARATOR`] and `\` inside key components.
const KEY_ESCAPE: char = '\\';

// =============================================================================
// Entity contract
// =============================================================================

/// The slice of a row that describes one entity.
#[derive(Debug, Clone, Copy)]
pub struct EntitySource<'r> {
    alias: &'r str,
    meta: &'r ClassMeta,
    row: &'r Row,
    bare_columns: bool,
}

impl<'r> EntitySource<'r> {
    /// An entity labelled `alias_field` in `row`. Root entities also accept
    /// unprefixed labels.
    pub fn new(alias: &'r str, meta: &'r ClassMeta, row: &'r Row, bare_columns: bool) -> Self {
        Self {
            alias,
            meta,
            row,
            bare_columns,
        }
    }

    pub fn class(&self) -> &'r str {
        &self.meta.class
    }

    pub fn alias(&self) -> &'r str {
        self.alias
    }

    pub fn meta(&self) -> &'r ClassMeta {
        self.meta
    }

    pub fn row(&self) -> &'r Row {
        self.row
    }

    /// The value of `field`, if the row carries it.
    pub fn get(&self, field: &str) -> Option<&'r Value> {
        let prefixed = self.row.get(&format!("{}_{field}", self.alias));
        match prefixed {
            Some(value) => Some(value),
            None if self.bare_columns => self.row.get(field),
            None => None,
        }
    }

    /// The class's fields present in the row, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&'r str, &'r Value)> + '_ {
        self.meta
            .fields
            .keys()
            .filter_map(|field| self.get(field).map(|value| (field.as_str(), value)))
    }

    /// The primary key as a string, components joined by [`KEY_SEPARATOR`].
    ///
    /// In a compound key a separator or `\` inside a component is escaped
    /// with `\`, so distinct keys never collide. `None` when the class has no
    /// key or any component is missing or null.
    pub fn primary_key(&self) -> Option<String> {
        match self.meta.primary_key.as_slice() {
            [] => return None,
            [field] => return self.get(field).and_then(Value::to_key_string),
            _ => {}
        }
        let mut key = String::new();
        for (i, field) in self.meta.primary_key.iter().enumerate() {
            let part = self.get(field).and_then(Value::to_key_string)?;
            if i > 0 {
                key.push(KEY_SEPARATOR);
            }
            for ch in part.chars() {
                if ch == KEY_SEPARATOR || ch == KEY_ESCAPE {
                    key.push(KEY_ESCAPE);
                }
                key.push(ch);
            }
        }
        Some(key)
    }
}

/// What the hydrator needs from an entity type.
pub trait Entity: Sized {
    /// Default construction for classes without a registered factory.
    fn from_source(source: &EntitySource<'_>) -> Option<Self>;

    fn primary_key(&self) -> Option<String>;

    /// Sets the to-one relation `alias`, replacing any previous value.
    fn attach_one(&mut self, alias: &str, related: Self);

    /// Appends to the to-many relation `alias`.
    fn attach_many(&mut self, alias: &str, related: Self);

    /// The entity attached under `alias` whose key is `key`, or the most
    /// recently attached one when `key` is `None`.
    fn related_mut(&mut self, alias: &str, key: Option<&str>) -> Option<&mut Self>;
}

/// Builds entities of one class from a row.
pub trait EntityFactory<E>: Send + Sync {
    fn create(&self, source: &EntitySource<'_>) -> Option<E>;
}

impl<E, F> EntityFactory<E> for F
where
    F: Fn(&EntitySource<'_>) -> Option<E> + Send + Sync,
{
    fn create(&self, source: &EntitySource<'_>) -> Option<E> {
        self(source)
    }
}

/// Factories keyed by class.
pub struct FactoryRegistry<E> {
    factories: HashMap<String, Box<dyn EntityFactory<E>>>,
}

impl<E> Default for FactoryRegistry<E> {
    fn default() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }
}

impl<E> FactoryRegistry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, class: &str, factory: impl EntityFactory<E> + 'static) -> Self {
        self.register(class, factory);
        self
    }

    pub fn register(&mut self, class: &str, factory: impl EntityFactory<E> + 'static) {
        self.factories.insert(class.to_string(), Box::new(factory));
    }

    pub fn get(&self, class: &str) -> Option<&dyn EntityFactory<E>> {
        self.factories.get(class).map(|factory| factory.as_ref())
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl<E> core::fmt::Debug for FactoryRegistry<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

// =============================================================================
// Record
// =============================================================================

/// Dynamic entity: field values plus attached relations.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Record {
    class: String,
    key: Option<String>,
    fields: IndexMap<String, Value>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    one: IndexMap<String, Record>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    many: IndexMap<String, Vec<Record>>,
    /// Position of each keyed entry in `many`, per alias.
    #[serde(skip)]
    many_index: HashMap<String, HashMap<String, usize>>,
}

impl Record {
    pub fn from_source(source: &EntitySource<'_>) -> Self {
        Self {
            class: source.class().to_string(),
            key: source.primary_key(),
            fields: source
                .fields()
                .map(|(field, value)| (field.to_string(), value.clone()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> &IndexMap<String, Value> {
        &self.fields
    }

    pub fn one(&self, alias: &str) -> Option<&Record> {
        self.one.get(alias)
    }

    pub fn many(&self, alias: &str) -> &[Record] {
        self.many.get(alias).map(Vec::as_slice).unwrap_or_default()
    }
}

impl Entity for Record {
    fn from_source(source: &EntitySource<'_>) -> Option<Self> {
        Some(Record::from_source(source))
    }

    fn primary_key(&self) -> Option<String> {
        self.key.clone()
    }

    fn attach_one(&mut self, alias: &str, related: Self) {
        self.one.insert(alias.to_string(), related);
    }

    fn attach_many(&mut self, alias: &str, related: Self) {
        let list = self.many.entry(alias.to_string()).or_default();
        if let Some(key) = &related.key {
            self.many_index
                .entry_ref(alias)
                .or_default()
                .entry_ref(key.as_str())
                .or_insert(list.len());
        }
        list.push(related);
    }

    fn related_mut(&mut self, alias: &str, key: Option<&str>) -> Option<&mut Self> {
        if let Some(one) = self.one.get_mut(alias) {
            return (key.is_none() || one.key.as_deref() == key).then_some(one);
        }
        let list = self.many.get_mut(alias)?;
        match key {
            Some(key) => {
                let index = *self.many_index.get(alias)?.get(key)?;
                list.get_mut(index)
            }
            None => list.last_mut(),
        }
    }
}

// =============================================================================
// Hydrator
// =============================================================================

struct Node<'a, E> {
    alias: &'a str,
    relation: &'a Relation,
    meta: &'a ClassMeta,
    factory: Option<&'a dyn EntityFactory<E>>,
    /// `alias_foreign`: null means the relation is absent from the row.
    foreign_column: String,
    children: Vec<Node<'a, E>>,
}

/// Rebuilds entity graphs from rows selected by a graph-bound query.
pub struct Hydrator<'a, E> {
    alias: &'a str,
    meta: &'a ClassMeta,
    factory: Option<&'a dyn EntityFactory<E>>,
    nodes: Vec<Node<'a, E>>,
}

impl<'a, E: Entity> Hydrator<'a, E> {
    /// Plans hydration of `class` rows labelled with `alias`, loading `graph`.
    ///
    /// Graph aliases the catalog cannot resolve are logged and left out.
    pub fn new(
        catalog: &'a dyn Catalog,
        registry: &'a FactoryRegistry<E>,
        class: &str,
        alias: &'a str,
        graph: &'a GraphSpec,
    ) -> Result<Self> {
        let meta = catalog
            .class_meta(class)
            .ok_or_else(|| VellumError::UnknownClass(class.to_string()))?;
        Ok(Self {
            alias,
            meta,
            factory: registry.get(class),
            nodes: plan(catalog, registry, class, graph),
        })
    }

    /// Hydrates `rows`, keyed by root primary key in first-seen order.
    pub fn hydrate<'r>(&self, rows: impl IntoIterator<Item = &'r Row>) -> IndexMap<String, E> {
        let mut instances = IndexMap::new();
        for row in rows {
            self.hydrate_row(&mut instances, row);
        }
        instances
    }

    /// Folds one row into `instances`. Returns `false` when no root entity
    /// could be built from it.
    pub fn hydrate_row(&self, instances: &mut IndexMap<String, E>, row: &Row) -> bool {
        let source = EntitySource::new(self.alias, self.meta, row, true);
        let Some(instance) = create(self.factory, &source) else {
            return false;
        };
        let key = instance.primary_key().unwrap_or_default();
        let root = instances.entry(key).or_insert(instance);
        attach(&self.nodes, root, row);
        true
    }
}

fn plan<'a, E>(
    catalog: &'a dyn Catalog,
    registry: &'a FactoryRegistry<E>,
    class: &str,
    graph: &'a GraphSpec,
) -> Vec<Node<'a, E>> {
    graph
        .iter()
        .filter_map(|(alias, nested)| {
            let Some(relation) = catalog.relation(class, alias) else {
                crate::vellum_warn!(class = %class, alias = %alias, "vellum.hydrate_relation_skipped");
                return None;
            };
            let Some(meta) = catalog.class_meta(&relation.class) else {
                crate::vellum_warn!(class = %relation.class, alias = %alias, "vellum.hydrate_class_unknown");
                return None;
            };
            Some(Node {
                alias,
                relation,
                meta,
                factory: registry.get(&relation.class),
                foreign_column: format!("{alias}_{}", relation.foreign),
                children: plan(catalog, registry, &relation.class, nested),
            })
        })
        .collect()
}

fn create<E: Entity>(factory: Option<&dyn EntityFactory<E>>, source: &EntitySource<'_>) -> Option<E> {
    match factory {
        Some(factory) => factory.create(source),
        None => E::from_source(source),
    }
}

/// Attaches each planned relation present in `row` to `parent`, then
/// descends into the attached entity. A related entity already attached
/// under the same key is reused rather than duplicated.
fn attach<E: Entity>(nodes: &[Node<'_, E>], parent: &mut E, row: &Row) {
    for node in nodes {
        if row.get(&node.foreign_column).is_none_or(Value::is_null) {
            continue;
        }
        let source = EntitySource::new(node.alias, node.meta, row, false);
        let Some(related) = create(node.factory, &source) else {
            continue;
        };
        let key = related.primary_key();
        let attached = key.is_some() && parent.related_mut(node.alias, key.as_deref()).is_some();
        if !attached {
            if node.relation.is_many() {
                parent.attach_many(node.alias, related);
            } else {
                parent.attach_one(node.alias, related);
            }
        }
        if !node.children.is_empty()
            && let Some(target) = parent.related_mut(node.alias, key.as_deref())
        {
            attach(&node.children, target, row);
        }
    }
}

impl<'c> Query<'c> {
    /// A hydrator for rows this query selects, following its bound graph.
    pub fn hydrator<'q, E: Entity>(&'q self, registry: &'q FactoryRegistry<E>) -> Result<Hydrator<'q, E>> {
        Hydrator::new(self.context().catalog(), registry, self.class(), self.alias(), self.graph())
    }

    /// Hydrates `rows` into root entities with the bound graph attached.
    pub fn hydrate_graph<'r, E: Entity>(
        &self,
        rows: impl IntoIterator<Item = &'r Row>,
        registry: &FactoryRegistry<E>,
    ) -> Result<IndexMap<String, E>> {
        Ok(self.hydrator(registry)?.hydrate(rows))
    }
}

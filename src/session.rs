//! High-level collection, graph, count, update and remove operations.
//!
//! A [`Session`] ties a [`Connection`], a [`Catalog`] and [`Options`]
//! together, with an optional [`CacheProvider`] for SELECT results. Reads
//! degrade to empty results on failure and log the error; writes return it.

use crate::cache::CacheProvider;
use crate::config::Options;
use crate::connection::{Connection, Statement};
use std::sync::Arc;
use vellum_core::{
    Catalog, Command, CompiledQuery, Context, Criteria, Entity, FactoryRegistry, GraphSpec, Query, Record, Result,
    Row, Signature, Value,
};

pub struct Session<'a, C, E = Record> {
    conn: C,
    catalog: &'a dyn Catalog,
    options: Options,
    cache: Option<Arc<dyn CacheProvider>>,
    factories: FactoryRegistry<E>,
}

impl<'a, C: Connection> Session<'a, C, Record> {
    pub fn new(conn: C, catalog: &'a dyn Catalog, options: Options) -> Self {
        Self {
            conn,
            catalog,
            options,
            cache: None,
            factories: FactoryRegistry::new(),
        }
    }
}

impl<'a, C: Connection, E: Entity> Session<'a, C, E> {
    /// Uses `cache` for SELECT results when `cache_db` is on.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn CacheProvider>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Hydrates into the entities `factories` build.
    pub fn with_factories<F: Entity>(self, factories: FactoryRegistry<F>) -> Session<'a, C, F> {
        Session {
            conn: self.conn,
            catalog: self.catalog,
            options: self.options,
            cache: self.cache,
            factories,
        }
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    pub fn catalog(&self) -> &'a dyn Catalog {
        self.catalog
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn factories(&self) -> &FactoryRegistry<E> {
        &self.factories
    }

    /// Build context for queries: the catalog plus the connection's dialect
    /// and quoting.
    pub fn context(&self) -> Context<'_> {
        Context::new(self.catalog, self.conn.dialect()).with_quoter(&self.conn)
    }

    pub fn new_query(&self, class: &str, criteria: Option<Criteria>) -> Result<Query<'_>> {
        Query::new(self.context(), class, criteria)
    }

    // ==================== reads ====================

    /// Root entities of `class` matching `criteria`, without relations.
    pub fn collection(&self, class: &str, criteria: Option<Criteria>) -> Vec<E> {
        self.collection_graph(class, GraphSpec::new(), criteria)
    }

    /// Root entities of `class` matching `criteria`, with `graph` loaded.
    ///
    /// Failures are logged and yield an empty collection.
    pub fn collection_graph(&self, class: &str, graph: impl Into<GraphSpec>, criteria: Option<Criteria>) -> Vec<E> {
        match self.try_collection_graph(class, graph, criteria) {
            Ok(entities) => entities,
            Err(err) => {
                vellum_core::vellum_error!(class = %class, error = %err, "vellum.collection_failed");
                Vec::new()
            }
        }
    }

    /// [`collection_graph`](Self::collection_graph), returning the failure.
    pub fn try_collection_graph(
        &self,
        class: &str,
        graph: impl Into<GraphSpec>,
        criteria: Option<Criteria>,
    ) -> Result<Vec<E>> {
        let mut query = self.new_query(class, criteria)?;
        query.bind_graph(graph);
        let rows = self.fetch_rows(&query)?;
        let entities = query.hydrate_graph(&rows, &self.factories)?;
        Ok(entities.into_values().collect())
    }

    /// The first entity of [`collection_graph`](Self::collection_graph).
    pub fn object_graph(&self, class: &str, graph: impl Into<GraphSpec>, criteria: Option<Criteria>) -> Option<E> {
        self.collection_graph(class, graph, criteria).into_iter().next()
    }

    /// Number of distinct `class` entities matching `criteria`; 0 on failure.
    pub fn get_count(&self, class: &str, criteria: Option<Criteria>) -> u64 {
        let count = self
            .new_query(class, criteria)
            .and_then(|query| query.compile_count())
            .and_then(|compiled| self.run(&compiled));
        match count {
            Ok(rows) => rows
                .first()
                .and_then(|row| row.values().next())
                .map(|value| u64::try_from(value.to_int_lossy()).unwrap_or(0))
                .unwrap_or(0),
            Err(err) => {
                vellum_core::vellum_error!(class = %class, error = %err, "vellum.count_failed");
                0
            }
        }
    }

    /// Rows of `query`, from the cache when collections are cached.
    pub fn fetch_rows(&self, query: &Query<'_>) -> Result<Vec<Row>> {
        let compiled = query.compile()?;
        let Some(cache) = self.cache.as_deref().filter(|_| self.options.caches_collections()) else {
            return self.run(&compiled);
        };
        let signature = Signature::for_query(&self.options.cache_db_key, query.class(), &compiled)?;
        if let Some(rows) = cache.get(signature.as_str())? {
            vellum_core::vellum_debug!(signature = %signature, "vellum.cache_hit");
            return Ok(rows);
        }
        vellum_core::vellum_debug!(signature = %signature, "vellum.cache_miss");
        let rows = self.run(&compiled)?;
        cache.set(signature.as_str(), &rows, self.options.cache_ttl())?;
        Ok(rows)
    }

    // ==================== writes ====================

    /// Applies `values` to every `class` row matching `criteria`, returning
    /// the affected count. Cached rows of the class and of its related
    /// classes are dropped.
    pub fn update_collection<K, V, I>(&self, class: &str, values: I, criteria: Option<Criteria>) -> Result<usize>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut query = self.new_query(class, None)?;
        query.command(Command::Update).set(values);
        if let Some(criteria) = criteria {
            query.where_(criteria);
        }
        let affected = self.exec(&query.compile()?)?;

        let mut classes = vec![class.to_string()];
        classes.extend(query.meta().relations.values().map(|relation| relation.class.clone()));
        self.invalidate(&classes)?;
        Ok(affected)
    }

    /// Deletes every `class` row matching `criteria`, returning the affected
    /// count. Cached rows of the class are dropped.
    pub fn remove_collection(&self, class: &str, criteria: Option<Criteria>) -> Result<usize> {
        let mut query = self.new_query(class, None)?;
        query.command(Command::Delete);
        if let Some(criteria) = criteria {
            query.where_(criteria);
        }
        let affected = self.exec(&query.compile()?)?;
        self.invalidate(&[class.to_string()])?;
        Ok(affected)
    }

    // ==================== execution ====================

    fn log_statement(&self, compiled: &CompiledQuery) {
        if self.options.debug {
            vellum_core::vellum_debug!(sql = %compiled.interpolated(&self.conn), "vellum.statement");
        }
    }

    fn run(&self, compiled: &CompiledQuery) -> Result<Vec<Row>> {
        self.log_statement(compiled);
        let result = self.conn.prepare(&compiled.sql).and_then(|mut stmt| {
            stmt.bind(&compiled.bindings)?;
            stmt.execute()
        });
        if let Err(err) = &result {
            vellum_core::vellum_error!(sql = %compiled.sql, error = %err, "vellum.execution_failed");
        }
        result
    }

    fn exec(&self, compiled: &CompiledQuery) -> Result<usize> {
        self.log_statement(compiled);
        let result = self.conn.exec(&compiled.sql, &compiled.bindings);
        if let Err(err) = &result {
            vellum_core::vellum_error!(sql = %compiled.sql, error = %err, "vellum.execution_failed");
        }
        result
    }

    fn invalidate(&self, classes: &[String]) -> Result<()> {
        let Some(cache) = self.cache.as_deref().filter(|_| self.options.cache_db) else {
            return Ok(());
        };
        for class in classes {
            cache.delete_prefix(&Signature::class_prefix(&self.options.cache_db_key, class))?;
            vellum_core::vellum_debug!(class = %class, "vellum.cache_invalidated");
        }
        Ok(())
    }
}

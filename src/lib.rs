//! # vellum
//!
//! Metadata-driven SQL query building and object-graph hydration.
//!
//! Queries are built against a [`Catalog`] of classes, compiled into a single
//! parameterized statement, and the joined rows they return are folded back
//! into nested entities.
//!
//! ## Quick Start
//!
//! ```rust
//! use vellum::prelude::*;
//! use vellum::{ClassDef, FieldMeta, FieldType, Relation};
//!
//! # fn main() -> vellum::Result<()> {
//! let catalog = ModelMap::builder()
//!     .class(
//!         "Customer",
//!         ClassDef::new("customer")
//!             .field("id", FieldMeta::pk(FieldType::Integer))
//!             .field("name", FieldMeta::new(FieldType::String))
//!             .composite("Orders", Relation::many("Order", "id", "customer")),
//!     )
//!     .class(
//!         "Order",
//!         ClassDef::new("orders")
//!             .field("id", FieldMeta::pk(FieldType::Integer))
//!             .field("customer", FieldMeta::new(FieldType::Integer)),
//!     )
//!     .build()?;
//!
//! let mut query = Query::new(Context::new(&catalog, Dialect::SQLite), "Customer", None)?;
//! query
//!     .where_(Criteria::mapping().with("name", "Ann"))
//!     .bind_graph(GraphSpec::new().with("Orders", GraphSpec::new()));
//! let compiled = query.compile()?;
//! assert!(compiled.sql.contains(r#"LEFT JOIN "orders" AS "Orders""#));
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! | Feature    | Enables                                             |
//! |------------|-----------------------------------------------------|
//! | `tracing`  | events for statements, rejected clauses and caching |
//! | `rusqlite` | the [`rusqlite::SqliteConnection`] driver           |

pub mod cache;
pub mod config;
pub mod connection;
#[cfg(feature = "rusqlite")]
pub mod rusqlite;
pub mod session;

pub use cache::{CacheProvider, MemoryCache};
pub use config::Options;
pub use connection::{Connection, Statement};
pub use session::Session;

// =============================================================================
// Core re-exports
// =============================================================================

pub use vellum_core::{
    Binding, Cardinality, Catalog, ClassDef, ClassMeta, Command, CompiledQuery, ConditionNode, Conjunction, Context,
    Criteria, Entity, EntityFactory, EntitySource, FactoryRegistry, FieldMeta, FieldValue, GraphSpec, Hydrator,
    JoinKind, ModelMap, Query, QuerySpec, Quote, Record, Relation, RelationKind, Result, Row, Signature, Sql, Value,
    VellumError,
};
pub use vellum_types::{Dialect, FieldType, ParamType};

pub use vellum_core::{catalog, compiler, criteria, guard, hydrate, query};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        CacheProvider, Catalog, Conjunction, Connection, Context, Criteria, Dialect, Entity, FactoryRegistry,
        GraphSpec, JoinKind, MemoryCache, ModelMap, Options, Query, Record, Result, Row, Session, Value, VellumError,
    };
}

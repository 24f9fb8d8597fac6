//! Query construction, compilation and graph hydration for vellum.
//!
//! The pieces, in the order a query passes through them:
//!
//! - [`Catalog`] - model metadata: tables, fields, keys and relations
//! - [`Criteria`] - criteria expressions, screened by [`guard`]
//! - [`Query`] - the fluent builder, recording into a [`QuerySpec`]
//! - [`compiler`] - renders a spec into a [`CompiledQuery`]
//! - [`Hydrator`] - folds joined rows back into entity graphs
//! - [`Signature`] - cache keys for compiled statements
//!
//! # Features
//!
//! - `tracing` - emit events for compiled queries, rejected clauses and
//!   skipped relations
//! - `rusqlite` - conversions between [`Value`] and rusqlite values

pub mod catalog;
pub mod compiler;
pub mod condition;
pub mod criteria;
pub mod dialect;
pub mod error;
pub mod guard;
pub mod hydrate;
pub mod join;
pub mod params;
pub mod parser;
pub mod query;
pub mod quote;
pub mod signature;
pub mod sql;
mod tracing;
pub mod value;

pub use catalog::{
    Cardinality, Catalog, ClassDef, ClassMeta, FieldMeta, JoinConstraints, JoinCriteria, ModelMap, Owner, Relation,
    RelationKind,
};
pub use compiler::CompiledQuery;
pub use condition::{ConditionNode, ConditionSet, Conjunction};
pub use criteria::{Criteria, FieldValue};
pub use error::{Result, VellumError};
pub use hydrate::{Entity, EntityFactory, EntitySource, FactoryRegistry, Hydrator, Record};
pub use join::JoinKind;
pub use params::Binding;
pub use query::{Command, Context, GraphSpec, Query, QuerySpec};
pub use quote::Quote;
pub use signature::Signature;
pub use sql::{Sql, SqlChunk};
pub use value::{Row, Value};
pub use vellum_types::{Dialect, FieldType, ParamType};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        Catalog, Conjunction, Context, Criteria, Dialect, Entity, FactoryRegistry, GraphSpec, JoinKind, ModelMap,
        Query, Record, Result, Row, Value, VellumError,
    };
}

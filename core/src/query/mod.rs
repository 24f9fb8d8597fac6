//! Query construction.
//!
//! [`Query`] is the fluent builder over one root class. It records
//! everything in a [`QuerySpec`], which the compiler renders and the
//! hydrator reads back through the bound [`GraphSpec`].

mod builder;
mod graph;
mod spec;

pub use builder::{Context, Query};
pub use graph::{GraphSpec, relation_predicate};
pub use spec::{Command, JoinSpec, OrderBy, QuerySpec, SetValue, TableRef};

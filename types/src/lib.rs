//! Shared type definitions for vellum
//!
//! This crate provides the small vocabulary types shared by `vellum-core`
//! and the `vellum` facade:
//!
//! - [`Dialect`] - Database dialect enum (SQLite, PostgreSQL, MySQL)
//! - [`FieldType`] - Declared type of a model field, as recorded in the catalog
//! - [`ParamType`] - Bind type inferred for a parameter value
//!
//! # Features
//!
//! - `std` - Standard library support (enabled by default)
//! - `serde` - Enable serde serialization/deserialization

mod dialect;
mod field_type;
mod param_type;

pub use dialect::{Dialect, DialectParseError};
pub use field_type::{FieldType, FieldTypeParseError};
pub use param_type::ParamType;

/// Prelude module for commonly used types
pub mod prelude {
    pub use crate::{Dialect, FieldType, ParamType};
}

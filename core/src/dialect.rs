//! Dialect type re-exported from vellum-types with core-specific extensions.

use std::fmt::Write;

/// Re-export the unified Dialect enum from vellum-types
pub use vellum_types::Dialect;

/// Writes the placeholder for the 1-based `index` straight into `buf`:
/// `$n` on PostgreSQL, `?` elsewhere.
#[inline]
pub(crate) fn write_placeholder(dialect: Dialect, index: usize, buf: &mut String) {
    match dialect {
        Dialect::PostgreSQL => {
            let _ = write!(buf, "${index}");
        }
        Dialect::SQLite | Dialect::MySQL => buf.push('?'),
    }
}

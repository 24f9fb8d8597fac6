mod chunk;

pub use chunk::*;

use crate::dialect::write_placeholder;
use crate::params::Binding;
use smallvec::SmallVec;
use vellum_types::Dialect;

/// SQL fragment builder with flat chunk storage.
///
/// Uses `SmallVec<[SqlChunk; 8]>` for inline storage of typical condition
/// and column fragments without heap allocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sql {
    pub chunks: SmallVec<[SqlChunk; 8]>,
}

impl Sql {
    // ==================== constructors ====================

    /// Creates an empty SQL fragment
    #[inline]
    pub const fn empty() -> Self {
        Self {
            chunks: SmallVec::new_const(),
        }
    }

    /// Creates SQL with raw text
    #[inline]
    pub fn raw(text: impl Into<String>) -> Self {
        Self {
            chunks: smallvec::smallvec![SqlChunk::raw(text)],
        }
    }

    /// Creates SQL with an escaped identifier
    #[inline]
    pub fn ident(name: impl Into<String>) -> Self {
        Self {
            chunks: smallvec::smallvec![SqlChunk::ident(name)],
        }
    }

    /// Creates SQL with a single parameter
    #[inline]
    pub fn param(binding: Binding) -> Self {
        Self {
            chunks: smallvec::smallvec![SqlChunk::Param(binding)],
        }
    }

    /// `qualifier.name`, both escaped
    pub fn qualified(qualifier: &str, name: &str) -> Self {
        Self {
            chunks: smallvec::smallvec![
                SqlChunk::ident(qualifier),
                SqlChunk::raw("."),
                SqlChunk::ident(name),
            ],
        }
    }

    /// `qualifier.name AS alias`
    pub fn column_as(qualifier: &str, name: &str, alias: &str) -> Self {
        Self::qualified(qualifier, name)
            .push(SqlChunk::raw(" AS "))
            .push(SqlChunk::ident(alias))
    }

    // ==================== composition ====================

    /// Appends another SQL fragment
    #[inline]
    pub fn append(mut self, other: impl Into<Sql>) -> Self {
        self.append_mut(other);
        self
    }

    #[inline]
    pub fn append_mut(&mut self, other: impl Into<Sql>) {
        self.chunks.extend(other.into().chunks);
    }

    #[inline]
    pub fn push(mut self, chunk: impl Into<SqlChunk>) -> Self {
        self.chunks.push(chunk.into());
        self
    }

    #[inline]
    pub fn push_mut(&mut self, chunk: impl Into<SqlChunk>) {
        self.chunks.push(chunk.into());
    }

    /// Joins fragments with a raw separator
    pub fn join<I>(sqls: I, separator: &str) -> Sql
    where
        I: IntoIterator<Item = Sql>,
    {
        let mut out = Sql::empty();
        for (i, sql) in sqls.into_iter().enumerate() {
            if i > 0 {
                out.push_mut(SqlChunk::raw(separator));
            }
            out.append_mut(sql);
        }
        out
    }

    /// Renames the qualifier of every `from.name` pair to `to`.
    ///
    /// Only escaped qualifiers built by [`qualified`](Self::qualified) are
    /// touched; raw text is left alone.
    pub fn requalify(&mut self, from: &str, to: &str) {
        for i in 1..self.chunks.len() {
            let is_dot = matches!(&self.chunks[i], SqlChunk::Raw(text) if text == ".");
            if let SqlChunk::Ident(name) = &mut self.chunks[i - 1]
                && is_dot
                && name.as_str() == from
            {
                *name = to.to_string();
            }
        }
    }

    // ==================== inspection ====================

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Bindings carried by this fragment, in placeholder order
    pub fn bindings(&self) -> impl Iterator<Item = &Binding> {
        self.chunks.iter().filter_map(|chunk| match chunk {
            SqlChunk::Param(binding) => Some(binding),
            _ => None,
        })
    }

    /// Renders the fragment on its own, numbering placeholders from 1.
    pub fn render(&self, dialect: Dialect) -> (String, Vec<Binding>) {
        let mut writer = SqlWriter::new(dialect);
        writer.push_sql(self);
        writer.finish()
    }
}

impl From<&str> for Sql {
    fn from(value: &str) -> Self {
        Sql::raw(value)
    }
}

impl From<String> for Sql {
    fn from(value: String) -> Self {
        Sql::raw(value)
    }
}

impl From<SqlChunk> for Sql {
    fn from(value: SqlChunk) -> Self {
        Self {
            chunks: smallvec::smallvec![value],
        }
    }
}

/// Accumulates statement text and the bindings of every placeholder written,
/// so placeholder numbering and binding order cannot drift apart.
#[derive(Debug)]
pub struct SqlWriter {
    dialect: Dialect,
    buf: String,
    bindings: Vec<Binding>,
}

impl SqlWriter {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            buf: String::with_capacity(128),
            bindings: Vec::new(),
        }
    }

    #[inline]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    #[inline]
    pub fn push_str(&mut self, text: &str) {
        self.buf.push_str(text);
    }

    pub fn push_sql(&mut self, sql: &Sql) {
        for chunk in &sql.chunks {
            match chunk {
                SqlChunk::Param(binding) => self.push_binding(binding.clone()),
                other => other.write_text(self.dialect, &mut self.buf),
            }
        }
    }

    /// Writes the next placeholder and records its binding.
    pub fn push_binding(&mut self, binding: Binding) {
        self.bindings.push(binding);
        write_placeholder(self.dialect, self.bindings.len(), &mut self.buf);
    }

    /// Byte length of the text written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn finish(self) -> (String, Vec<Binding>) {
        (self.buf, self.bindings)
    }
}

use crate::params::Binding;
use vellum_types::Dialect;

/// A SQL chunk represents a part of a rendered statement.
///
/// - `Raw` - SQL text emitted as-is (keywords, operators, validated clauses)
/// - `Ident` - an identifier escaped for the target dialect at render time
/// - `Param` - a placeholder carrying the value bound to it
#[derive(Debug, Clone, PartialEq)]
pub enum SqlChunk {
    Raw(String),
    Ident(String),
    Param(Binding),
}

impl SqlChunk {
    #[inline]
    pub fn raw(text: impl Into<String>) -> Self {
        Self::Raw(text.into())
    }

    #[inline]
    pub fn ident(name: impl Into<String>) -> Self {
        Self::Ident(name.into())
    }

    /// Writes everything except parameters, which need the running index.
    pub(crate) fn write_text(&self, dialect: Dialect, buf: &mut String) {
        match self {
            SqlChunk::Raw(text) => buf.push_str(text),
            SqlChunk::Ident(name) => dialect.write_escaped_ident(name, buf),
            SqlChunk::Param(_) => {}
        }
    }
}

impl From<Binding> for SqlChunk {
    #[inline]
    fn from(value: Binding) -> Self {
        Self::Param(value)
    }
}

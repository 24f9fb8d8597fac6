//! Unified database dialect enum
//!
//! The dialect decides the few places where generated SQL differs between
//! engines: identifier escaping, placeholder syntax and literal quoting.

/// SQL dialect for database-specific rendering
///
/// # Examples
///
/// ```
/// use vellum_types::Dialect;
///
/// let dialect = Dialect::PostgreSQL;
/// assert!(dialect.uses_numbered_placeholders());
///
/// assert_eq!(Dialect::MySQL.escape_ident("user"), "`user`");
/// assert_eq!(Dialect::SQLite.escape_ident("user"), "\"user\"");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Dialect {
    /// SQLite - uses `?` positional placeholders and `"ident"` escaping
    #[default]
    SQLite,

    /// PostgreSQL - uses `$1, $2, ...` numbered placeholders and `"ident"` escaping
    PostgreSQL,

    /// MySQL - uses `?` positional placeholders and `` `ident` `` escaping
    MySQL,
}

impl Dialect {
    /// Returns `true` if this dialect uses numbered placeholders (`$1, $2, ...`)
    #[inline]
    #[must_use]
    pub const fn uses_numbered_placeholders(&self) -> bool {
        matches!(self, Dialect::PostgreSQL)
    }

    /// Parse a dialect from a string (case-insensitive)
    ///
    /// Supports various common aliases:
    /// - SQLite: `"sqlite"`, `"turso"`, `"libsql"`
    /// - PostgreSQL: `"postgresql"`, `"postgres"`, `"pg"`
    /// - MySQL: `"mysql"`, `"mariadb"`
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("sqlite")
            || s.eq_ignore_ascii_case("turso")
            || s.eq_ignore_ascii_case("libsql")
        {
            Some(Dialect::SQLite)
        } else if s.eq_ignore_ascii_case("postgresql")
            || s.eq_ignore_ascii_case("postgres")
            || s.eq_ignore_ascii_case("pg")
        {
            Some(Dialect::PostgreSQL)
        } else if s.eq_ignore_ascii_case("mysql") || s.eq_ignore_ascii_case("mariadb") {
            Some(Dialect::MySQL)
        } else {
            None
        }
    }

    /// Opening and closing identifier escape characters.
    #[must_use]
    pub const fn escape_chars(&self) -> (char, char) {
        match self {
            Dialect::MySQL => ('`', '`'),
            Dialect::SQLite | Dialect::PostgreSQL => ('"', '"'),
        }
    }

    /// Character used to delimit string literals.
    #[must_use]
    pub const fn quote_char(&self) -> char {
        '\''
    }

    /// Strips any escape characters already surrounding `name`.
    #[must_use]
    pub fn unescape_ident<'s>(&self, name: &'s str) -> &'s str {
        let (open, close) = self.escape_chars();
        name.trim_matches(|c| c == open || c == close)
    }

    /// Escapes an identifier, e.g. `user` becomes `` `user` `` on MySQL.
    ///
    /// Escape characters already present at either end are stripped first, so
    /// escaping is idempotent. Escape characters inside the name are doubled.
    #[must_use]
    pub fn escape_ident(&self, name: &str) -> String {
        let mut out = String::with_capacity(name.len() + 2);
        self.write_escaped_ident(name, &mut out);
        out
    }

    /// [`escape_ident`](Self::escape_ident) into an existing buffer.
    pub fn write_escaped_ident(&self, name: &str, out: &mut String) {
        let (open, close) = self.escape_chars();
        out.push(open);
        for ch in self.unescape_ident(name).chars() {
            if ch == close {
                out.push(close);
            }
            out.push(ch);
        }
        out.push(close);
    }

    /// Escapes a qualified `qualifier.name` reference.
    #[must_use]
    pub fn escape_qualified(&self, qualifier: &str, name: &str) -> String {
        let mut out = self.escape_ident(qualifier);
        out.push('.');
        out.push_str(&self.escape_ident(name));
        out
    }

    /// Get the dialect name as a lowercase string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Dialect::SQLite => "sqlite",
            Dialect::PostgreSQL => "postgresql",
            Dialect::MySQL => "mysql",
        }
    }
}

impl core::fmt::Display for Dialect {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Dialect {
    type Err = DialectParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dialect::parse(s).ok_or(DialectParseError)
    }
}

/// Error returned when parsing an unknown dialect string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectParseError;

impl core::fmt::Display for DialectParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("unknown dialect")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DialectParseError {}

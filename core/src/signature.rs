//! Cache signatures for compiled statements.

use crate::compiler::CompiledQuery;
use crate::error::Result;
use core::fmt;
use sha2::{Digest, Sha256};

/// Cache key of one statement: `{key}/{class}/{digest}`.
///
/// The digest covers the SQL text and every binding, so two queries share a
/// signature only when they would return the same rows. The `{key}/{class}/`
/// prefix lets a whole class be invalidated at once.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature(String);

impl Signature {
    pub fn for_query(key: &str, class: &str, query: &CompiledQuery) -> Result<Self> {
        let payload = serde_json::to_vec(&(&query.sql, &query.bindings))?;
        let mut hasher = Sha256::new();
        hasher.update(&payload);
        let digest = hex(&hasher.finalize());
        Ok(Signature(format!("{}{digest}", Self::class_prefix(key, class))))
    }

    /// The prefix shared by every signature of `class`.
    pub fn class_prefix(key: &str, class: &str) -> String {
        format!("{key}/{class}/")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Signature {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

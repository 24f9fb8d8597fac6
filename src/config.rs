//! Session options, loadable from a `vellum.toml` file.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use vellum_core::{Dialect, Result, VellumError};

fn default_cache_db_collections() -> bool {
    true
}

fn default_cache_db_key() -> String {
    "db".to_string()
}

/// Options for a [`Session`](crate::Session).
///
/// ```toml
/// dialect = "mysql"
/// table_prefix = "app_"
/// cache_db = true
/// cache_db_expires = 300
/// ```
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Options {
    /// SQL dialect of the connection (sqlite, postgresql, mysql)
    #[serde(default)]
    pub dialect: Dialect,
    /// Prefix applied to every table name by the model map
    #[serde(default)]
    pub table_prefix: String,
    /// Cache result rows of SELECT statements
    #[serde(default)]
    pub cache_db: bool,
    /// Also cache collection and graph queries when `cache_db` is on
    #[serde(default = "default_cache_db_collections")]
    pub cache_db_collections: bool,
    /// Lifetime of cached rows in seconds; 0 keeps them until invalidated
    #[serde(default)]
    pub cache_db_expires: u64,
    /// Namespace of cache signatures
    #[serde(default = "default_cache_db_key")]
    pub cache_db_key: String,
    /// Log every statement with its bindings inlined
    #[serde(default)]
    pub debug: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            table_prefix: String::new(),
            cache_db: false,
            cache_db_collections: default_cache_db_collections(),
            cache_db_expires: 0,
            cache_db_key: default_cache_db_key(),
            debug: false,
        }
    }
}

impl Options {
    /// Load options from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| VellumError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }

    /// Parse options from a TOML string
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| VellumError::Config(e.to_string()))
    }

    /// `true` when collection results go through the cache.
    pub fn caches_collections(&self) -> bool {
        self.cache_db && self.cache_db_collections
    }

    /// Lifetime of cached rows, `None` for no expiry.
    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.cache_db_expires > 0).then(|| Duration::from_secs(self.cache_db_expires))
    }
}

//! Result-row cache contract and the in-process [`MemoryCache`].

use hashbrown::HashMap;
use parking_lot::RwLock;
use std::time::{Duration, Instant};
use vellum_core::{Result, Row};

/// Storage for the rows of cached statements, keyed by signature.
pub trait CacheProvider: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<Row>>>;

    /// Stores `rows` under `key`. `None` keeps them until deleted.
    fn set(&self, key: &str, rows: &[Row], ttl: Option<Duration>) -> Result<()>;

    /// Removes one entry. Returns the number of entries removed.
    fn delete(&self, key: &str) -> Result<usize>;

    /// Removes every entry whose key starts with `prefix`.
    fn delete_prefix(&self, prefix: &str) -> Result<usize>;

    fn flush(&self) -> Result<()>;
}

#[derive(Debug, Clone)]
struct Entry {
    rows: Vec<Row>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Thread-safe in-memory cache with per-entry expiry.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included until next touched.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl CacheProvider for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Vec<Row>>> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.rows.clone())),
                Some(_) => {}
            }
        }
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
        }
        Ok(None)
    }

    fn set(&self, key: &str, rows: &[Row], ttl: Option<Duration>) -> Result<()> {
        let entry = Entry {
            rows: rows.to_vec(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.entries.write().insert(key.to_string(), entry);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<usize> {
        Ok(usize::from(self.entries.write().remove(key).is_some()))
    }

    fn delete_prefix(&self, prefix: &str) -> Result<usize> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok(before - entries.len())
    }

    fn flush(&self) -> Result<()> {
        self.entries.write().clear();
        Ok(())
    }
}

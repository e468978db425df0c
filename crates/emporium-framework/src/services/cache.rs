//! Expiring key/value cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde_json::Value;

/// Backend selected when `cache_type` is not configured.
pub const DEFAULT_BACKEND: &str = "memory";
/// Lifetime used when `cache_expire` is not configured.
pub const DEFAULT_EXPIRE: Duration = Duration::from_secs(3600);

/// Storage engine behind a [`Cache`].
pub trait CacheBackend: Send + Sync {
    /// Live value stored under `key`.
    fn get(&self, key: &str) -> Option<Value>;

    /// Stores `value` under `key` for `ttl`.
    fn set(&self, key: &str, value: Value, ttl: Duration);

    /// Removes `key`.
    fn delete(&self, key: &str);
}

/// Process-local backend. Expired entries are dropped lazily.
#[derive(Debug, Default)]
pub struct MemoryCacheBackend {
    entries: Mutex<HashMap<String, (Value, Instant)>>,
}

impl MemoryCacheBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheBackend for MemoryCacheBackend {
    fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(key) {
            Some((value, expires)) if *expires > Instant::now() => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, value: Value, ttl: Duration) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_owned(), (value, Instant::now() + ttl));
    }

    fn delete(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
    }
}

/// Cache handle used by controllers.
#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
    expire: Duration,
}

impl Default for Cache {
    fn default() -> Self {
        Self::new(Arc::new(MemoryCacheBackend::new()), DEFAULT_EXPIRE)
    }
}

impl Cache {
    /// Wraps a backend with a default lifetime.
    #[must_use]
    pub fn new(backend: Arc<dyn CacheBackend>, expire: Duration) -> Self {
        Self { backend, expire }
    }

    /// Default lifetime of stored values.
    #[must_use]
    pub const fn expire(&self) -> Duration {
        self.expire
    }

    /// Live value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.backend.get(key)
    }

    /// Stores `value` for the default lifetime.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        self.backend.set(key, value.into(), self.expire);
    }

    /// Removes `key`.
    pub fn delete(&self, key: &str) {
        self.backend.delete(key);
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Cache")
            .field("expire", &self.expire)
            .finish_non_exhaustive()
    }
}

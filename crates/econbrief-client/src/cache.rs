//! Keyed query cache with prefix invalidation.
//!
//! Values are stored as `serde_json::Value` so one cache can hold every query
//! shape. [`QueryCache`] is a cheap cloneable handle; clones share storage.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Ordered list of key segments, e.g. `["bookmarks", "status", "42"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Whether `prefix`'s segments are a leading run of this key's segments.
    #[must_use]
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryCache {
    entries: Arc<Mutex<HashMap<QueryKey, Value>>>,
}

impl QueryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, Value>> {
        // Entries are plain values; a panic mid-update cannot leave them torn.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn get(&self, key: &QueryKey) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    /// Typed read. A value that does not decode as `T` reads as absent.
    #[must_use]
    pub fn get_as<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        self.get(key).and_then(|v| serde_json::from_value(v).ok())
    }

    pub fn set(&self, key: QueryKey, value: Value) {
        self.lock().insert(key, value);
    }

    /// Typed write. Values that fail to serialize are not stored.
    pub fn set_as<T: Serialize>(&self, key: QueryKey, value: &T) {
        match serde_json::to_value(value) {
            Ok(v) => self.set(key, v),
            Err(e) => tracing::warn!(error = %e, ?key, "cache value not serializable"),
        }
    }

    /// Read-modify-write under one lock.
    ///
    /// `f` sees the current value and returns the replacement (`None`
    /// removes the entry). Returns the value that was replaced.
    pub fn modify<F>(&self, key: &QueryKey, f: F) -> Option<Value>
    where
        F: FnOnce(Option<&Value>) -> Option<Value>,
    {
        let mut entries = self.lock();
        let previous = entries.get(key).cloned();
        match f(previous.as_ref()) {
            Some(next) => {
                entries.insert(key.clone(), next);
            }
            None => {
                entries.remove(key);
            }
        }
        previous
    }

    /// Put back a value captured earlier by [`QueryCache::modify`].
    pub fn restore(&self, key: &QueryKey, previous: Option<Value>) {
        self.modify(key, |_| previous);
    }

    pub fn remove(&self, key: &QueryKey) -> Option<Value> {
        self.lock().remove(key)
    }

    /// Drop every entry whose key starts with `prefix`. Returns how many were dropped.
    pub fn invalidate_prefix(&self, prefix: &QueryKey) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        let dropped = before - entries.len();
        tracing::debug!(prefix = ?prefix.segments(), dropped, "invalidated cached queries");
        dropped
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

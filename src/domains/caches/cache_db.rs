use super::cache_objects::{CacheEntry, CacheValue};
use super::pattern::GlobPattern;
use crate::make_smart_pointer;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// One shard's key space. Expired entries are dropped lazily, the first time a lookup sees them.
#[derive(Default)]
pub(crate) struct CacheDb {
    inner: HashMap<Bytes, CacheValue>,
}

impl CacheDb {
    pub(crate) fn set(&mut self, cache_entry: CacheEntry) {
        let (key, value) = cache_entry.destructure();
        self.inner.insert(key, value);
    }

    pub(crate) fn get(&mut self, key: &[u8], now: &DateTime<Utc>) -> Option<&CacheValue> {
        if self.inner.get(key).is_some_and(|value| value.is_expired(now)) {
            self.inner.remove(key);
            return None;
        }
        self.inner.get(key)
    }

    pub(crate) fn exists(&mut self, key: &[u8], now: &DateTime<Utc>) -> bool {
        self.get(key, now).is_some()
    }

    pub(crate) fn delete(&mut self, key: &[u8]) -> bool {
        self.inner.remove(key).is_some()
    }

    pub(crate) fn keys(&self, pattern: &GlobPattern, now: &DateTime<Utc>) -> Vec<Bytes> {
        self.inner
            .iter()
            .filter(|(key, value)| !value.is_expired(now) && pattern.matches(key))
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub(crate) fn count(&self, now: &DateTime<Utc>) -> usize {
        self.inner.values().filter(|value| !value.is_expired(now)).count()
    }
}

make_smart_pointer!(CacheDb, HashMap<Bytes, CacheValue> => inner);

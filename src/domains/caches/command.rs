use super::cache_objects::{CacheEntry, CacheValue};
use super::pattern::GlobPattern;
use bytes::Bytes;
use std::sync::Arc;

pub(crate) type Callback<T> = tokio::sync::oneshot::Sender<T>;

pub(crate) enum CacheCommand {
    Set { cache_entry: CacheEntry, callback: Callback<()> },
    Get { key: Bytes, callback: Callback<Option<CacheValue>> },
    Keys { pattern: Arc<GlobPattern>, callback: Callback<Vec<Bytes>> },
    Delete { key: Bytes, callback: Callback<bool> },
    Exists { key: Bytes, callback: Callback<bool> },
    Count { callback: Callback<usize> },
}

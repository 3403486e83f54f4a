use super::actor::{CacheActor, CacheCommandSender};
use super::cache_objects::CacheEntry;
use super::command::{CacheCommand, Callback};
use super::pattern::GlobPattern;
use crate::domains::saves::snapshot::Snapshot;
use anyhow::Result;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::future::{join_all, try_join_all};
use futures::stream::FuturesUnordered;
use std::hash::Hasher;
use std::sync::Arc;
use tokio::sync::oneshot::error::RecvError;
use tracing::{info, warn};

const NUM_OF_SHARDS: usize = 10;

/// Entry point to the key space. Keys are spread over shard actors by hash.
#[derive(Clone, Debug)]
pub struct CacheManager {
    pub(crate) inboxes: Vec<CacheCommandSender>,
}

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct SnapshotLoadSummary {
    pub loaded: usize,
    pub skipped_expired: usize,
    /// Loaded without expiry because the stored deadline lies beyond what can be represented.
    pub expiry_out_of_range: usize,
}

impl CacheManager {
    pub fn run_cache_actors() -> CacheManager {
        CacheManager { inboxes: (0..NUM_OF_SHARDS).map(|_| CacheActor::run()).collect() }
    }

    pub async fn route_get(&self, key: impl Into<Bytes>) -> Result<Option<Bytes>> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let key = key.into();
        self.select_shard(&key).send(CacheCommand::Get { key, callback: tx }).await?;

        Ok(rx.await?.map(|cache_value| cache_value.value))
    }

    /// `ttl_millis <= 0` stores the value without expiry.
    pub async fn route_set(
        &self,
        key: impl Into<Bytes>,
        value: impl Into<Bytes>,
        ttl_millis: i64,
    ) -> Result<()> {
        self.route_entry(CacheEntry::new(key, value).with_ttl(ttl_millis, Utc::now())).await
    }

    async fn route_entry(&self, cache_entry: CacheEntry) -> Result<()> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.select_shard(cache_entry.key())
            .send(CacheCommand::Set { cache_entry, callback: tx })
            .await?;
        Ok(rx.await?)
    }

    pub async fn route_keys(&self, pattern: Option<Bytes>) -> Result<Vec<Bytes>> {
        let pattern = Arc::new(GlobPattern::compile(pattern.as_deref().unwrap_or(b"*")));

        let per_shard = try_join_all(self.inboxes.iter().map(|shard| {
            let pattern = pattern.clone();
            async move {
                let (tx, rx) = tokio::sync::oneshot::channel();
                shard.send(CacheCommand::Keys { pattern, callback: tx }).await?;
                anyhow::Ok(rx.await?)
            }
        }))
        .await?;

        Ok(per_shard.into_iter().flatten().collect())
    }

    pub async fn route_count(&self) -> Result<usize> {
        let per_shard = try_join_all(self.inboxes.iter().map(|shard| async move {
            let (tx, rx) = tokio::sync::oneshot::channel();
            shard.send(CacheCommand::Count { callback: tx }).await?;
            anyhow::Ok(rx.await?)
        }))
        .await?;

        Ok(per_shard.into_iter().sum())
    }

    pub async fn route_delete(&self, keys: Vec<Bytes>) -> Result<u64> {
        let closure = |key, callback| -> CacheCommand { CacheCommand::Delete { key, callback } };
        let results = self.send_selectively(keys, closure).await;

        let deleted = results.into_iter().filter_map(|r| r.ok().filter(|&success| success)).count();
        Ok(deleted as u64)
    }

    pub async fn route_exists(&self, keys: Vec<Bytes>) -> Result<u64> {
        let closure = |key, callback| -> CacheCommand { CacheCommand::Exists { key, callback } };
        let results = self.send_selectively(keys, closure).await;

        let found = results.into_iter().filter_map(|r| r.ok().filter(|&found| found)).count();
        Ok(found as u64)
    }

    /// Populates the key space from a decoded snapshot. Entries whose expiry is not after
    /// `load_time` are skipped, the rest keep their remaining time to live.
    pub async fn apply_snapshot(
        &self,
        snapshot: Snapshot,
        load_time: DateTime<Utc>,
    ) -> Result<SnapshotLoadSummary> {
        let mut summary = SnapshotLoadSummary::default();
        let mut entries = Vec::new();

        for raw in snapshot.into_entries() {
            let expire_at = match raw.expiry {
                | Some(expiry) => match expiry.to_datetime() {
                    | Some(expire_at) => Some(expire_at),
                    | None => {
                        warn!(
                            key = %raw.key.escape_ascii(),
                            ?expiry,
                            "expiry out of range, loading without expiry"
                        );
                        summary.expiry_out_of_range += 1;
                        None
                    },
                },
                | None => None,
            };
            let ttl_millis = match expire_at {
                | Some(expire_at) if expire_at <= load_time => {
                    summary.skipped_expired += 1;
                    continue;
                },
                // sub-millisecond remainders must not collapse into "no expiry"
                | Some(expire_at) => (expire_at - load_time).num_milliseconds().max(1),
                | None => 0,
            };
            entries.push(CacheEntry::new(raw.key, raw.value).with_ttl(ttl_millis, load_time));
        }

        summary.loaded = entries.len();
        join_all(entries.into_iter().map(|entry| self.route_entry(entry)))
            .await
            .into_iter()
            .collect::<Result<Vec<_>>>()?;

        info!(
            loaded = summary.loaded,
            skipped = summary.skipped_expired,
            expiry_out_of_range = summary.expiry_out_of_range,
            "snapshot applied"
        );
        Ok(summary)
    }

    fn select_shard(&self, key: &[u8]) -> &CacheCommandSender {
        &self.inboxes[self.take_shard_key_from_str(key)]
    }

    async fn send_selectively<T>(
        &self,
        keys: Vec<Bytes>,
        func: fn(Bytes, Callback<T>) -> CacheCommand,
    ) -> Vec<Result<T, RecvError>> {
        FuturesUnordered::from_iter(keys.into_iter().map(|key| {
            let (tx, rx) = tokio::sync::oneshot::channel();
            async move {
                let _ = self.select_shard(&key).send(func(key, tx)).await;
                rx.await
            }
        }))
        .collect::<Vec<_>>()
        .await
    }

    fn take_shard_key_from_str(&self, s: &[u8]) -> usize {
        let mut hasher = std::hash::DefaultHasher::new();
        std::hash::Hash::hash(&s, &mut hasher);
        hasher.finish() as usize % self.inboxes.len()
    }
}

//! Metadata cache (§4.6): `metadata({ topics, autocreate?, forceUpdate? })` returns a cluster
//! snapshot cached up to `metadataMaxAge`. Concurrent calls for the same topic set are coalesced
//! by the dedup key `"metadata:" + sorted(topics)` so only one of them reaches the wire.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};

use crate::errors::Result;
use crate::protocol::metadata::{BrokerMetadata, TopicMetadata};
use crate::protocol::TopicPartition;

#[derive(Debug, Clone)]
pub struct ClusterMetadata {
    pub brokers: Vec<BrokerMetadata>,
    pub cluster_id: Option<String>,
    pub controller_id: i32,
    pub topics: HashMap<String, TopicMetadata>,
    pub fetched_at: Instant,
}

impl ClusterMetadata {
    pub fn leader_for(&self, tp: &TopicPartition) -> Option<i32> {
        self.topics
            .get(&tp.topic)?
            .partitions
            .iter()
            .find(|p| p.partition_index == tp.partition)
            .map(|p| p.leader_id)
    }

    pub fn broker_addr(&self, node_id: i32) -> Option<String> {
        self.brokers
            .iter()
            .find(|b| b.node_id == node_id)
            .map(|b| format!("{}:{}", b.host, b.port))
    }
}

fn dedup_key(topics: &Option<Vec<String>>) -> String {
    let mut sorted = topics.clone().unwrap_or_default();
    sorted.sort();
    format!("metadata:{}", sorted.join(","))
}

/// Caches the most recent `ClusterMetadata` snapshot and coalesces concurrent refreshes.
pub struct MetadataCache {
    state: RwLock<Option<Arc<ClusterMetadata>>>,
    max_age: Duration,
    refresh_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl MetadataCache {
    pub fn new(max_age: Duration) -> Self {
        MetadataCache {
            state: RwLock::new(None),
            max_age,
            refresh_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Returns a cached snapshot if `topics` is `None` is satisfied the same way: present, not
    /// stale, and — when specific topics were asked for — all of them already known.
    async fn fresh_snapshot(&self, topics: &Option<Vec<String>>) -> Option<Arc<ClusterMetadata>> {
        let guard = self.state.read().await;
        let snapshot = guard.as_ref()?;
        if snapshot.fetched_at.elapsed() >= self.max_age {
            return None;
        }
        if let Some(topics) = topics {
            if topics.iter().any(|t| !snapshot.topics.contains_key(t)) {
                return None;
            }
        }
        Some(snapshot.clone())
    }

    /// Returns the current snapshot, refreshing via `fetch` if the cache is stale, missing a
    /// requested topic, or `force_update` is set. `fetch` only runs for the caller that wins the
    /// per-key refresh lock; everyone else either reuses its result or the cache it left behind.
    pub async fn get<F, Fut>(
        &self,
        topics: Option<Vec<String>>,
        force_update: bool,
        fetch: F,
    ) -> Result<Arc<ClusterMetadata>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ClusterMetadata>>,
    {
        if !force_update {
            if let Some(snapshot) = self.fresh_snapshot(&topics).await {
                return Ok(snapshot);
            }
        }

        let key = dedup_key(&topics);
        let lock = {
            let mut locks = self.refresh_locks.lock().await;
            locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _guard = lock.lock().await;

        if !force_update {
            if let Some(snapshot) = self.fresh_snapshot(&topics).await {
                return Ok(snapshot);
            }
        }

        let fetched = fetch().await?;
        let snapshot = Arc::new(ClusterMetadata {
            fetched_at: Instant::now(),
            ..fetched
        });
        *self.state.write().await = Some(snapshot.clone());
        self.refresh_locks.lock().await.remove(&key);
        Ok(snapshot)
    }

    pub async fn invalidate(&self) {
        *self.state.write().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn empty_metadata() -> ClusterMetadata {
        ClusterMetadata {
            brokers: vec![],
            cluster_id: None,
            controller_id: -1,
            topics: HashMap::new(),
            fetched_at: Instant::now(),
        }
    }

    #[tokio::test]
    async fn caches_until_expiry() {
        let cache = MetadataCache::new(Duration::from_secs(60));
        let calls = AtomicU32::new(0);
        for _ in 0..3 {
            cache
                .get(None, false, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok(empty_metadata()) }
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn force_update_always_refetches() {
        let cache = MetadataCache::new(Duration::from_secs(60));
        let calls = AtomicU32::new(0);
        cache
            .get(None, false, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(empty_metadata()) }
            })
            .await
            .unwrap();
        cache
            .get(None, true, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(empty_metadata()) }
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unknown_topic_forces_refresh() {
        let cache = MetadataCache::new(Duration::from_secs(60));
        cache
            .get(None, false, || async { Ok(empty_metadata()) })
            .await
            .unwrap();

        let calls = AtomicU32::new(0);
        cache
            .get(Some(vec!["orders".into()]), false, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(empty_metadata()) }
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_next_call_to_refetch() {
        let cache = MetadataCache::new(Duration::from_secs(60));
        let calls = AtomicU32::new(0);
        cache
            .get(None, false, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(empty_metadata()) }
            })
            .await
            .unwrap();
        cache.invalidate().await;
        cache
            .get(None, false, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(empty_metadata()) }
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fetch_error_propagates_and_does_not_poison_cache() {
        let cache = MetadataCache::new(Duration::from_secs(60));
        let result: Result<Arc<ClusterMetadata>> = cache
            .get(None, false, || async {
                Err(ErrorKind::BrokerNotFound("no seed brokers".into()).into())
            })
            .await;
        assert!(result.is_err());
    }
}

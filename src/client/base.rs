//! Base client core (§4.6): API discovery, metadata caching, retry, and broker/coordinator
//! lookup, all built on top of the connection pool.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use rand::seq::SliceRandom;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::client::cluster::{ClusterMetadata, MetadataCache};
use crate::client::config::ClientConfig;
use crate::client::diagnostics;
use crate::client::retry::{perform_with_retry, RetryPolicy};
use crate::client::version::{is_flexible, ApiVersionCache};
use crate::errors::{ErrorFlags, ErrorKind, Result};
use crate::network::connection::Connection;
use crate::network::ConnectionPool;
use crate::protocol::api_versions::{self, ApiVersionsRequest};
use crate::protocol::find_coordinator::{self, CoordinatorType, FindCoordinatorRequest};
use crate::protocol::header::RequestHeader;
use crate::protocol::metadata::{self, MetadataRequest};
use crate::protocol::{ApiKey, TopicPartition};

/// Everything a producer, consumer, or admin façade needs to talk to a cluster: connection
/// pooling, per-broker API-version negotiation, metadata caching, and retry with classification.
pub struct BaseClient {
    config: ClientConfig,
    pool: ConnectionPool,
    version_caches: Mutex<HashMap<String, Arc<ApiVersionCache>>>,
    metadata_cache: MetadataCache,
    group_coordinators: Mutex<HashMap<String, i32>>,
    txn_coordinators: Mutex<HashMap<String, i32>>,
    cancel: CancellationToken,
}

impl BaseClient {
    pub fn new(config: ClientConfig) -> Self {
        let metadata_max_age = config.metadata_max_age;
        let pool = ConnectionPool::new(config.credentials.clone());
        BaseClient {
            config,
            pool,
            version_caches: Mutex::new(HashMap::new()),
            metadata_cache: MetadataCache::new(metadata_max_age),
            group_coordinators: Mutex::new(HashMap::new()),
            txn_coordinators: Mutex::new(HashMap::new()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.config.retries, self.config.retry_delay)
    }

    async fn version_cache(&self, addr: &str) -> Arc<ApiVersionCache> {
        let mut guard = self.version_caches.lock().await;
        guard
            .entry(addr.to_owned())
            .or_insert_with(|| Arc::new(ApiVersionCache::new()))
            .clone()
    }

    /// Invalidates the cached API versions for `addr` — called after a reconnect, per §4.6.
    pub async fn invalidate_versions(&self, addr: &str) {
        if let Some(cache) = self.version_caches.lock().await.get(addr) {
            cache.invalidate().await;
        }
    }

    /// `getApi(name)` (§4.6): the highest version of `api_key` this client and the broker at
    /// `addr` both support. Populates the per-connection cache with an `ApiVersions` exchange the
    /// first time it's asked about that broker.
    #[instrument(skip(self))]
    pub async fn get_api(&self, addr: &str, api_key: ApiKey) -> Result<i16> {
        let cache = self.version_cache(addr).await;
        if !cache.is_populated().await {
            let conn = self.pool.get_or_connect(addr).await?;
            let correlation_id = conn.next_correlation_id();
            let header = RequestHeader::new(ApiKey::ApiVersions, 0, correlation_id, self.client_id(), false);
            let req = ApiVersionsRequest {
                client_software_name: "kafka-native".into(),
                client_software_version: env!("CARGO_PKG_VERSION").into(),
            };
            let body = api_versions::create_request(&header, &req)?;
            let resp = conn
                .send(ApiKey::ApiVersions, 0, correlation_id, strip_length(body))
                .await?;
            let parsed = api_versions::parse_response(&resp, 0)?;
            if parsed.error_code != 0 {
                return Err(ErrorKind::Protocol(ApiKey::ApiVersions, parsed.error_code.into()).into());
            }
            cache.set(parsed.api_versions).await;
        }
        cache.get_api(api_key).await
    }

    fn client_id(&self) -> Option<&str> {
        self.config.client_id.as_deref()
    }

    /// Issues `request_body` (freshly built by the caller for the negotiated version) to `addr`
    /// and returns the raw response bytes for the caller to parse.
    pub async fn call_raw(
        &self,
        addr: &str,
        api_key: ApiKey,
        api_version: i16,
        make_request: impl FnOnce(&RequestHeader) -> Result<Vec<u8>>,
    ) -> Result<Bytes> {
        let conn = self.pool.get_or_connect(addr).await?;
        let correlation_id = conn.next_correlation_id();
        let header = RequestHeader::new(
            api_key,
            api_version,
            correlation_id,
            self.client_id(),
            is_flexible(api_key, api_version),
        );
        let body = make_request(&header)?;
        conn.send(api_key, api_version, correlation_id, strip_length(body))
            .await
    }

    async fn bootstrap_connection(&self) -> Result<Connection> {
        let mut servers = self.config.bootstrap_servers.clone();
        servers.shuffle(&mut rand::thread_rng());
        let mut last_err = None;
        for addr in &servers {
            match self.pool.get_or_connect(addr).await {
                Ok(conn) => return Ok(conn),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| ErrorKind::BrokerNotFound("no bootstrap servers configured".into()).into()))
    }

    /// `metadata({ topics, autocreate?, forceUpdate? })` (§4.6).
    #[instrument(skip(self))]
    pub async fn metadata(
        &self,
        topics: Option<Vec<String>>,
        autocreate: bool,
        force_update: bool,
    ) -> Result<Arc<ClusterMetadata>> {
        let op = diagnostics::begin("base", "metadata");
        let result = self
            .metadata_cache
            .get(topics.clone(), force_update, || async {
                let conn = self.bootstrap_connection().await?;
                let addr = conn.addr().to_owned();
                let version = self.get_api(&addr, ApiKey::Metadata).await?;
                let req = MetadataRequest {
                    topics: topics.clone(),
                    allow_auto_topic_creation: autocreate,
                };
                op.async_start();
                let resp = self
                    .call_raw(&addr, ApiKey::Metadata, version, |h| metadata::create_request(h, &req))
                    .await?;
                op.async_end();
                let parsed = metadata::parse_response(&resp, version)?;
                Ok(ClusterMetadata {
                    brokers: parsed.brokers,
                    cluster_id: parsed.cluster_id,
                    controller_id: parsed.controller_id,
                    topics: parsed
                        .topics
                        .into_iter()
                        .map(|t| (t.name.clone().unwrap_or_default(), t))
                        .collect(),
                    fetched_at: std::time::Instant::now(),
                })
            })
            .await;
        match &result {
            Ok(_) => op.end(),
            Err(e) => op.fail(e),
        }
        result
    }

    /// Broker address currently holding the leader for `tp`, per cached metadata.
    pub async fn leader_for(&self, tp: &TopicPartition) -> Result<String> {
        let snapshot = self.metadata(Some(vec![tp.topic.clone()]), false, false).await?;
        let node_id = snapshot
            .leader_for(tp)
            .ok_or_else(|| ErrorKind::BrokerNotFound(format!("{}-{}", tp.topic, tp.partition)))?;
        snapshot
            .broker_addr(node_id)
            .ok_or_else(|| ErrorKind::BrokerNotFound(format!("node {}", node_id)).into())
    }

    async fn find_coordinator(&self, key: &str, key_type: CoordinatorType) -> Result<i32> {
        let cache = match key_type {
            CoordinatorType::Group => &self.group_coordinators,
            CoordinatorType::Transaction => &self.txn_coordinators,
        };
        if let Some(node_id) = cache.lock().await.get(key) {
            return Ok(*node_id);
        }

        let conn = self.bootstrap_connection().await?;
        let addr = conn.addr().to_owned();
        let version = self.get_api(&addr, ApiKey::FindCoordinator).await?;
        let req = FindCoordinatorRequest {
            key: key.to_owned(),
            key_type,
        };
        let resp = self
            .call_raw(&addr, ApiKey::FindCoordinator, version, |h| {
                find_coordinator::create_request(h, &req)
            })
            .await?;
        let parsed = find_coordinator::parse_response(&resp, version)?;
        if parsed.error_code != 0 {
            return Err(ErrorKind::Protocol(ApiKey::FindCoordinator, parsed.error_code.into()).into());
        }

        cache.lock().await.insert(key.to_owned(), parsed.node_id);
        Ok(parsed.node_id)
    }

    /// Group coordinator for `group_id`, caching the result until a `NOT_COORDINATOR`-class error
    /// invalidates it (§4.6).
    pub async fn group_coordinator(&self, group_id: &str) -> Result<i32> {
        self.find_coordinator(group_id, CoordinatorType::Group).await
    }

    /// Transaction coordinator for `transactional_id`, same caching rule.
    pub async fn transaction_coordinator(&self, transactional_id: &str) -> Result<i32> {
        self.find_coordinator(transactional_id, CoordinatorType::Transaction).await
    }

    /// Resolves a broker node id to its `host:port` via cached cluster metadata.
    pub async fn broker_addr(&self, node_id: i32) -> Result<String> {
        let snapshot = self.metadata(None, false, false).await?;
        snapshot
            .broker_addr(node_id)
            .ok_or_else(|| ErrorKind::BrokerNotFound(format!("node {}", node_id)).into())
    }

    pub async fn invalidate_group_coordinator(&self, group_id: &str) {
        self.group_coordinators.lock().await.remove(group_id);
    }

    pub async fn invalidate_transaction_coordinator(&self, transactional_id: &str) {
        self.txn_coordinators.lock().await.remove(transactional_id);
    }

    /// `performWithRetry` (§4.6), pre-wired with this client's retry budget and with
    /// `has_stale_metadata` wired to force a metadata refresh before the next attempt.
    pub async fn perform_with_retry<T, Op, Fut>(&self, op: Op) -> Result<T>
    where
        Op: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let policy = self.retry_policy();
        let on_retry = |flags: &ErrorFlags| {
            let force_refresh = flags.has_stale_metadata;
            async move {
                if force_refresh {
                    self.metadata_cache.invalidate().await;
                }
            }
        };
        perform_with_retry(&policy, &self.cancel, on_retry, op).await
    }

    pub async fn connection_count(&self) -> usize {
        self.pool.len().await
    }

    /// Seeds the pool with an already-established connection (typically a `ScriptedBroker`) so
    /// tests can drive `get_api`/`call_raw`/`metadata` against canned responses instead of a live
    /// cluster.
    pub async fn inject_connection_for_test(&self, addr: &str, conn: Connection) {
        self.pool.insert(addr, conn).await;
    }
}

fn strip_length(mut framed: Vec<u8>) -> Bytes {
    framed.drain(0..4);
    Bytes::from(framed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_length_removes_the_four_byte_prefix() {
        let framed = vec![0, 0, 0, 2, 9, 9];
        assert_eq!(strip_length(framed), Bytes::from_static(&[9, 9]));
    }
}

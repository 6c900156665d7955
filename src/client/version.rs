//! API discovery (§4.6): `getApi` intersects broker-advertised version ranges with the versions
//! this client knows how to speak, and caches the result until the next reconnect.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::errors::{ErrorKind, Result};
use crate::protocol::api_versions::ApiVersionRange;
use crate::protocol::ApiKey;

/// The highest version of each API this build's stub modules understand. Kept in one table so
/// `getApi` has a single place to intersect against; update it alongside a stub's flexible-version
/// threshold whenever a new version is wired up.
const CLIENT_SUPPORTED_VERSIONS: &[(ApiKey, i16, i16)] = &[
    (ApiKey::Produce, 0, 9),
    (ApiKey::Fetch, 0, 13),
    (ApiKey::ListOffsets, 0, 7),
    (ApiKey::Metadata, 0, 12),
    (ApiKey::OffsetCommit, 0, 8),
    (ApiKey::OffsetFetch, 0, 8),
    (ApiKey::FindCoordinator, 0, 4),
    (ApiKey::JoinGroup, 0, 9),
    (ApiKey::Heartbeat, 0, 4),
    (ApiKey::LeaveGroup, 0, 5),
    (ApiKey::SyncGroup, 0, 5),
    (ApiKey::ListGroups, 0, 4),
    (ApiKey::SaslHandshake, 0, 1),
    (ApiKey::ApiVersions, 0, 3),
    (ApiKey::CreateTopics, 0, 7),
    (ApiKey::DeleteTopics, 0, 6),
    (ApiKey::InitProducerId, 0, 4),
    (ApiKey::AddPartitionsToTxn, 0, 3),
    (ApiKey::AddOffsetsToTxn, 0, 3),
    (ApiKey::EndTxn, 0, 3),
    (ApiKey::TxnOffsetCommit, 0, 3),
    (ApiKey::DescribeConfigs, 0, 4),
    (ApiKey::SaslAuthenticate, 0, 2),
    (ApiKey::DeleteGroups, 0, 2),
];

fn client_range(api_key: ApiKey) -> Option<(i16, i16)> {
    CLIENT_SUPPORTED_VERSIONS
        .iter()
        .find(|(k, _, _)| *k == api_key)
        .map(|(_, min, max)| (*min, *max))
}

/// Mirrors the `let flexible = header.api_version >= N` threshold each stub's `create_request`
/// computes for itself, so callers building a `RequestHeader` know whether the header itself
/// should carry the tagged-fields terminator. `SaslHandshake` never grew a flexible version.
pub fn is_flexible(api_key: ApiKey, api_version: i16) -> bool {
    match api_key {
        ApiKey::Produce => api_version >= 9,
        ApiKey::Fetch => api_version >= 12,
        ApiKey::ListOffsets => api_version >= 6,
        ApiKey::Metadata => api_version >= 9,
        ApiKey::OffsetCommit => api_version >= 8,
        ApiKey::OffsetFetch => api_version >= 6,
        ApiKey::FindCoordinator => api_version >= 3,
        ApiKey::JoinGroup => api_version >= 6,
        ApiKey::Heartbeat => api_version >= 4,
        ApiKey::LeaveGroup => api_version >= 4,
        ApiKey::SyncGroup => api_version >= 4,
        ApiKey::ListGroups => api_version >= 3,
        ApiKey::SaslHandshake => false,
        ApiKey::ApiVersions => api_version >= 3,
        ApiKey::CreateTopics => api_version >= 5,
        ApiKey::DeleteTopics => api_version >= 4,
        ApiKey::InitProducerId => api_version >= 2,
        ApiKey::AddPartitionsToTxn => api_version >= 3,
        ApiKey::AddOffsetsToTxn => api_version >= 3,
        ApiKey::EndTxn => api_version >= 3,
        ApiKey::TxnOffsetCommit => api_version >= 3,
        ApiKey::DescribeConfigs => api_version >= 4,
        ApiKey::SaslAuthenticate => api_version >= 2,
        ApiKey::DeleteGroups => api_version >= 2,
        _ => api_version >= 2,
    }
}

/// Per-connection cache of negotiated API versions (§4.6: "results are cached per connection;
/// invalidated on reconnect").
#[derive(Default)]
pub struct ApiVersionCache {
    broker_versions: RwLock<Option<HashMap<i16, (i16, i16)>>>,
}

impl ApiVersionCache {
    pub fn new() -> Self {
        ApiVersionCache {
            broker_versions: RwLock::new(None),
        }
    }

    pub async fn set(&self, versions: Vec<ApiVersionRange>) {
        let map = versions
            .into_iter()
            .map(|v| (v.api_key, (v.min_version, v.max_version)))
            .collect();
        *self.broker_versions.write().await = Some(map);
    }

    pub async fn invalidate(&self) {
        *self.broker_versions.write().await = None;
    }

    pub async fn is_populated(&self) -> bool {
        self.broker_versions.read().await.is_some()
    }

    /// Returns the highest version in the intersection of broker-supported and
    /// client-supported ranges for `api_key`. Fails `unsupported` if the API is missing at the
    /// broker, the client doesn't know the API at all, or the ranges are disjoint.
    pub async fn get_api(&self, api_key: ApiKey) -> Result<i16> {
        let (client_min, client_max) =
            client_range(api_key).ok_or(ErrorKind::Unsupported(api_key))?;

        let guard = self.broker_versions.read().await;
        let broker_versions = guard
            .as_ref()
            .expect("get_api called before the ApiVersions exchange populated the cache");
        let (broker_min, broker_max) = broker_versions
            .get(&api_key.code())
            .copied()
            .ok_or(ErrorKind::Unsupported(api_key))?;

        let lo = client_min.max(broker_min);
        let hi = client_max.min(broker_max);
        if lo > hi {
            return Err(ErrorKind::Unsupported(api_key).into());
        }
        Ok(hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(api_key: ApiKey, min: i16, max: i16) -> ApiVersionRange {
        ApiVersionRange {
            api_key: api_key.code(),
            min_version: min,
            max_version: max,
        }
    }

    #[tokio::test]
    async fn picks_highest_version_in_the_intersection() {
        let cache = ApiVersionCache::new();
        cache.set(vec![range(ApiKey::Metadata, 0, 11)]).await;
        assert_eq!(cache.get_api(ApiKey::Metadata).await.unwrap(), 11);
    }

    #[tokio::test]
    async fn disjoint_ranges_are_unsupported() {
        let cache = ApiVersionCache::new();
        cache.set(vec![range(ApiKey::Metadata, 20, 25)]).await;
        assert!(cache.get_api(ApiKey::Metadata).await.is_err());
    }

    #[tokio::test]
    async fn api_missing_at_broker_is_unsupported() {
        let cache = ApiVersionCache::new();
        cache.set(vec![range(ApiKey::Produce, 0, 5)]).await;
        assert!(cache.get_api(ApiKey::Metadata).await.is_err());
    }

    #[test]
    fn sasl_handshake_is_never_flexible() {
        assert!(!is_flexible(ApiKey::SaslHandshake, 1));
    }

    #[test]
    fn metadata_flexible_threshold_matches_the_stub() {
        assert!(!is_flexible(ApiKey::Metadata, 8));
        assert!(is_flexible(ApiKey::Metadata, 9));
    }

    #[tokio::test]
    async fn invalidate_clears_the_cache() {
        let cache = ApiVersionCache::new();
        cache.set(vec![range(ApiKey::Metadata, 0, 11)]).await;
        cache.invalidate().await;
        assert!(!cache.is_populated().await);
    }
}

//! Admin façade (§4.9): thin, promise-returning wrappers over the admin-category APIs. Each
//! wrapper targets the controller or the group coordinator as the RPC requires, issues it through
//! the base client, and lifts the response into this module's result types — no bespoke semantics
//! beyond what the underlying protocol already carries.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::client::BaseClient;
use crate::errors::{ErrorKind, Result};
use crate::protocol::admin::{
    acls, alter_configs, create_partitions, delegation_tokens, delete_records, describe_groups, features, incremental_alter_configs,
    list_groups, log_dirs, offset_delete, quotas, reassignments,
};
use crate::protocol::create_topics::{self, CreatableTopicResult, ConfigEntry, NewTopic};
use crate::protocol::delete_topics::{self, DeletableTopicResult};
use crate::protocol::offset_fetch::{self, OffsetFetchPartitionResponse, OffsetFetchRequest, OffsetFetchTopic};
use crate::protocol::ApiKey;

pub use acls::AclDescriptor;
pub use create_partitions::{NewPartitionAssignment, NewPartitions};
pub use create_topics::ReplicaAssignment;
pub use delegation_tokens::TokenHolder;
pub use incremental_alter_configs::{ConfigOp, IncrementalConfigEntry};
pub use quotas::{QuotaComponent, QuotaEntityEntry, QuotaEntry, QuotaOp};
pub use reassignments::{AlterReassignmentsTopic, ListReassignmentsTopic, OngoingTopicReassignment, PartitionReplicas};

/// A promise-returning wrapper over the admin-category RPCs, sharing the producer/consumer's
/// connection pool, API-version cache, and retry-classified errors via the base client.
pub struct AdminClient {
    client: Arc<BaseClient>,
}

impl AdminClient {
    pub fn new(client: Arc<BaseClient>) -> Self {
        AdminClient { client }
    }

    async fn controller_addr(&self) -> Result<String> {
        let snapshot = self.client.metadata(None, false, false).await?;
        self.client.broker_addr(snapshot.controller_id).await
    }

    async fn coordinator_addr(&self, group_id: &str) -> Result<String> {
        let node_id = self.client.group_coordinator(group_id).await?;
        self.client.broker_addr(node_id).await
    }

    pub async fn create_topics(&self, topics: Vec<NewTopic>, timeout: Duration, validate_only: bool) -> Result<Vec<CreatableTopicResult>> {
        let addr = self.controller_addr().await?;
        let version = self.client.get_api(&addr, ApiKey::CreateTopics).await?;
        let req = create_topics::CreateTopicsRequest {
            topics,
            timeout_ms: timeout.as_millis() as i32,
            validate_only,
        };
        let resp = self
            .client
            .call_raw(&addr, ApiKey::CreateTopics, version, |h| create_topics::create_request(h, &req))
            .await?;
        Ok(create_topics::parse_response(&resp, version)?.topics)
    }

    pub async fn delete_topics(&self, topic_names: Vec<String>, timeout: Duration) -> Result<Vec<DeletableTopicResult>> {
        let addr = self.controller_addr().await?;
        let version = self.client.get_api(&addr, ApiKey::DeleteTopics).await?;
        let req = delete_topics::DeleteTopicsRequest {
            topic_names,
            timeout_ms: timeout.as_millis() as i32,
        };
        let resp = self
            .client
            .call_raw(&addr, ApiKey::DeleteTopics, version, |h| delete_topics::create_request(h, &req))
            .await?;
        Ok(delete_topics::parse_response(&resp, version)?.responses)
    }

    pub async fn create_partitions(
        &self,
        topics: Vec<NewPartitions>,
        timeout: Duration,
        validate_only: bool,
    ) -> Result<Vec<crate::protocol::admin::ResourceResult>> {
        let addr = self.controller_addr().await?;
        let version = self.client.get_api(&addr, ApiKey::CreatePartitions).await?;
        let req = create_partitions::CreatePartitionsRequest {
            topics,
            timeout_ms: timeout.as_millis() as i32,
            validate_only,
        };
        let resp = self
            .client
            .call_raw(&addr, ApiKey::CreatePartitions, version, |h| create_partitions::create_request(h, &req))
            .await?;
        Ok(create_partitions::parse_response(&resp, version)?.results)
    }

    pub async fn describe_configs(
        &self,
        resources: Vec<crate::protocol::admin::describe_configs::Resource>,
        include_synonyms: bool,
    ) -> Result<Vec<crate::protocol::admin::describe_configs::DescribeConfigsResourceResult>> {
        use crate::protocol::admin::describe_configs;
        let addr = self.controller_addr().await?;
        let version = self.client.get_api(&addr, ApiKey::DescribeConfigs).await?;
        let req = describe_configs::DescribeConfigsRequest { resources, include_synonyms };
        let resp = self
            .client
            .call_raw(&addr, ApiKey::DescribeConfigs, version, |h| describe_configs::create_request(h, &req))
            .await?;
        Ok(describe_configs::parse_response(&resp, version)?.results)
    }

    pub async fn alter_configs(
        &self,
        resources: Vec<(i8, String, Vec<ConfigEntry>)>,
        validate_only: bool,
    ) -> Result<Vec<crate::protocol::admin::ResourceResult>> {
        let addr = self.controller_addr().await?;
        let version = self.client.get_api(&addr, ApiKey::AlterConfigs).await?;
        let req = alter_configs::AlterConfigsRequest {
            resources: resources
                .into_iter()
                .map(|(resource_type, resource_name, configs)| alter_configs::AlterConfigsResource {
                    resource_type,
                    resource_name,
                    configs,
                })
                .collect(),
            validate_only,
        };
        let resp = self
            .client
            .call_raw(&addr, ApiKey::AlterConfigs, version, |h| alter_configs::create_request(h, &req))
            .await?;
        Ok(alter_configs::parse_response(&resp, version)?.results)
    }

    pub async fn incremental_alter_configs(
        &self,
        resources: Vec<(i8, String, Vec<IncrementalConfigEntry>)>,
        validate_only: bool,
    ) -> Result<Vec<crate::protocol::admin::ResourceResult>> {
        let addr = self.controller_addr().await?;
        let version = self.client.get_api(&addr, ApiKey::IncrementalAlterConfigs).await?;
        let req = incremental_alter_configs::IncrementalAlterConfigsRequest {
            resources: resources
                .into_iter()
                .map(|(resource_type, resource_name, configs)| incremental_alter_configs::IncrementalAlterConfigsResource {
                    resource_type,
                    resource_name,
                    configs,
                })
                .collect(),
            validate_only,
        };
        let resp = self
            .client
            .call_raw(&addr, ApiKey::IncrementalAlterConfigs, version, |h| {
                incremental_alter_configs::create_request(h, &req)
            })
            .await?;
        Ok(incremental_alter_configs::parse_response(&resp, version)?.results)
    }

    pub async fn describe_acls(&self, filter: AclDescriptor) -> Result<Vec<AclDescriptor>> {
        let addr = self.controller_addr().await?;
        let version = self.client.get_api(&addr, ApiKey::DescribeAcls).await?;
        let req = acls::DescribeAclsRequest { filter };
        let resp = self
            .client
            .call_raw(&addr, ApiKey::DescribeAcls, version, |h| acls::describe_create_request(h, &req))
            .await?;
        let parsed = acls::describe_parse_response(&resp, version)?;
        if parsed.error_code != 0 {
            return Err(ErrorKind::Protocol(ApiKey::DescribeAcls, parsed.error_code.into()).into());
        }
        Ok(parsed.acls)
    }

    pub async fn create_acls(&self, creations: Vec<AclDescriptor>) -> Result<Vec<acls::AclCreationResult>> {
        let addr = self.controller_addr().await?;
        let version = self.client.get_api(&addr, ApiKey::CreateAcls).await?;
        let req = acls::CreateAclsRequest { creations };
        let resp = self
            .client
            .call_raw(&addr, ApiKey::CreateAcls, version, |h| acls::create_create_request(h, &req))
            .await?;
        Ok(acls::create_parse_response(&resp, version)?.results)
    }

    pub async fn delete_acls(&self, filters: Vec<AclDescriptor>) -> Result<Vec<acls::DeleteAclsFilterResult>> {
        let addr = self.controller_addr().await?;
        let version = self.client.get_api(&addr, ApiKey::DeleteAcls).await?;
        let req = acls::DeleteAclsRequest { filters };
        let resp = self
            .client
            .call_raw(&addr, ApiKey::DeleteAcls, version, |h| acls::delete_create_request(h, &req))
            .await?;
        Ok(acls::delete_parse_response(&resp, version)?.filter_results)
    }

    pub async fn list_groups(&self, states_filter: Vec<String>) -> Result<Vec<list_groups::ListedGroup>> {
        let addr = self.controller_addr().await?;
        let version = self.client.get_api(&addr, ApiKey::ListGroups).await?;
        let req = list_groups::ListGroupsRequest { states_filter };
        let resp = self
            .client
            .call_raw(&addr, ApiKey::ListGroups, version, |h| list_groups::create_request(h, &req))
            .await?;
        let parsed = list_groups::parse_response(&resp, version)?;
        if parsed.error_code != 0 {
            return Err(ErrorKind::Protocol(ApiKey::ListGroups, parsed.error_code.into()).into());
        }
        Ok(parsed.groups)
    }

    pub async fn describe_groups(&self, group_ids: Vec<String>, include_authorized_operations: bool) -> Result<Vec<describe_groups::DescribedGroup>> {
        let addr = self.controller_addr().await?;
        let version = self.client.get_api(&addr, ApiKey::DescribeGroups).await?;
        let req = describe_groups::DescribeGroupsRequest { group_ids, include_authorized_operations };
        let resp = self
            .client
            .call_raw(&addr, ApiKey::DescribeGroups, version, |h| describe_groups::create_request(h, &req))
            .await?;
        Ok(describe_groups::parse_response(&resp, version)?.groups)
    }

    pub async fn delete_groups(&self, group_ids: Vec<String>) -> Result<Vec<crate::protocol::admin::ResourceResult>> {
        let addr = self.controller_addr().await?;
        let version = self.client.get_api(&addr, ApiKey::DeleteGroups).await?;
        let req = crate::protocol::admin::delete_groups::DeleteGroupsRequest { group_ids };
        let resp = self
            .client
            .call_raw(&addr, ApiKey::DeleteGroups, version, |h| {
                crate::protocol::admin::delete_groups::create_request(h, &req)
            })
            .await?;
        Ok(crate::protocol::admin::delete_groups::parse_response(&resp, version)?.results)
    }

    pub async fn delete_records(
        &self,
        topics: Vec<delete_records::DeleteRecordsTopic>,
        timeout: Duration,
    ) -> Result<Vec<delete_records::DeleteRecordsTopicResult>> {
        let addr = self.controller_addr().await?;
        let version = self.client.get_api(&addr, ApiKey::DeleteRecords).await?;
        let req = delete_records::DeleteRecordsRequest { topics, timeout_ms: timeout.as_millis() as i32 };
        let resp = self
            .client
            .call_raw(&addr, ApiKey::DeleteRecords, version, |h| delete_records::create_request(h, &req))
            .await?;
        Ok(delete_records::parse_response(&resp, version)?.topics)
    }

    /// Lists committed offsets for `group_id`; `topics = None` asks the broker for every topic the
    /// group has ever committed to.
    pub async fn list_consumer_group_offsets(&self, group_id: &str, topics: Option<Vec<OffsetFetchTopic>>) -> Result<HashMap<String, Vec<OffsetFetchPartitionResponse>>> {
        let addr = self.coordinator_addr(group_id).await?;
        let version = self.client.get_api(&addr, ApiKey::OffsetFetch).await?;
        let req = OffsetFetchRequest { group_id: group_id.to_owned(), topics };
        let resp = self
            .client
            .call_raw(&addr, ApiKey::OffsetFetch, version, |h| offset_fetch::create_request(h, &req))
            .await?;
        let parsed = offset_fetch::parse_response(&resp, version)?;
        if parsed.error_code != 0 {
            return Err(ErrorKind::Protocol(ApiKey::OffsetFetch, parsed.error_code.into()).into());
        }
        Ok(parsed.topics.into_iter().map(|t| (t.topic, t.partitions)).collect())
    }

    pub async fn delete_consumer_group_offsets(
        &self,
        group_id: &str,
        topics: Vec<offset_delete::OffsetDeleteTopic>,
    ) -> Result<Vec<offset_delete::OffsetDeleteTopicResult>> {
        let addr = self.coordinator_addr(group_id).await?;
        let version = self.client.get_api(&addr, ApiKey::OffsetDelete).await?;
        let req = offset_delete::OffsetDeleteRequest { group_id: group_id.to_owned(), topics };
        let resp = self
            .client
            .call_raw(&addr, ApiKey::OffsetDelete, version, |h| offset_delete::create_request(h, &req))
            .await?;
        let parsed = offset_delete::parse_response(&resp, version)?;
        if parsed.error_code != 0 {
            return Err(ErrorKind::Protocol(ApiKey::OffsetDelete, parsed.error_code.into()).into());
        }
        Ok(parsed.topics)
    }

    pub async fn describe_log_dirs(&self, broker_id: i32, topics: Option<Vec<log_dirs::DescribeLogDirsTopic>>) -> Result<Vec<log_dirs::LogDirResult>> {
        let addr = self.client.broker_addr(broker_id).await?;
        let version = self.client.get_api(&addr, ApiKey::DescribeLogDirs).await?;
        let req = log_dirs::DescribeLogDirsRequest { topics };
        let resp = self
            .client
            .call_raw(&addr, ApiKey::DescribeLogDirs, version, |h| log_dirs::create_request(h, &req))
            .await?;
        Ok(log_dirs::parse_response(&resp, version)?.results)
    }

    pub async fn alter_partition_reassignments(
        &self,
        topics: Vec<AlterReassignmentsTopic>,
        timeout: Duration,
    ) -> Result<Vec<reassignments::AlterReassignmentsTopicResult>> {
        let addr = self.controller_addr().await?;
        let version = self.client.get_api(&addr, ApiKey::AlterPartitionReassignments).await?;
        let req = reassignments::AlterPartitionReassignmentsRequest { timeout_ms: timeout.as_millis() as i32, topics };
        let resp = self
            .client
            .call_raw(&addr, ApiKey::AlterPartitionReassignments, version, |h| {
                reassignments::alter_create_request(h, &req)
            })
            .await?;
        let parsed = reassignments::alter_parse_response(&resp, version)?;
        if parsed.error_code != 0 {
            return Err(ErrorKind::Protocol(ApiKey::AlterPartitionReassignments, parsed.error_code.into()).into());
        }
        Ok(parsed.responses)
    }

    pub async fn list_partition_reassignments(
        &self,
        topics: Option<Vec<ListReassignmentsTopic>>,
        timeout: Duration,
    ) -> Result<Vec<OngoingTopicReassignment>> {
        let addr = self.controller_addr().await?;
        let version = self.client.get_api(&addr, ApiKey::ListPartitionReassignments).await?;
        let req = reassignments::ListPartitionReassignmentsRequest { timeout_ms: timeout.as_millis() as i32, topics };
        let resp = self
            .client
            .call_raw(&addr, ApiKey::ListPartitionReassignments, version, |h| {
                reassignments::list_create_request(h, &req)
            })
            .await?;
        let parsed = reassignments::list_parse_response(&resp, version)?;
        if parsed.error_code != 0 {
            return Err(ErrorKind::Protocol(ApiKey::ListPartitionReassignments, parsed.error_code.into()).into());
        }
        Ok(parsed.topics)
    }

    pub async fn create_delegation_token(&self, renewers: Vec<TokenHolder>, max_lifetime: Duration) -> Result<delegation_tokens::CreateDelegationTokenResponse> {
        let addr = self.controller_addr().await?;
        let version = self.client.get_api(&addr, ApiKey::CreateDelegationToken).await?;
        let req = delegation_tokens::CreateDelegationTokenRequest {
            renewers,
            max_lifetime_ms: max_lifetime.as_millis() as i64,
        };
        let resp = self
            .client
            .call_raw(&addr, ApiKey::CreateDelegationToken, version, |h| delegation_tokens::create_create_request(h, &req))
            .await?;
        let parsed = delegation_tokens::create_parse_response(&resp, version)?;
        if parsed.error_code != 0 {
            return Err(ErrorKind::Protocol(ApiKey::CreateDelegationToken, parsed.error_code.into()).into());
        }
        Ok(parsed)
    }

    pub async fn renew_delegation_token(&self, hmac: Bytes, renew_period: Duration) -> Result<i64> {
        let addr = self.controller_addr().await?;
        let version = self.client.get_api(&addr, ApiKey::RenewDelegationToken).await?;
        let req = delegation_tokens::RenewOrExpireDelegationTokenRequest { hmac, period_ms: renew_period.as_millis() as i64 };
        let resp = self
            .client
            .call_raw(&addr, ApiKey::RenewDelegationToken, version, |h| delegation_tokens::renew_create_request(h, &req))
            .await?;
        let parsed = delegation_tokens::renew_parse_response(&resp, version)?;
        if parsed.error_code != 0 {
            return Err(ErrorKind::Protocol(ApiKey::RenewDelegationToken, parsed.error_code.into()).into());
        }
        Ok(parsed.expiry_timestamp)
    }

    pub async fn expire_delegation_token(&self, hmac: Bytes, expiry_period: Duration) -> Result<i64> {
        let addr = self.controller_addr().await?;
        let version = self.client.get_api(&addr, ApiKey::ExpireDelegationToken).await?;
        let req = delegation_tokens::RenewOrExpireDelegationTokenRequest { hmac, period_ms: expiry_period.as_millis() as i64 };
        let resp = self
            .client
            .call_raw(&addr, ApiKey::ExpireDelegationToken, version, |h| delegation_tokens::expire_create_request(h, &req))
            .await?;
        let parsed = delegation_tokens::expire_parse_response(&resp, version)?;
        if parsed.error_code != 0 {
            return Err(ErrorKind::Protocol(ApiKey::ExpireDelegationToken, parsed.error_code.into()).into());
        }
        Ok(parsed.expiry_timestamp)
    }

    pub async fn describe_delegation_tokens(&self, owners: Option<Vec<TokenHolder>>) -> Result<Vec<delegation_tokens::DescribedToken>> {
        let addr = self.controller_addr().await?;
        let version = self.client.get_api(&addr, ApiKey::DescribeDelegationToken).await?;
        let req = delegation_tokens::DescribeDelegationTokenRequest { owners };
        let resp = self
            .client
            .call_raw(&addr, ApiKey::DescribeDelegationToken, version, |h| delegation_tokens::describe_create_request(h, &req))
            .await?;
        let parsed = delegation_tokens::describe_parse_response(&resp, version)?;
        if parsed.error_code != 0 {
            return Err(ErrorKind::Protocol(ApiKey::DescribeDelegationToken, parsed.error_code.into()).into());
        }
        Ok(parsed.tokens)
    }

    pub async fn describe_client_quotas(&self, components: Vec<QuotaComponent>, strict: bool) -> Result<Vec<QuotaEntry>> {
        let addr = self.controller_addr().await?;
        let version = self.client.get_api(&addr, ApiKey::DescribeClientQuotas).await?;
        let req = quotas::DescribeClientQuotasRequest { components, strict };
        let resp = self
            .client
            .call_raw(&addr, ApiKey::DescribeClientQuotas, version, |h| quotas::describe_create_request(h, &req))
            .await?;
        let parsed = quotas::describe_parse_response(&resp, version)?;
        if parsed.error_code != 0 {
            return Err(ErrorKind::Protocol(ApiKey::DescribeClientQuotas, parsed.error_code.into()).into());
        }
        Ok(parsed.entries)
    }

    pub async fn alter_client_quotas(&self, entries: Vec<(Vec<QuotaEntityEntry>, Vec<QuotaOp>)>, validate_only: bool) -> Result<Vec<quotas::AlterQuotaEntryResult>> {
        let addr = self.controller_addr().await?;
        let version = self.client.get_api(&addr, ApiKey::AlterClientQuotas).await?;
        let req = quotas::AlterClientQuotasRequest {
            entries: entries
                .into_iter()
                .map(|(entity, ops)| quotas::AlterQuotaEntry { entity, ops })
                .collect(),
            validate_only,
        };
        let resp = self
            .client
            .call_raw(&addr, ApiKey::AlterClientQuotas, version, |h| quotas::alter_create_request(h, &req))
            .await?;
        Ok(quotas::alter_parse_response(&resp, version)?.entries)
    }

    pub async fn describe_features(&self) -> Result<features::DescribeFeaturesResponse> {
        let addr = self.controller_addr().await?;
        let version = self.client.get_api(&addr, ApiKey::DescribeFeatures).await?;
        let req = features::DescribeFeaturesRequest;
        let resp = self
            .client
            .call_raw(&addr, ApiKey::DescribeFeatures, version, |h| features::describe_create_request(h, &req))
            .await?;
        let parsed = features::describe_parse_response(&resp, version)?;
        if parsed.error_code != 0 {
            return Err(ErrorKind::Protocol(ApiKey::DescribeFeatures, parsed.error_code.into()).into());
        }
        Ok(parsed)
    }

    pub async fn update_features(&self, feature_updates: Vec<features::FeatureUpdate>, timeout: Duration) -> Result<Vec<crate::protocol::admin::ResourceResult>> {
        let addr = self.controller_addr().await?;
        let version = self.client.get_api(&addr, ApiKey::UpdateFeatures).await?;
        let req = features::UpdateFeaturesRequest { timeout_ms: timeout.as_millis() as i32, feature_updates };
        let resp = self
            .client
            .call_raw(&addr, ApiKey::UpdateFeatures, version, |h| features::update_create_request(h, &req))
            .await?;
        let parsed = features::update_parse_response(&resp, version)?;
        if parsed.error_code != 0 {
            return Err(ErrorKind::Protocol(ApiKey::UpdateFeatures, parsed.error_code.into()).into());
        }
        Ok(parsed.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientBuilder;

    fn admin() -> AdminClient {
        AdminClient::new(ClientBuilder::new(vec!["localhost:9092".into()]).build())
    }

    /// Construction alone shouldn't require any network I/O; every method below suspends only
    /// once it needs a controller/coordinator lookup.
    #[test]
    fn construction_does_not_touch_the_network() {
        let _admin = admin();
    }
}

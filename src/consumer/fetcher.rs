//! Fetch pump (§4.7): one `Fetch` per broker per poll, covering every assigned, non-paused
//! partition that broker leads; decoded record batches turn into `ConsumerRecord`s and advance
//! each partition's position.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Mutex;

use crate::client::BaseClient;
use crate::consumer::config::ConsumerConfig;
use crate::consumer::subscriptions::Subscriptions;
use crate::errors::{ErrorKind, Result};
use crate::protocol::fetch::{self, FetchPartition, FetchRequest, FetchTopic};
use crate::protocol::list_offsets::{self, ListOffsetsPartition, ListOffsetsRequest, ListOffsetsTopic, EARLIEST_TIMESTAMP, LATEST_TIMESTAMP};
use crate::protocol::record::Header;
use crate::protocol::{ApiKey, TopicPartition};

/// One decoded record, delivered to the application (§4.7's stream contract). `commit()` lives on
/// the consumer façade rather than here, since acknowledging a record is a group-membership
/// operation, not a property of the bytes themselves.
#[derive(Debug, Clone)]
pub struct ConsumerRecord {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub timestamp: i64,
    pub key: Option<Bytes>,
    pub value: Option<Bytes>,
    pub headers: Vec<Header>,
}

pub struct Fetcher {
    client: Arc<BaseClient>,
    config: ConsumerConfig,
    subscriptions: Arc<Mutex<Subscriptions>>,
}

impl Fetcher {
    pub fn new(client: Arc<BaseClient>, config: ConsumerConfig, subscriptions: Arc<Mutex<Subscriptions>>) -> Self {
        Fetcher {
            client,
            config,
            subscriptions,
        }
    }

    /// Resolves `earliest`/`latest`/`committed`+`fallbackMode` into a concrete offset and seeks
    /// `tp` there, for a partition with no usable starting position yet.
    pub async fn reset_offset(&self, tp: &TopicPartition, timestamp: i64) -> Result<()> {
        let addr = self.client.leader_for(tp).await?;
        let version = self.client.get_api(&addr, ApiKey::ListOffsets).await?;
        let req = ListOffsetsRequest {
            replica_id: -1,
            isolation_level: self.config.isolation_level.code(),
            topics: vec![ListOffsetsTopic {
                topic: tp.topic.clone(),
                partitions: vec![ListOffsetsPartition {
                    partition: tp.partition,
                    current_leader_epoch: -1,
                    timestamp,
                }],
            }],
        };
        let resp = self
            .client
            .call_raw(&addr, ApiKey::ListOffsets, version, |h| list_offsets::create_request(h, &req))
            .await?;
        let parsed = list_offsets::parse_response(&resp, version)?;
        let partition = parsed
            .topics
            .into_iter()
            .flat_map(|t| t.partitions)
            .find(|p| p.partition == tp.partition)
            .ok_or_else(|| ErrorKind::BrokerNotFound(format!("{}-{} missing from ListOffsets response", tp.topic, tp.partition)))?;
        if partition.error_code != 0 {
            return Err(ErrorKind::Protocol(ApiKey::ListOffsets, partition.error_code.into()).into());
        }
        self.subscriptions.lock().await.seek(tp, partition.offset.max(0));
        Ok(())
    }

    pub async fn reset_to_earliest(&self, tp: &TopicPartition) -> Result<()> {
        self.reset_offset(tp, EARLIEST_TIMESTAMP).await
    }

    pub async fn reset_to_latest(&self, tp: &TopicPartition) -> Result<()> {
        self.reset_offset(tp, LATEST_TIMESTAMP).await
    }

    /// One round of `Fetch` against every broker leading an assigned, unpaused partition; returns
    /// whatever records came back, grouped in arrival order per partition.
    pub async fn poll(&self) -> Result<Vec<ConsumerRecord>> {
        let by_broker = self.group_by_leader().await?;
        if by_broker.is_empty() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for (addr, topics) in by_broker {
            records.extend(self.fetch_from(&addr, topics).await?);
        }
        Ok(records)
    }

    async fn group_by_leader(&self) -> Result<HashMap<String, Vec<FetchTopic>>> {
        let assigned: Vec<(TopicPartition, i64, i32)> = {
            let subs = self.subscriptions.lock().await;
            subs.assigned_partitions()
                .filter_map(|tp| {
                    let state = subs.state(tp)?;
                    if state.paused {
                        return None;
                    }
                    Some((tp.clone(), state.fetch_offset, state.last_fetched_epoch))
                })
                .collect()
        };

        let mut by_broker: HashMap<String, HashMap<String, Vec<FetchPartition>>> = HashMap::new();
        for (tp, fetch_offset, current_leader_epoch) in assigned {
            let addr = match self.client.leader_for(&tp).await {
                Ok(addr) => addr,
                Err(_) => continue, // leader unknown this round; picked up again on the next poll
            };
            by_broker.entry(addr).or_default().entry(tp.topic).or_default().push(FetchPartition {
                partition: tp.partition,
                current_leader_epoch,
                fetch_offset,
                partition_max_bytes: self.config.partition_fetch_max_bytes,
            });
        }

        Ok(by_broker
            .into_iter()
            .map(|(addr, topics)| {
                (
                    addr,
                    topics
                        .into_iter()
                        .map(|(topic, partitions)| FetchTopic { topic, partitions })
                        .collect(),
                )
            })
            .collect())
    }

    async fn fetch_from(&self, addr: &str, topics: Vec<FetchTopic>) -> Result<Vec<ConsumerRecord>> {
        let version = self.client.get_api(addr, ApiKey::Fetch).await?;
        let req = FetchRequest {
            replica_id: -1,
            max_wait_ms: self.config.fetch_max_wait.as_millis() as i32,
            min_bytes: self.config.fetch_min_bytes,
            max_bytes: self.config.fetch_max_bytes,
            isolation_level: self.config.isolation_level.code(),
            topics,
        };
        let resp = self
            .client
            .call_raw(addr, ApiKey::Fetch, version, |h| fetch::create_request(h, &req))
            .await?;
        let parsed = fetch::parse_response(&resp, version)?;

        let mut records = Vec::new();
        for topic in parsed.topics {
            for partition in topic.partitions {
                let tp = TopicPartition::new(topic.topic.clone(), partition.partition);
                if partition.error_code != 0 {
                    continue; // surfaced on the next ListOffsets/JoinGroup cycle via leader_for
                }

                let mut last_offset = None;
                let mut last_epoch = -1;
                for batch in &partition.batches {
                    for record in &batch.records {
                        let offset = batch.base_offset + record.offset_delta as i64;
                        records.push(ConsumerRecord {
                            topic: tp.topic.clone(),
                            partition: tp.partition,
                            offset,
                            timestamp: batch.first_timestamp + record.timestamp_delta,
                            key: record.key.clone(),
                            value: record.value.clone(),
                            headers: record.headers.clone(),
                        });
                        last_offset = Some(offset);
                    }
                    last_epoch = batch.partition_leader_epoch;
                }

                if let Some(offset) = last_offset {
                    self.subscriptions.lock().await.advance(&tp, offset + 1, last_epoch);
                }
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientBuilder;

    fn fetcher() -> Fetcher {
        let client = ClientBuilder::new(vec!["localhost:9092".into()]).build();
        let config = ConsumerConfig::new(vec!["localhost:9092".into()], "g1");
        Fetcher::new(client, config, Arc::new(Mutex::new(Subscriptions::new(vec!["orders".into()]))))
    }

    #[tokio::test]
    async fn poll_with_no_assigned_partitions_returns_empty() {
        let fetcher = fetcher();
        let records = fetcher.poll().await.unwrap();
        assert!(records.is_empty());
    }
}

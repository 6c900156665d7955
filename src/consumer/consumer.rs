//! `KafkaConsumer` (§4.7): ties group membership, the fetch pump, and offset management together.
//! A background task keeps the group alive between `poll()` calls; `poll()` itself drives
//! rejoin-on-rebalance, position initialization for newly assigned partitions, delivery, and
//! autocommit.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::client::BaseClient;
use crate::consumer::config::{ConsumerConfig, OffsetResetStrategy, StartMode};
use crate::consumer::coordinator::{Coordinator, GroupState};
use crate::consumer::fetcher::{ConsumerRecord, Fetcher};
use crate::consumer::subscriptions::Subscriptions;
use crate::errors::{ErrorKind, Result};
use crate::protocol::offset_commit::{self, OffsetCommitPartition, OffsetCommitRequest, OffsetCommitTopic};
use crate::protocol::offset_fetch::{self, OffsetFetchRequest, OffsetFetchTopic};
use crate::protocol::{ApiKey, TopicPartition};

#[async_trait::async_trait]
pub trait Consumer: Send + Sync {
    async fn poll(&self) -> Result<Vec<ConsumerRecord>>;
    async fn commit(&self, record: &ConsumerRecord) -> Result<()>;
    async fn close(&self, force: bool) -> Result<()>;
}

pub struct KafkaConsumer {
    client: Arc<BaseClient>,
    config: ConsumerConfig,
    topics: Vec<String>,
    coordinator: Arc<dyn Coordinator>,
    subscriptions: Arc<Mutex<Subscriptions>>,
    fetcher: Fetcher,
    cancel: CancellationToken,
    background: Mutex<Option<JoinHandle<()>>>,
    last_autocommit: Mutex<Instant>,
}

impl KafkaConsumer {
    pub fn new(client: Arc<BaseClient>, config: ConsumerConfig, topics: Vec<String>, coordinator: Arc<dyn Coordinator>) -> Self {
        let subscriptions = Arc::new(Mutex::new(Subscriptions::new(topics.clone())));
        let fetcher = Fetcher::new(client.clone(), config.clone(), subscriptions.clone());
        KafkaConsumer {
            client,
            config,
            topics,
            coordinator,
            subscriptions,
            fetcher,
            cancel: CancellationToken::new(),
            background: Mutex::new(None),
            last_autocommit: Mutex::new(Instant::now()),
        }
    }

    /// Starts the background heartbeat loop. Idempotent.
    pub async fn start(self: &Arc<Self>) {
        let mut guard = self.background.lock().await;
        if guard.is_some() {
            return;
        }
        let consumer = self.clone();
        let cancel = self.cancel.clone();
        let interval = self.config.heartbeat_interval;
        *guard = Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = cancel.cancelled() => break,
                }
                let state = consumer.coordinator.state().await;
                if state != GroupState::Stable {
                    continue;
                }
                if let Err(e) = consumer.coordinator.heartbeat().await {
                    warn!(error = %e, "heartbeat failed");
                }
            }
        }));
    }

    async fn rejoin_if_needed(&self) -> Result<()> {
        let state = self.coordinator.state().await;
        if matches!(state, GroupState::Stable) {
            return Ok(());
        }

        let join = self.coordinator.ensure_active_group().await?;
        let assigned: Vec<TopicPartition> = join
            .assignment
            .into_iter()
            .flat_map(|(topic, partitions)| partitions.into_iter().map(move |p| TopicPartition::new(topic.clone(), p)))
            .collect();
        self.subscriptions.lock().await.assign(assigned.clone());
        self.initialize_positions(&assigned).await?;
        Ok(())
    }

    /// Seeds `fetch_offset` for every newly assigned partition per `mode`/`fallback_mode`.
    async fn initialize_positions(&self, assigned: &[TopicPartition]) -> Result<()> {
        match self.config.mode {
            StartMode::Earliest => {
                for tp in assigned {
                    self.fetcher.reset_to_earliest(tp).await?;
                }
            }
            StartMode::Latest => {
                for tp in assigned {
                    self.fetcher.reset_to_latest(tp).await?;
                }
            }
            StartMode::Committed => self.seek_to_committed_or_fallback(assigned).await?,
        }
        Ok(())
    }

    async fn seek_to_committed_or_fallback(&self, assigned: &[TopicPartition]) -> Result<()> {
        let mut by_topic: HashMap<String, Vec<i32>> = HashMap::new();
        for tp in assigned {
            by_topic.entry(tp.topic.clone()).or_default().push(tp.partition);
        }
        let node_id = self.client.group_coordinator(&self.config.group_id).await?;
        let addr = self.client.broker_addr(node_id).await?;
        let version = self.client.get_api(&addr, ApiKey::OffsetFetch).await?;
        let req = OffsetFetchRequest {
            group_id: self.config.group_id.clone(),
            topics: Some(
                by_topic
                    .into_iter()
                    .map(|(topic, partitions)| OffsetFetchTopic { topic, partitions })
                    .collect(),
            ),
        };
        let resp = self
            .client
            .call_raw(&addr, ApiKey::OffsetFetch, version, |h| offset_fetch::create_request(h, &req))
            .await?;
        let parsed = offset_fetch::parse_response(&resp, version)?;
        if parsed.error_code != 0 {
            return Err(ErrorKind::Protocol(ApiKey::OffsetFetch, parsed.error_code.into()).into());
        }

        let mut committed: HashMap<TopicPartition, i64> = HashMap::new();
        for topic in parsed.topics {
            for partition in topic.partitions {
                if partition.error_code == 0 && partition.committed_offset >= 0 {
                    committed.insert(TopicPartition::new(topic.topic.clone(), partition.partition), partition.committed_offset);
                }
            }
        }

        for tp in assigned {
            match committed.get(tp) {
                Some(&offset) => self.subscriptions.lock().await.seek(tp, offset),
                None => match self.config.fallback_mode {
                    OffsetResetStrategy::Earliest => self.fetcher.reset_to_earliest(tp).await?,
                    OffsetResetStrategy::Latest => self.fetcher.reset_to_latest(tp).await?,
                },
            }
        }
        Ok(())
    }

    async fn maybe_autocommit(&self) -> Result<()> {
        if !self.config.auto_commit {
            return Ok(());
        }
        let mut last = self.last_autocommit.lock().await;
        if last.elapsed() < self.config.auto_commit_interval {
            return Ok(());
        }
        *last = Instant::now();
        drop(last);
        self.commit_all().await
    }

    /// Commits every assigned partition's current position.
    pub async fn commit_all(&self) -> Result<()> {
        let positions: Vec<(TopicPartition, i64)> = {
            let subs = self.subscriptions.lock().await;
            subs.assigned_partitions()
                .filter_map(|tp| subs.state(tp).map(|s| (tp.clone(), s.position)))
                .collect()
        };
        if positions.is_empty() {
            return Ok(());
        }
        self.commit_offsets(positions).await
    }

    async fn commit_offsets(&self, positions: Vec<(TopicPartition, i64)>) -> Result<()> {
        let mut by_topic: HashMap<String, Vec<OffsetCommitPartition>> = HashMap::new();
        for (tp, offset) in positions {
            by_topic.entry(tp.topic).or_default().push(OffsetCommitPartition {
                partition: tp.partition,
                committed_offset: offset,
                committed_leader_epoch: -1,
                metadata: None,
            });
        }

        let (member_id, generation_id) = self.coordinator.membership().await;
        let req = OffsetCommitRequest {
            group_id: self.config.group_id.clone(),
            generation_id,
            member_id,
            group_instance_id: self.config.group_instance_id.clone(),
            topics: by_topic
                .into_iter()
                .map(|(topic, partitions)| OffsetCommitTopic { topic, partitions })
                .collect(),
        };

        let node_id = self.client.group_coordinator(&self.config.group_id).await?;
        let addr = self.client.broker_addr(node_id).await?;
        let version = self.client.get_api(&addr, ApiKey::OffsetCommit).await?;
        let resp = self
            .client
            .call_raw(&addr, ApiKey::OffsetCommit, version, |h| offset_commit::create_request(h, &req))
            .await?;
        let parsed = offset_commit::parse_response(&resp, version)?;
        for topic in parsed.topics {
            for partition in topic.partitions {
                if partition.error_code != 0 {
                    return Err(ErrorKind::Protocol(ApiKey::OffsetCommit, partition.error_code.into()).into());
                }
            }
        }
        Ok(())
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }
}

#[async_trait::async_trait]
impl Consumer for KafkaConsumer {
    /// One poll round: rejoins the group if it isn't stable, fetches from every assigned
    /// partition, caps the batch at `max_poll_records`, and autocommits if due.
    async fn poll(&self) -> Result<Vec<ConsumerRecord>> {
        if let Err(e) = self.rejoin_if_needed().await {
            let flags = e.flags();
            if flags.rebalance_in_progress || flags.needs_rejoin {
                return Ok(Vec::new()); // next poll retries the join
            }
            return Err(e);
        }

        let mut records = self.fetcher.poll().await?;
        if records.len() > self.config.max_poll_records {
            records.truncate(self.config.max_poll_records);
        }
        self.maybe_autocommit().await?;
        Ok(records)
    }

    /// Commits `record.offset + 1` for its partition — the offset of the next record to read.
    async fn commit(&self, record: &ConsumerRecord) -> Result<()> {
        let tp = TopicPartition::new(record.topic.clone(), record.partition);
        self.commit_offsets(vec![(tp, record.offset + 1)]).await
    }

    /// `close(force)` (§4.7): a graceful close drains autocommit before leaving; `force` skips
    /// straight to tearing the group membership down.
    async fn close(&self, force: bool) -> Result<()> {
        self.cancel.cancel();
        if let Some(handle) = self.background.lock().await.take() {
            let _ = handle.await;
        }
        if !force && self.config.auto_commit {
            if let Err(e) = self.commit_all().await {
                warn!(error = %e, "final autocommit on close failed");
            }
        }
        self.coordinator.leave(force).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientBuilder;
    use crate::consumer::assignor::RangeAssignor;
    use crate::consumer::coordinator::ConsumerCoordinator;

    fn consumer() -> KafkaConsumer {
        let client = ClientBuilder::new(vec!["localhost:9092".into()]).build();
        let config = ConsumerConfig::new(vec!["localhost:9092".into()], "g1");
        let coordinator: Arc<dyn Coordinator> = Arc::new(ConsumerCoordinator::new(
            client.clone(),
            config.clone(),
            vec!["orders".into()],
            vec![Box::new(RangeAssignor)],
        ));
        KafkaConsumer::new(client, config, vec!["orders".into()], coordinator)
    }

    #[tokio::test]
    async fn commit_all_with_no_assigned_partitions_is_a_no_op() {
        let consumer = consumer();
        consumer.commit_all().await.unwrap();
    }

    #[tokio::test]
    async fn close_forced_skips_autocommit_and_leave_rpc() {
        let consumer = consumer();
        consumer.close(true).await.unwrap();
    }

    #[test]
    fn topics_returns_the_configured_subscription() {
        let consumer = consumer();
        assert_eq!(consumer.topics(), &["orders".to_owned()]);
    }
}

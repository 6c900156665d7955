//! `KafkaProducer` (§4.8): ties partitioning, batching, idempotence, and transactions together
//! over a shared `BaseClient`. A background task drains lingered/full batches; `flush` and the
//! transaction boundary methods force a drain of everything outstanding.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::client::BaseClient;
use crate::compression::Compression;
use crate::errors::{ErrorKind, Result};
use crate::producer::accumulator::{Accumulator, PushRecord};
use crate::producer::batch::ProducerBatch;
use crate::producer::config::ProducerConfig;
use crate::producer::idempotent::{IdempotentState, ProducerIdentity};
use crate::producer::interceptor::ProducerInterceptors;
use crate::producer::partitioner::{DefaultPartitioner, Partitioner};
use crate::producer::record::{ProducerRecord, RecordMetadata};
use crate::producer::transaction::TransactionManager;
use crate::protocol::add_offsets_to_txn::{self, AddOffsetsToTxnRequest};
use crate::protocol::add_partitions_to_txn::{self, AddPartitionsToTxnRequest, TxnTopicPartitions};
use crate::protocol::end_txn::{self, EndTxnRequest};
use crate::protocol::init_producer_id::{self, InitProducerIdRequest};
use crate::protocol::produce::{self, PartitionProduceData, ProduceRequest, TopicProduceData};
use crate::protocol::record::RecordBatch as WireRecordBatch;
use crate::protocol::txn_offset_commit::{
    self, TxnOffsetCommitPartition, TxnOffsetCommitRequest, TxnOffsetCommitTopic,
};
use crate::protocol::{ApiKey, TopicPartition};

/// Produce, send, and flush operations every producer exposes regardless of idempotence mode.
#[async_trait::async_trait]
pub trait Producer: Send + Sync {
    async fn send(&self, record: ProducerRecord) -> Result<SendRecord>;
    async fn flush(&self) -> Result<()>;
}

/// A handle to one in-flight send; resolves once the containing batch has been acknowledged.
pub type SendRecord = oneshot::Receiver<Result<RecordMetadata>>;

fn parse_compression(name: &str) -> Result<Compression> {
    match name {
        "none" => Ok(Compression::None),
        "gzip" => Ok(Compression::Gzip),
        "snappy" => Ok(Compression::Snappy),
        "lz4" => Ok(Compression::Lz4),
        "zstd" => Ok(Compression::Zstd),
        other => Err(ErrorKind::User(format!("unknown compression codec {:?}", other)).into()),
    }
}

pub struct KafkaProducer {
    client: Arc<BaseClient>,
    config: ProducerConfig,
    partitioner: Box<dyn Partitioner>,
    accumulator: Arc<Accumulator>,
    idempotent: IdempotentState,
    transaction: Option<TransactionManager>,
    interceptors: ProducerInterceptors,
    cancel: CancellationToken,
    background: Mutex<Option<JoinHandle<()>>>,
    in_flight: Mutex<HashMap<TopicPartition, Arc<Semaphore>>>,
}

impl KafkaProducer {
    pub fn new(client: Arc<BaseClient>, config: ProducerConfig) -> Self {
        let transaction = config.transactional_id.clone().map(TransactionManager::new);
        KafkaProducer {
            accumulator: Arc::new(Accumulator::new(config.batch_size, config.linger)),
            idempotent: IdempotentState::new(),
            transaction,
            interceptors: ProducerInterceptors::new(),
            cancel: CancellationToken::new(),
            partitioner: Box::new(DefaultPartitioner::new()),
            client,
            config,
            background: Mutex::new(None),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_partitioner(mut self, partitioner: Box<dyn Partitioner>) -> Self {
        self.partitioner = partitioner;
        self
    }

    /// Batches in flight per partition at once (§5): pinned to 1 once idempotence is enabled, so
    /// sequence numbers are assigned and acknowledged strictly in order, otherwise the configured
    /// `max_in_flight_per_connection`.
    fn max_in_flight(&self) -> usize {
        if self.config.requires_idempotence() {
            1
        } else {
            self.config.max_in_flight_per_connection.max(1)
        }
    }

    /// Acquires this partition's in-flight slot, blocking until an earlier batch for the same
    /// partition has been acknowledged. Held by the caller until that partition's batch completes.
    async fn in_flight_permit(&self, tp: &TopicPartition) -> OwnedSemaphorePermit {
        let semaphore = {
            let mut guard = self.in_flight.lock().await;
            guard
                .entry(tp.clone())
                .or_insert_with(|| Arc::new(Semaphore::new(self.max_in_flight())))
                .clone()
        };
        semaphore.acquire_owned().await.expect("in-flight semaphore is never closed")
    }

    /// Starts the background task that drains lingered or oversized batches. Idempotent: calling
    /// this twice leaves the first task running and drops the second no-op.
    pub async fn start(self: &Arc<Self>) {
        let mut guard = self.background.lock().await;
        if guard.is_some() {
            return;
        }
        let producer = self.clone();
        let cancel = self.cancel.clone();
        let tick = self.config.linger.max(Duration::from_millis(10));
        *guard = Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(tick) => {}
                    _ = cancel.cancelled() => break,
                }
                if let Err(e) = producer.drain_and_send(false).await {
                    warn!(error = %e, "background batch drain failed");
                }
            }
        }));
    }

    pub async fn stop(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.background.lock().await.take() {
            let _ = handle.await;
        }
    }

    /// Performs `InitProducerId`, required before any send when idempotence or transactions are
    /// requested. With a transactional id, this also opens the transaction.
    pub async fn init_transactions(&self) -> Result<()> {
        if !self.config.requires_idempotence() {
            return Ok(());
        }
        let addr = self.coordinator_addr().await?;
        let version = self.client.get_api(&addr, ApiKey::InitProducerId).await?;
        let req = InitProducerIdRequest {
            transactional_id: self.config.transactional_id.clone(),
            transaction_timeout_ms: self.config.transaction_timeout.as_millis() as i32,
            producer_id: -1,
            producer_epoch: -1,
        };
        let resp = self
            .client
            .call_raw(&addr, ApiKey::InitProducerId, version, |h| {
                init_producer_id::create_request(h, &req)
            })
            .await?;
        let parsed = init_producer_id::parse_response(&resp, version)?;
        if parsed.error_code != 0 {
            return Err(ErrorKind::Protocol(ApiKey::InitProducerId, parsed.error_code.into()).into());
        }
        self.idempotent
            .set_identity(ProducerIdentity {
                producer_id: parsed.producer_id,
                producer_epoch: parsed.producer_epoch,
            })
            .await;
        if let Some(txn) = &self.transaction {
            txn.begin().await?;
        }
        Ok(())
    }

    async fn coordinator_addr(&self) -> Result<String> {
        match &self.config.transactional_id {
            Some(id) => {
                let node_id = self.client.transaction_coordinator(id).await?;
                self.client.broker_addr(node_id).await
            }
            None => {
                let snapshot = self.client.metadata(None, false, false).await?;
                snapshot
                    .brokers
                    .first()
                    .map(|b| format!("{}:{}", b.host, b.port))
                    .ok_or_else(|| ErrorKind::BrokerNotFound("no brokers in cluster metadata".into()).into())
            }
        }
    }

    /// Resolves the partition for `record` (explicit, keyed-hash, or round-robin), registers it
    /// with the transaction coordinator the first time it's touched, and queues it.
    pub async fn send(&self, record: ProducerRecord) -> Result<SendRecord> {
        let record = self.interceptors.on_send(record);

        let partition = match record.partition {
            Some(p) => p,
            None => {
                let snapshot = self.client.metadata(Some(vec![record.topic.clone()]), true, false).await?;
                let partitions: Vec<i32> = snapshot
                    .topics
                    .get(&record.topic)
                    .map(|t| {
                        t.partitions
                            .iter()
                            .filter(|p| p.leader_id >= 0)
                            .map(|p| p.partition_index)
                            .collect()
                    })
                    .unwrap_or_default();
                if partitions.is_empty() {
                    return Err(ErrorKind::BrokerNotFound(format!("no partitions with a leader for {}", record.topic)).into());
                }
                self.partitioner.partition(record.key.as_deref(), &partitions)
            }
        };

        let tp = TopicPartition::new(record.topic.clone(), partition);
        if let Some(txn) = &self.transaction {
            let fresh = txn.partitions_needing_registration(&[tp.clone()]).await?;
            if !fresh.is_empty() {
                self.add_partitions_to_txn(&fresh).await?;
            }
        }

        let timestamp = record.timestamp.unwrap_or_else(now_millis);
        let rx = self
            .accumulator
            .push(PushRecord {
                topic: record.topic,
                partition,
                key: record.key,
                value: record.value,
                timestamp,
                headers: record.headers,
            })
            .await;
        Ok(rx)
    }

    async fn add_partitions_to_txn(&self, partitions: &[TopicPartition]) -> Result<()> {
        let txn = self.transaction.as_ref().expect("called only when transactional");
        let identity = self
            .idempotent
            .identity()
            .await
            .ok_or_else(|| ErrorKind::User("init_transactions must run before sending".into()))?;

        let mut by_topic: HashMap<String, Vec<i32>> = HashMap::new();
        for tp in partitions {
            by_topic.entry(tp.topic.clone()).or_default().push(tp.partition);
        }
        let req = AddPartitionsToTxnRequest {
            transactional_id: txn.transactional_id().to_owned(),
            producer_id: identity.producer_id,
            producer_epoch: identity.producer_epoch,
            topics: by_topic
                .into_iter()
                .map(|(topic, partitions)| TxnTopicPartitions { topic, partitions })
                .collect(),
        };

        let addr = self.coordinator_addr().await?;
        let version = self.client.get_api(&addr, ApiKey::AddPartitionsToTxn).await?;
        let resp = self
            .client
            .call_raw(&addr, ApiKey::AddPartitionsToTxn, version, |h| {
                add_partitions_to_txn::create_request(h, &req)
            })
            .await?;
        let parsed = add_partitions_to_txn::parse_response(&resp, version)?;
        for topic in &parsed.topics {
            for partition in &topic.partitions {
                if partition.error_code != 0 {
                    return Err(ErrorKind::Protocol(ApiKey::AddPartitionsToTxn, partition.error_code.into()).into());
                }
            }
        }
        Ok(())
    }

    /// `sendOffsetsToTransaction` (§4.8): ties a consumer group's offsets to this transaction so
    /// they only become visible if the transaction commits.
    pub async fn send_offsets_to_transaction(
        &self,
        group_id: &str,
        offsets: &HashMap<TopicPartition, i64>,
    ) -> Result<()> {
        let txn = self
            .transaction
            .as_ref()
            .ok_or_else(|| ErrorKind::User("send_offsets_to_transaction requires a transactional producer".into()))?;
        let identity = self
            .idempotent
            .identity()
            .await
            .ok_or_else(|| ErrorKind::User("init_transactions must run before committing offsets".into()))?;

        if txn.needs_group_registration(group_id).await? {
            let addr = self.coordinator_addr().await?;
            let version = self.client.get_api(&addr, ApiKey::AddOffsetsToTxn).await?;
            let req = AddOffsetsToTxnRequest {
                transactional_id: txn.transactional_id().to_owned(),
                producer_id: identity.producer_id,
                producer_epoch: identity.producer_epoch,
                group_id: group_id.to_owned(),
            };
            let resp = self
                .client
                .call_raw(&addr, ApiKey::AddOffsetsToTxn, version, |h| {
                    add_offsets_to_txn::create_request(h, &req)
                })
                .await?;
            let parsed = add_offsets_to_txn::parse_response(&resp, version)?;
            if parsed.error_code != 0 {
                return Err(ErrorKind::Protocol(ApiKey::AddOffsetsToTxn, parsed.error_code.into()).into());
            }
        }

        let mut by_topic: HashMap<String, Vec<TxnOffsetCommitPartition>> = HashMap::new();
        for (tp, offset) in offsets {
            by_topic.entry(tp.topic.clone()).or_default().push(TxnOffsetCommitPartition {
                partition: tp.partition,
                committed_offset: *offset,
                committed_leader_epoch: -1,
                metadata: None,
            });
        }
        let req = TxnOffsetCommitRequest {
            transactional_id: txn.transactional_id().to_owned(),
            group_id: group_id.to_owned(),
            producer_id: identity.producer_id,
            producer_epoch: identity.producer_epoch,
            generation_id: -1,
            member_id: String::new(),
            group_instance_id: None,
            topics: by_topic
                .into_iter()
                .map(|(topic, partitions)| TxnOffsetCommitTopic { topic, partitions })
                .collect(),
        };
        let group_coordinator = self.client.group_coordinator(group_id).await?;
        let addr = self.client.broker_addr(group_coordinator).await?;
        let version = self.client.get_api(&addr, ApiKey::TxnOffsetCommit).await?;
        let resp = self
            .client
            .call_raw(&addr, ApiKey::TxnOffsetCommit, version, |h| {
                txn_offset_commit::create_request(h, &req)
            })
            .await?;
        let parsed = txn_offset_commit::parse_response(&resp, version)?;
        for topic in &parsed.topics {
            for partition in &topic.partitions {
                if partition.error_code != 0 {
                    return Err(ErrorKind::Protocol(ApiKey::TxnOffsetCommit, partition.error_code.into()).into());
                }
            }
        }
        Ok(())
    }

    pub async fn commit_transaction(&self) -> Result<()> {
        self.flush().await?;
        let txn = self
            .transaction
            .as_ref()
            .ok_or_else(|| ErrorKind::User("commit_transaction requires a transactional producer".into()))?;
        txn.begin_commit().await?;
        self.end_txn(true).await?;
        txn.complete().await;
        Ok(())
    }

    pub async fn abort_transaction(&self) -> Result<()> {
        let txn = self
            .transaction
            .as_ref()
            .ok_or_else(|| ErrorKind::User("abort_transaction requires a transactional producer".into()))?;
        txn.begin_abort().await?;
        // Abandon anything still queued rather than shipping it under the aborted transaction.
        let abandoned = self.accumulator.drain_ready(true).await;
        for (_, batch) in abandoned {
            batch.complete(String::new(), 0, 0, Some("transaction aborted".into()));
        }
        self.end_txn(false).await?;
        txn.complete().await;
        Ok(())
    }

    async fn end_txn(&self, committed: bool) -> Result<()> {
        let txn = self.transaction.as_ref().expect("called only when transactional");
        let identity = self
            .idempotent
            .identity()
            .await
            .ok_or_else(|| ErrorKind::User("init_transactions must run first".into()))?;
        let req = EndTxnRequest {
            transactional_id: txn.transactional_id().to_owned(),
            producer_id: identity.producer_id,
            producer_epoch: identity.producer_epoch,
            committed,
        };
        let addr = self.coordinator_addr().await?;
        let version = self.client.get_api(&addr, ApiKey::EndTxn).await?;
        let resp = self
            .client
            .call_raw(&addr, ApiKey::EndTxn, version, |h| end_txn::create_request(h, &req))
            .await?;
        let parsed = end_txn::parse_response(&resp, version)?;
        if parsed.error_code != 0 {
            return Err(ErrorKind::Protocol(ApiKey::EndTxn, parsed.error_code.into()).into());
        }
        Ok(())
    }

    /// Forces every outstanding batch out immediately and waits for its acknowledgement.
    pub async fn flush(&self) -> Result<()> {
        self.drain_and_send(true).await
    }

    async fn drain_and_send(&self, force: bool) -> Result<()> {
        let ready = self.accumulator.drain_ready(force).await;
        if ready.is_empty() {
            return Ok(());
        }

        let mut by_addr: HashMap<String, Vec<(TopicPartition, ProducerBatch, OwnedSemaphorePermit)>> = HashMap::new();
        for (tp, batch) in ready {
            match self.client.leader_for(&tp).await {
                Ok(addr) => {
                    let permit = self.in_flight_permit(&tp).await;
                    by_addr.entry(addr).or_default().push((tp, batch, permit));
                }
                Err(e) => batch.complete(tp.topic, 0, 0, Some(e.to_string())),
            }
        }

        for (addr, batches) in by_addr {
            self.send_to_broker(&addr, batches).await?;
        }
        Ok(())
    }

    async fn send_to_broker(
        &self,
        addr: &str,
        batches: Vec<(TopicPartition, ProducerBatch, OwnedSemaphorePermit)>,
    ) -> Result<()> {
        let compression = parse_compression(&self.config.compression)?;
        let identity = if self.config.requires_idempotence() {
            Some(
                self.idempotent
                    .identity()
                    .await
                    .ok_or_else(|| ErrorKind::User("init_transactions must run before sending".into()))?,
            )
        } else {
            None
        };

        let mut by_topic: HashMap<String, Vec<PartitionProduceData>> = HashMap::new();
        let mut batches_by_tp: HashMap<TopicPartition, (ProducerBatch, OwnedSemaphorePermit)> = HashMap::new();
        for (tp, batch, permit) in batches {
            let (producer_id, producer_epoch, base_sequence) = match identity {
                Some(id) => {
                    let base = self.idempotent.reserve_sequence(&tp, batch.records.len() as i32).await?;
                    (id.producer_id, id.producer_epoch, base)
                }
                None => (-1, -1, -1),
            };
            let wire_batch = WireRecordBatch {
                first_timestamp: batch.first_timestamp(),
                producer_id,
                producer_epoch,
                base_sequence,
                is_transactional: self.config.is_transactional(),
                compression,
                records: batch.records.clone(),
                ..Default::default()
            };
            by_topic.entry(tp.topic.clone()).or_default().push(PartitionProduceData {
                partition_index: tp.partition,
                batch: wire_batch,
            });
            batches_by_tp.insert(tp, (batch, permit));
        }

        let req = ProduceRequest {
            transactional_id: self.config.transactional_id.clone(),
            acks: self.config.acks,
            timeout_ms: self.config.request_timeout.as_millis() as i32,
            topics: by_topic
                .into_iter()
                .map(|(name, partitions)| TopicProduceData { name, partitions })
                .collect(),
        };

        let version = self.client.get_api(addr, ApiKey::Produce).await?;
        let result = self
            .client
            .call_raw(addr, ApiKey::Produce, version, |h| produce::create_request(h, &req))
            .await
            .and_then(|resp| produce::parse_response(&resp, version));

        match result {
            Ok(parsed) => {
                for topic in parsed.topics {
                    for partition in topic.partitions {
                        let tp = TopicPartition::new(topic.name.clone(), partition.partition_index);
                        if let Some((batch, _permit)) = batches_by_tp.remove(&tp) {
                            let error = if partition.error_code != 0 {
                                if partition.error_code == crate::errors::KafkaCode::OutOfOrderSequenceNumber as i16 {
                                    self.idempotent.fence().await;
                                }
                                Some(
                                    crate::errors::Error::from(ErrorKind::Protocol(
                                        ApiKey::Produce,
                                        partition.error_code.into(),
                                    ))
                                    .to_string(),
                                )
                            } else {
                                None
                            };
                            batch.complete(topic.name.clone(), partition.base_offset, partition.log_append_time_ms, error);
                        }
                    }
                }
            }
            Err(e) => {
                let reason = e.to_string();
                for (tp, (batch, _permit)) in batches_by_tp {
                    batch.complete(tp.topic, 0, 0, Some(reason.clone()));
                }
            }
        }
        Ok(())
    }
}

fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[async_trait::async_trait]
impl Producer for KafkaProducer {
    async fn send(&self, record: ProducerRecord) -> Result<SendRecord> {
        KafkaProducer::send(self, record).await
    }

    async fn flush(&self) -> Result<()> {
        KafkaProducer::flush(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::config::ClientConfig;

    fn producer(idempotent: bool, max_in_flight: usize) -> KafkaProducer {
        let client = Arc::new(BaseClient::new(ClientConfig::new(vec!["localhost:9092".into()])));
        let mut config = ProducerConfig::new(vec!["localhost:9092".into()]);
        config.idempotent = idempotent;
        config.max_in_flight_per_connection = max_in_flight;
        KafkaProducer::new(client, config)
    }

    #[test]
    fn idempotent_producers_pin_max_in_flight_to_one() {
        let producer = producer(true, 5);
        assert_eq!(producer.max_in_flight(), 1);
    }

    #[test]
    fn non_idempotent_producers_use_the_configured_limit() {
        let producer = producer(false, 5);
        assert_eq!(producer.max_in_flight(), 5);
    }

    #[tokio::test]
    async fn a_second_send_for_the_same_partition_waits_for_the_first_to_complete() {
        let producer = producer(true, 5);
        let tp = TopicPartition::new("orders".to_owned(), 0);

        let first = producer.in_flight_permit(&tp).await;

        // With idempotence on, max_in_flight is pinned to 1, so a second acquire for the same
        // partition must not resolve while the first permit is still held.
        let second = tokio::time::timeout(Duration::from_millis(50), producer.in_flight_permit(&tp)).await;
        assert!(second.is_err(), "a second in-flight batch for the same partition should not be admitted");

        drop(first);
        let second = tokio::time::timeout(Duration::from_millis(50), producer.in_flight_permit(&tp))
            .await
            .expect("releasing the first permit should admit the next send");
        drop(second);
    }

    #[tokio::test]
    async fn different_partitions_do_not_share_an_in_flight_slot() {
        let producer = producer(true, 1);
        let a = TopicPartition::new("orders".to_owned(), 0);
        let b = TopicPartition::new("orders".to_owned(), 1);

        let _first = producer.in_flight_permit(&a).await;
        tokio::time::timeout(Duration::from_millis(50), producer.in_flight_permit(&b))
            .await
            .expect("a different partition has its own in-flight slot");
    }
}

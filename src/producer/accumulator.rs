//! `RecordAccumulator` (§4.8): buffers records per topic-partition until a batch is ready to send
//! — full, lingered past its deadline, or force-drained by a flush — then hands ready batches to
//! the sender keyed by the broker currently holding each partition's leader.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::{oneshot, Mutex};

use crate::errors::Result;
use crate::producer::batch::ProducerBatch;
use crate::producer::record::RecordMetadata;
use crate::protocol::record::Header;
use crate::protocol::TopicPartition;

pub struct PushRecord {
    pub topic: String,
    pub partition: i32,
    pub key: Option<Bytes>,
    pub value: Option<Bytes>,
    pub timestamp: i64,
    pub headers: Vec<Header>,
}

pub struct Accumulator {
    batches: Mutex<HashMap<TopicPartition, ProducerBatch>>,
    batch_size: usize,
    linger: Duration,
}

impl Accumulator {
    pub fn new(batch_size: usize, linger: Duration) -> Self {
        Accumulator {
            batches: Mutex::new(HashMap::new()),
            batch_size,
            linger,
        }
    }

    /// Appends one record to the open batch for its topic-partition, creating a fresh batch if
    /// none is open. Readiness (full / lingered) is decided by `drain_ready`, not here — a batch
    /// that's already past `batch_size` keeps accepting records until it's drained.
    pub async fn push(&self, record: PushRecord) -> oneshot::Receiver<Result<RecordMetadata>> {
        let tp = TopicPartition::new(record.topic.clone(), record.partition);
        let mut guard = self.batches.lock().await;
        let batch = guard
            .entry(tp)
            .or_insert_with(|| ProducerBatch::new(record.topic.clone(), record.partition));
        batch.push(record.key, record.value, record.timestamp, record.headers)
    }

    /// Batches that are full, past their linger deadline, or present at all when `force` is set
    /// (flush/close), removed from the accumulator for the sender to ship.
    pub async fn drain_ready(&self, force: bool) -> Vec<(TopicPartition, ProducerBatch)> {
        let mut guard = self.batches.lock().await;
        let mut ready_keys = Vec::new();
        for (tp, batch) in guard.iter() {
            if batch.is_empty() {
                continue;
            }
            let ready = force
                || batch.estimated_size >= self.batch_size
                || batch.created_at.elapsed() >= self.linger;
            if ready {
                ready_keys.push(tp.clone());
            }
        }

        ready_keys
            .into_iter()
            .filter_map(|tp| guard.remove(&tp).map(|b| (tp, b)))
            .collect()
    }

    pub async fn pending_partitions(&self) -> Vec<TopicPartition> {
        self.batches.lock().await.keys().cloned().collect()
    }

    pub async fn oldest_batch_age(&self) -> Option<Duration> {
        self.batches
            .lock()
            .await
            .values()
            .map(|b| b.created_at.elapsed())
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_record(topic: &str, partition: i32, value: &'static [u8]) -> PushRecord {
        PushRecord {
            topic: topic.to_owned(),
            partition,
            key: None,
            value: Some(Bytes::from_static(value)),
            timestamp: 0,
            headers: vec![],
        }
    }

    #[tokio::test]
    async fn force_drain_returns_every_nonempty_batch() {
        let acc = Accumulator::new(16_384, Duration::from_secs(60));
        let _rx0 = acc.push(push_record("orders", 0, b"a")).await;
        let _rx1 = acc.push(push_record("orders", 1, b"b")).await;

        let ready = acc.drain_ready(false).await;
        assert!(ready.is_empty(), "linger hasn't elapsed and batches are small");

        let drained = acc.drain_ready(true).await;
        assert_eq!(drained.len(), 2);
    }

    #[tokio::test]
    async fn oversize_batches_are_ready_without_forcing() {
        let acc = Accumulator::new(4, Duration::from_secs(60));
        let _rx = acc.push(push_record("orders", 0, b"some long value")).await;
        let ready = acc.drain_ready(false).await;
        assert_eq!(ready.len(), 1);
    }

    #[tokio::test]
    async fn draining_removes_the_batch_from_the_accumulator() {
        let acc = Accumulator::new(4, Duration::from_secs(60));
        let _rx = acc.push(push_record("orders", 0, b"value")).await;
        assert_eq!(acc.pending_partitions().await.len(), 1);
        acc.drain_ready(true).await;
        assert!(acc.pending_partitions().await.is_empty());
    }
}

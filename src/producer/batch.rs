//! `ProducerBatch` (§4.8): the records destined for one topic-partition, accumulated client-side
//! until it's full, its linger expires, or a flush forces it out, then sent as a single `Produce`
//! partition entry.

use std::time::Instant;

use bytes::Bytes;
use tokio::sync::oneshot;

use crate::errors::Result;
use crate::producer::record::RecordMetadata;
use crate::protocol::record::{Header, Record};

/// The promise side of one record queued into a batch; resolved once the batch's `Produce`
/// response comes back (or the batch is abandoned).
pub struct Thunk {
    pub relative_offset: i32,
    tx: oneshot::Sender<Result<RecordMetadata>>,
}

impl Thunk {
    pub fn complete(self, result: Result<RecordMetadata>) {
        let _ = self.tx.send(result);
    }
}

pub struct ProducerBatch {
    pub topic: String,
    pub partition: i32,
    pub records: Vec<Record>,
    pub thunks: Vec<Thunk>,
    pub created_at: Instant,
    pub estimated_size: usize,
    pub base_sequence: Option<i32>,
    pub attempts: u32,
    first_timestamp: Option<i64>,
}

impl ProducerBatch {
    pub fn new(topic: impl Into<String>, partition: i32) -> Self {
        ProducerBatch {
            topic: topic.into(),
            partition,
            records: Vec::new(),
            thunks: Vec::new(),
            created_at: Instant::now(),
            estimated_size: 0,
            base_sequence: None,
            attempts: 0,
            first_timestamp: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The wall-clock timestamp of the first record pushed into this batch; every record's own
    /// `timestamp_delta` is relative to it. `0` for a batch that has never had a record pushed.
    pub fn first_timestamp(&self) -> i64 {
        self.first_timestamp.unwrap_or(0)
    }

    pub fn push(
        &mut self,
        key: Option<Bytes>,
        value: Option<Bytes>,
        timestamp: i64,
        headers: Vec<Header>,
    ) -> oneshot::Receiver<Result<RecordMetadata>> {
        let first_timestamp = *self.first_timestamp.get_or_insert(timestamp);
        let timestamp_delta = timestamp - first_timestamp;

        let offset_delta = self.records.len() as i32;
        let size = key.as_ref().map_or(0, |b| b.len()) + value.as_ref().map_or(0, |b| b.len()) + 12;
        self.estimated_size += size;

        self.records.push(Record {
            offset_delta,
            timestamp_delta,
            key,
            value,
            headers,
        });

        let (tx, rx) = oneshot::channel();
        self.thunks.push(Thunk {
            relative_offset: offset_delta,
            tx,
        });
        rx
    }

    /// Resolves every queued thunk with the base offset returned by the broker for this batch, or
    /// with `error` if the batch could not be sent or was rejected.
    pub fn complete(self, topic: String, base_offset: i64, timestamp: i64, error: Option<String>) {
        for (thunk, record) in self.thunks.into_iter().zip(self.records.iter()) {
            let result = match &error {
                Some(reason) => Err(
                    crate::errors::ErrorKind::Response(crate::protocol::ApiKey::Produce, vec![], reason.clone())
                        .into(),
                ),
                None => Ok(RecordMetadata {
                    topic: topic.clone(),
                    partition: self.partition,
                    offset: base_offset + thunk.relative_offset as i64,
                    timestamp: timestamp + record.timestamp_delta,
                }),
            };
            thunk.complete(result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_accumulates_records_and_grows_estimated_size() {
        let mut batch = ProducerBatch::new("orders", 0);
        assert!(batch.is_empty());
        let _rx = batch.push(None, Some(Bytes::from_static(b"hello")), 0, vec![]);
        assert_eq!(batch.records.len(), 1);
        assert!(batch.estimated_size >= 5);
    }

    #[tokio::test]
    async fn complete_resolves_thunks_with_offsets_relative_to_base() {
        let mut batch = ProducerBatch::new("orders", 0);
        let rx0 = batch.push(None, Some(Bytes::from_static(b"a")), 0, vec![]);
        let rx1 = batch.push(None, Some(Bytes::from_static(b"b")), 1, vec![]);
        batch.complete("orders".into(), 100, 1_000, None);

        let meta0 = rx0.await.unwrap().unwrap();
        let meta1 = rx1.await.unwrap().unwrap();
        assert_eq!(meta0.offset, 100);
        assert_eq!(meta1.offset, 101);
        assert_eq!(meta1.timestamp, 1_001);
    }

    #[tokio::test]
    async fn complete_with_an_error_rejects_every_thunk() {
        let mut batch = ProducerBatch::new("orders", 0);
        let rx = batch.push(None, Some(Bytes::from_static(b"a")), 0, vec![]);
        batch.complete("orders".into(), 0, 0, Some("broker unreachable".into()));
        assert!(rx.await.unwrap().is_err());
    }
}

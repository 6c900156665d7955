//! Idempotent producing (§4.8): a producer id/epoch obtained once via `InitProducerId`, plus a
//! monotonic per-partition sequence number the broker uses to detect drops, duplicates, and
//! out-of-order delivery. An `OUT_OF_ORDER_SEQUENCE_NUMBER` response fences the producer — its
//! id/epoch can no longer be used and the caller must start a new producer instance.

use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::errors::{ErrorKind, Result};
use crate::protocol::TopicPartition;

#[derive(Debug, Clone, Copy)]
pub struct ProducerIdentity {
    pub producer_id: i64,
    pub producer_epoch: i16,
}

impl ProducerIdentity {
    pub const NONE: ProducerIdentity = ProducerIdentity {
        producer_id: -1,
        producer_epoch: -1,
    };
}

/// Tracks the producer's id/epoch and the next sequence number expected for each partition it has
/// written to. Fencing is permanent: once set, every subsequent `next_sequence` call fails.
pub struct IdempotentState {
    identity: Mutex<Option<ProducerIdentity>>,
    sequences: Mutex<HashMap<TopicPartition, i32>>,
    fenced: Mutex<bool>,
}

impl IdempotentState {
    pub fn new() -> Self {
        IdempotentState {
            identity: Mutex::new(None),
            sequences: Mutex::new(HashMap::new()),
            fenced: Mutex::new(false),
        }
    }

    pub async fn identity(&self) -> Option<ProducerIdentity> {
        *self.identity.lock().await
    }

    pub async fn set_identity(&self, identity: ProducerIdentity) {
        *self.identity.lock().await = Some(identity);
        self.sequences.lock().await.clear();
        *self.fenced.lock().await = false;
    }

    /// Allocates the next sequence number for `tp`, advancing the tracked counter.
    pub async fn next_sequence(&self, tp: &TopicPartition) -> Result<i32> {
        self.reserve_sequence(tp, 1).await
    }

    /// Reserves `count` consecutive sequence numbers for a batch of `count` records written to
    /// `tp` in one `Produce` call, returning the base (first) sequence number.
    pub async fn reserve_sequence(&self, tp: &TopicPartition, count: i32) -> Result<i32> {
        if *self.fenced.lock().await {
            return Err(ErrorKind::User("producer has been fenced; create a new instance".into()).into());
        }
        let mut guard = self.sequences.lock().await;
        let seq = guard.entry(tp.clone()).or_insert(0);
        let base = *seq;
        *seq += count.max(1);
        Ok(base)
    }

    pub async fn fence(&self) {
        *self.fenced.lock().await = true;
    }

    pub async fn is_fenced(&self) -> bool {
        *self.fenced.lock().await
    }
}

impl Default for IdempotentState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sequence_numbers_are_per_partition_and_monotonic() {
        let state = IdempotentState::new();
        let tp = TopicPartition::new("orders", 0);
        assert_eq!(state.next_sequence(&tp).await.unwrap(), 0);
        assert_eq!(state.next_sequence(&tp).await.unwrap(), 1);
        assert_eq!(
            state
                .next_sequence(&TopicPartition::new("orders", 1))
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn fencing_rejects_further_sequence_allocation() {
        let state = IdempotentState::new();
        let tp = TopicPartition::new("orders", 0);
        state.next_sequence(&tp).await.unwrap();
        state.fence().await;
        assert!(state.next_sequence(&tp).await.is_err());
    }

    #[tokio::test]
    async fn setting_a_fresh_identity_clears_fencing_and_sequences() {
        let state = IdempotentState::new();
        let tp = TopicPartition::new("orders", 0);
        state.next_sequence(&tp).await.unwrap();
        state.fence().await;
        state
            .set_identity(ProducerIdentity {
                producer_id: 7,
                producer_epoch: 0,
            })
            .await;
        assert!(!state.is_fenced().await);
        assert_eq!(state.next_sequence(&tp).await.unwrap(), 0);
    }
}

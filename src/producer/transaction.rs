//! Transaction state machine (§4.8): `none -> open -> (committing | aborting) -> completed`.
//! Partitions and consumer groups must be registered with the coordinator before the first record
//! or offset commit touching them goes out; `EndTxn` moves the transaction to its terminal state.

use std::collections::HashSet;

use tokio::sync::Mutex;

use crate::errors::{ErrorKind, Result};
use crate::protocol::TopicPartition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    None,
    Open,
    Committing,
    Aborting,
    Completed,
}

pub struct TransactionManager {
    transactional_id: String,
    state: Mutex<TransactionState>,
    registered_partitions: Mutex<HashSet<TopicPartition>>,
    registered_groups: Mutex<HashSet<String>>,
}

impl TransactionManager {
    pub fn new(transactional_id: impl Into<String>) -> Self {
        TransactionManager {
            transactional_id: transactional_id.into(),
            state: Mutex::new(TransactionState::None),
            registered_partitions: Mutex::new(HashSet::new()),
            registered_groups: Mutex::new(HashSet::new()),
        }
    }

    pub fn transactional_id(&self) -> &str {
        &self.transactional_id
    }

    pub async fn state(&self) -> TransactionState {
        *self.state.lock().await
    }

    /// Called once `InitProducerId` has returned successfully; opens the transaction.
    pub async fn begin(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if *state != TransactionState::None && *state != TransactionState::Completed {
            return Err(ErrorKind::TransactionInProgress.into());
        }
        *state = TransactionState::Open;
        self.registered_partitions.lock().await.clear();
        self.registered_groups.lock().await.clear();
        Ok(())
    }

    async fn require_open(&self) -> Result<()> {
        if *self.state.lock().await != TransactionState::Open {
            return Err(ErrorKind::User("no transaction is open".into()).into());
        }
        Ok(())
    }

    /// Returns the partitions that haven't yet been registered with the coordinator via
    /// `AddPartitionsToTxn`, and marks them registered.
    pub async fn partitions_needing_registration(&self, touched: &[TopicPartition]) -> Result<Vec<TopicPartition>> {
        self.require_open().await?;
        let mut registered = self.registered_partitions.lock().await;
        let fresh: Vec<TopicPartition> = touched.iter().filter(|tp| !registered.contains(*tp)).cloned().collect();
        for tp in &fresh {
            registered.insert(tp.clone());
        }
        Ok(fresh)
    }

    /// True the first time `group_id` is sent offsets within this transaction; the caller must
    /// issue `AddOffsetsToTxn` before the corresponding `TxnOffsetCommit`.
    pub async fn needs_group_registration(&self, group_id: &str) -> Result<bool> {
        self.require_open().await?;
        let mut groups = self.registered_groups.lock().await;
        Ok(groups.insert(group_id.to_owned()))
    }

    pub async fn begin_commit(&self) -> Result<()> {
        self.require_open().await?;
        *self.state.lock().await = TransactionState::Committing;
        Ok(())
    }

    pub async fn begin_abort(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if *state != TransactionState::Open && *state != TransactionState::Committing {
            return Err(ErrorKind::User("no transaction is open or committing".into()).into());
        }
        *state = TransactionState::Aborting;
        Ok(())
    }

    pub async fn complete(&self) {
        *self.state.lock().await = TransactionState::Completed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn full_commit_cycle() {
        let txn = TransactionManager::new("txn-1");
        assert_eq!(txn.state().await, TransactionState::None);

        txn.begin().await.unwrap();
        let tp = TopicPartition::new("orders", 0);
        let fresh = txn.partitions_needing_registration(&[tp.clone()]).await.unwrap();
        assert_eq!(fresh, vec![tp.clone()]);
        let fresh_again = txn.partitions_needing_registration(&[tp]).await.unwrap();
        assert!(fresh_again.is_empty(), "already-registered partitions aren't repeated");

        txn.begin_commit().await.unwrap();
        txn.complete().await;
        assert_eq!(txn.state().await, TransactionState::Completed);
    }

    #[tokio::test]
    async fn abort_is_reachable_from_open_and_committing() {
        let txn = TransactionManager::new("txn-1");
        txn.begin().await.unwrap();
        txn.begin_abort().await.unwrap();
        assert_eq!(txn.state().await, TransactionState::Aborting);
    }

    #[tokio::test]
    async fn cannot_begin_a_second_transaction_while_one_is_open() {
        let txn = TransactionManager::new("txn-1");
        txn.begin().await.unwrap();
        assert!(txn.begin().await.is_err());
    }

    #[tokio::test]
    async fn group_registration_is_reported_only_once() {
        let txn = TransactionManager::new("txn-1");
        txn.begin().await.unwrap();
        assert!(txn.needs_group_registration("g1").await.unwrap());
        assert!(!txn.needs_group_registration("g1").await.unwrap());
    }
}

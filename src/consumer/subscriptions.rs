//! Tracks what a consumer is subscribed to and where it stands on each assigned partition
//! (§4.7's fetch pump reads `fetch_offset` before every `Fetch`, and advances it as records are
//! delivered; `commit()` reads `position` to build `OffsetCommit`).

use std::collections::HashMap;

use crate::protocol::TopicPartition;

#[derive(Debug, Clone, Copy)]
pub struct PartitionState {
    /// Next offset to request in `Fetch`.
    pub fetch_offset: i64,
    /// Highest offset the application has consumed but not necessarily committed.
    pub position: i64,
    /// Leader epoch of the last batch fetched, for `currentLeaderEpoch` fencing.
    pub last_fetched_epoch: i32,
    pub paused: bool,
}

impl PartitionState {
    fn at(offset: i64) -> Self {
        PartitionState {
            fetch_offset: offset,
            position: offset,
            last_fetched_epoch: -1,
            paused: false,
        }
    }
}

/// The set of topics a consumer has asked to subscribe to, plus the partitions currently assigned
/// to it (populated after a `SyncGroup` round) and each one's fetch position.
#[derive(Debug, Default)]
pub struct Subscriptions {
    topics: Vec<String>,
    partitions: HashMap<TopicPartition, PartitionState>,
}

impl Subscriptions {
    pub fn new(topics: Vec<String>) -> Self {
        Subscriptions {
            topics,
            partitions: HashMap::new(),
        }
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    /// Replaces the assigned partition set after a rebalance, seeding every newly-assigned
    /// partition at offset `0` (the fetcher must seek it to the right start position before use)
    /// and dropping partitions no longer assigned to this member.
    pub fn assign(&mut self, assignment: impl IntoIterator<Item = TopicPartition>) {
        let mut next = HashMap::new();
        for tp in assignment {
            let state = self.partitions.remove(&tp).unwrap_or_else(|| PartitionState::at(0));
            next.insert(tp, state);
        }
        self.partitions = next;
    }

    pub fn assigned_partitions(&self) -> impl Iterator<Item = &TopicPartition> {
        self.partitions.keys()
    }

    pub fn state(&self, tp: &TopicPartition) -> Option<&PartitionState> {
        self.partitions.get(tp)
    }

    pub fn seek(&mut self, tp: &TopicPartition, offset: i64) {
        if let Some(state) = self.partitions.get_mut(tp) {
            state.fetch_offset = offset;
            state.position = offset;
        }
    }

    pub fn pause(&mut self, tp: &TopicPartition) {
        if let Some(state) = self.partitions.get_mut(tp) {
            state.paused = true;
        }
    }

    pub fn resume(&mut self, tp: &TopicPartition) {
        if let Some(state) = self.partitions.get_mut(tp) {
            state.paused = false;
        }
    }

    /// Records that `batch_last_offset + 1` is the next offset to fetch for `tp`, after the
    /// fetcher successfully decoded a batch ending there.
    pub fn advance(&mut self, tp: &TopicPartition, next_offset: i64, leader_epoch: i32) {
        if let Some(state) = self.partitions.get_mut(tp) {
            state.fetch_offset = next_offset;
            state.position = next_offset;
            state.last_fetched_epoch = leader_epoch;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    pub fn clear(&mut self) {
        self.partitions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assign_preserves_position_for_still_assigned_partitions() {
        let mut subs = Subscriptions::new(vec!["orders".into()]);
        let tp = TopicPartition::new("orders", 0);
        subs.assign(vec![tp.clone()]);
        subs.advance(&tp, 42, 3);
        assert_eq!(subs.state(&tp).unwrap().fetch_offset, 42);

        subs.assign(vec![tp.clone()]);
        assert_eq!(subs.state(&tp).unwrap().fetch_offset, 42);
    }

    #[test]
    fn assign_drops_partitions_no_longer_owned() {
        let mut subs = Subscriptions::new(vec!["orders".into()]);
        let tp0 = TopicPartition::new("orders", 0);
        let tp1 = TopicPartition::new("orders", 1);
        subs.assign(vec![tp0.clone(), tp1.clone()]);
        subs.assign(vec![tp0.clone()]);
        assert!(subs.state(&tp0).is_some());
        assert!(subs.state(&tp1).is_none());
    }

    #[test]
    fn seek_resets_both_offset_and_position() {
        let mut subs = Subscriptions::new(vec!["orders".into()]);
        let tp = TopicPartition::new("orders", 0);
        subs.assign(vec![tp.clone()]);
        subs.advance(&tp, 10, 0);
        subs.seek(&tp, 0);
        let state = subs.state(&tp).unwrap();
        assert_eq!(state.fetch_offset, 0);
        assert_eq!(state.position, 0);
    }
}

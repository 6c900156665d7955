//! Partition assignment strategies (§4.7): computed once by the group leader after `JoinGroup`
//! returns every member's subscription, then distributed via `SyncGroup`.

use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Subscription {
    pub member_id: String,
    pub topics: Vec<String>,
}

/// `topic -> assigned partitions`, per member.
pub type Assignment = HashMap<String, Vec<i32>>;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AssignmentStrategy {
    Range,
    RoundRobin,
}

impl AssignmentStrategy {
    pub fn name(self) -> &'static str {
        match self {
            AssignmentStrategy::Range => "range",
            AssignmentStrategy::RoundRobin => "round-robin",
        }
    }
}

/// Computes a partition assignment for every subscribed member, given the partitions each
/// subscribed topic actually has.
pub trait PartitionAssignor: Send + Sync {
    fn name(&self) -> &'static str;
    fn assign(
        &self,
        subscriptions: &[Subscription],
        partitions_per_topic: &HashMap<String, Vec<i32>>,
    ) -> HashMap<String, Assignment>;
}

/// Assigns each topic's partitions in contiguous ranges per member, members ordered by id.
/// Members near the end of the list can end up with one more partition than others when a
/// topic's partition count doesn't divide evenly.
#[derive(Default)]
pub struct RangeAssignor;

impl PartitionAssignor for RangeAssignor {
    fn name(&self) -> &'static str {
        "range"
    }

    fn assign(
        &self,
        subscriptions: &[Subscription],
        partitions_per_topic: &HashMap<String, Vec<i32>>,
    ) -> HashMap<String, Assignment> {
        let mut result: HashMap<String, Assignment> =
            subscriptions.iter().map(|s| (s.member_id.clone(), Assignment::new())).collect();

        let mut topics: Vec<&String> = partitions_per_topic.keys().collect();
        topics.sort();

        for topic in topics {
            let partitions = &partitions_per_topic[topic];
            let mut members: Vec<&Subscription> =
                subscriptions.iter().filter(|s| s.topics.contains(topic)).collect();
            members.sort_by(|a, b| a.member_id.cmp(&b.member_id));
            if members.is_empty() {
                continue;
            }

            let per_member = partitions.len() / members.len();
            let extra = partitions.len() % members.len();
            let mut cursor = 0;
            for (i, member) in members.iter().enumerate() {
                let take = per_member + if i < extra { 1 } else { 0 };
                let slice = partitions[cursor..cursor + take].to_vec();
                cursor += take;
                result.entry(member.member_id.clone()).or_default().insert(topic.clone(), slice);
            }
        }
        result
    }
}

/// Lays every subscribed topic's partitions end to end and deals them out round-robin across the
/// members subscribed to each, ordered by member id.
#[derive(Default)]
pub struct RoundRobinAssignor;

impl PartitionAssignor for RoundRobinAssignor {
    fn name(&self) -> &'static str {
        "round-robin"
    }

    fn assign(
        &self,
        subscriptions: &[Subscription],
        partitions_per_topic: &HashMap<String, Vec<i32>>,
    ) -> HashMap<String, Assignment> {
        let mut result: HashMap<String, Assignment> =
            subscriptions.iter().map(|s| (s.member_id.clone(), Assignment::new())).collect();

        let mut members: Vec<&Subscription> = subscriptions.iter().collect();
        members.sort_by(|a, b| a.member_id.cmp(&b.member_id));
        if members.is_empty() {
            return result;
        }

        let mut topics: Vec<&String> = partitions_per_topic.keys().collect();
        topics.sort();

        let mut cursor = 0usize;
        for topic in topics {
            for &partition in &partitions_per_topic[topic] {
                loop {
                    let member = members[cursor % members.len()];
                    cursor += 1;
                    if member.topics.contains(topic) {
                        result
                            .entry(member.member_id.clone())
                            .or_default()
                            .entry(topic.clone())
                            .or_default()
                            .push(partition);
                        break;
                    }
                    if cursor % members.len() == 0 && members.iter().all(|m| !m.topics.contains(topic)) {
                        break; // no member wants this topic
                    }
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic_map(pairs: &[(&str, i32)]) -> HashMap<String, Vec<i32>> {
        let mut m: HashMap<String, Vec<i32>> = HashMap::new();
        for (topic, count) in pairs {
            m.insert((*topic).to_owned(), (0..*count).collect());
        }
        m
    }

    #[test]
    fn range_assignor_splits_evenly() {
        let subs = vec![
            Subscription { member_id: "m1".into(), topics: vec!["orders".into()] },
            Subscription { member_id: "m2".into(), topics: vec!["orders".into()] },
        ];
        let partitions = topic_map(&[("orders", 4)]);
        let assignment = RangeAssignor.assign(&subs, &partitions);
        assert_eq!(assignment["m1"]["orders"], vec![0, 1]);
        assert_eq!(assignment["m2"]["orders"], vec![2, 3]);
    }

    #[test]
    fn range_assignor_gives_remainder_to_earlier_members() {
        let subs = vec![
            Subscription { member_id: "m1".into(), topics: vec!["orders".into()] },
            Subscription { member_id: "m2".into(), topics: vec!["orders".into()] },
        ];
        let partitions = topic_map(&[("orders", 3)]);
        let assignment = RangeAssignor.assign(&subs, &partitions);
        assert_eq!(assignment["m1"]["orders"], vec![0, 1]);
        assert_eq!(assignment["m2"]["orders"], vec![2]);
    }

    #[test]
    fn round_robin_assignor_spreads_partitions() {
        let subs = vec![
            Subscription { member_id: "m1".into(), topics: vec!["orders".into()] },
            Subscription { member_id: "m2".into(), topics: vec!["orders".into()] },
        ];
        let partitions = topic_map(&[("orders", 4)]);
        let assignment = RoundRobinAssignor.assign(&subs, &partitions);
        assert_eq!(assignment["m1"]["orders"], vec![0, 2]);
        assert_eq!(assignment["m2"]["orders"], vec![1, 3]);
    }

    #[test]
    fn every_subscribed_member_appears_even_with_no_partitions() {
        let subs = vec![Subscription { member_id: "m1".into(), topics: vec!["orders".into()] }];
        let assignment = RangeAssignor.assign(&subs, &HashMap::new());
        assert!(assignment.contains_key("m1"));
        assert!(assignment["m1"].is_empty());
    }
}

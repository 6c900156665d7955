//! Fluent construction of a `KafkaConsumer`, mirroring `ProducerBuilder`'s own builder methods.

use std::sync::Arc;
use std::time::Duration;

use crate::client::BaseClient;
use crate::consumer::assignor::{PartitionAssignor, RangeAssignor, RoundRobinAssignor};
use crate::consumer::config::{ConsumerConfig, IsolationLevel, OffsetResetStrategy, StartMode};
use crate::consumer::consumer::KafkaConsumer;
use crate::consumer::coordinator::{Coordinator, ConsumerCoordinator};
use crate::sasl::Credentials;

pub struct ConsumerBuilder {
    config: ConsumerConfig,
    topics: Vec<String>,
    assignors: Vec<Box<dyn PartitionAssignor>>,
}

impl ConsumerBuilder {
    pub fn new(bootstrap_servers: Vec<String>, group_id: impl Into<String>) -> Self {
        ConsumerBuilder {
            config: ConsumerConfig::new(bootstrap_servers, group_id),
            topics: Vec::new(),
            assignors: vec![Box::new(RangeAssignor), Box::new(RoundRobinAssignor)],
        }
    }

    pub fn subscribe(mut self, topics: Vec<String>) -> Self {
        self.topics = topics;
        self
    }

    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.config.client_id = Some(id.into());
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.config.credentials = Some(credentials);
        self
    }

    pub fn group_instance_id(mut self, id: impl Into<String>) -> Self {
        self.config.group_instance_id = Some(id.into());
        self
    }

    pub fn session_timeout(mut self, timeout: Duration) -> Self {
        self.config.session_timeout = timeout;
        self
    }

    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.config.heartbeat_interval = interval;
        self
    }

    pub fn max_poll_records(mut self, max: usize) -> Self {
        self.config.max_poll_records = max;
        self
    }

    pub fn auto_commit(mut self, enabled: bool) -> Self {
        self.config.auto_commit = enabled;
        self
    }

    pub fn auto_commit_interval(mut self, interval: Duration) -> Self {
        self.config.auto_commit_interval = interval;
        self
    }

    pub fn isolation_level(mut self, level: IsolationLevel) -> Self {
        self.config.isolation_level = level;
        self
    }

    pub fn mode(mut self, mode: StartMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn fallback_mode(mut self, mode: OffsetResetStrategy) -> Self {
        self.config.fallback_mode = mode;
        self
    }

    /// Replaces the default `[range, round-robin]` assignor set, e.g. to register a custom
    /// strategy or restrict the member to just one.
    pub fn assignors(mut self, assignors: Vec<Box<dyn PartitionAssignor>>) -> Self {
        self.assignors = assignors;
        self
    }

    pub fn build(self, client: Arc<BaseClient>) -> Arc<KafkaConsumer> {
        let coordinator: Arc<dyn Coordinator> = Arc::new(ConsumerCoordinator::new(
            client.clone(),
            self.config.clone(),
            self.topics.clone(),
            self.assignors,
        ));
        Arc::new(KafkaConsumer::new(client, self.config, self.topics, coordinator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientBuilder;

    #[test]
    fn builds_with_defaults() {
        let client = ClientBuilder::new(vec!["localhost:9092".into()]).build();
        let consumer = ConsumerBuilder::new(vec!["localhost:9092".into()], "g1")
            .subscribe(vec!["orders".into()])
            .build(client);
        assert_eq!(consumer.topics(), &["orders".to_owned()]);
    }

    #[test]
    fn custom_assignor_set_replaces_the_default() {
        let client = ClientBuilder::new(vec!["localhost:9092".into()]).build();
        let consumer = ConsumerBuilder::new(vec!["localhost:9092".into()], "g1")
            .subscribe(vec!["orders".into()])
            .assignors(vec![Box::new(crate::consumer::assignor::RangeAssignor)])
            .build(client);
        assert_eq!(consumer.topics(), &["orders".to_owned()]);
    }
}

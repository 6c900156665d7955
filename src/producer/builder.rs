//! Fluent construction of a `KafkaProducer`, mirroring `ClientBuilder`'s own builder methods.

use std::sync::Arc;
use std::time::Duration;

use crate::client::BaseClient;
use crate::producer::config::ProducerConfig;
use crate::producer::partitioner::Partitioner;
use crate::producer::producer::KafkaProducer;
use crate::protocol::RequiredAcks;
use crate::sasl::Credentials;

pub struct ProducerBuilder {
    config: ProducerConfig,
    partitioner: Option<Box<dyn Partitioner>>,
}

impl ProducerBuilder {
    pub fn new(bootstrap_servers: Vec<String>) -> Self {
        ProducerBuilder {
            config: ProducerConfig::new(bootstrap_servers),
            partitioner: None,
        }
    }

    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.config.client_id = Some(id.into());
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.config.credentials = Some(credentials);
        self
    }

    pub fn acks(mut self, acks: RequiredAcks) -> Self {
        self.config.acks = acks;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    pub fn linger(mut self, linger: Duration) -> Self {
        self.config.linger = linger;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.config.retries = retries;
        self
    }

    pub fn compression(mut self, codec: impl Into<String>) -> Self {
        self.config.compression = codec.into();
        self
    }

    pub fn idempotent(mut self, idempotent: bool) -> Self {
        self.config.idempotent = idempotent;
        self
    }

    pub fn transactional_id(mut self, transactional_id: impl Into<String>) -> Self {
        self.config.transactional_id = Some(transactional_id.into());
        self
    }

    pub fn transaction_timeout(mut self, timeout: Duration) -> Self {
        self.config.transaction_timeout = timeout;
        self
    }

    pub fn partitioner(mut self, partitioner: Box<dyn Partitioner>) -> Self {
        self.partitioner = Some(partitioner);
        self
    }

    pub fn build(self, client: Arc<BaseClient>) -> Arc<KafkaProducer> {
        let producer = KafkaProducer::new(client, self.config);
        let producer = match self.partitioner {
            Some(p) => producer.with_partitioner(p),
            None => producer,
        };
        Arc::new(producer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientBuilder;

    #[test]
    fn builds_with_defaults() {
        let client = ClientBuilder::new(vec!["localhost:9092".into()]).build();
        let producer = ProducerBuilder::new(vec!["localhost:9092".into()]).build(client);
        assert_eq!(Arc::strong_count(&producer), 1);
    }

    #[test]
    fn transactional_id_flows_through_to_config() {
        let client = ClientBuilder::new(vec!["localhost:9092".into()]).build();
        let producer = ProducerBuilder::new(vec!["localhost:9092".into()])
            .transactional_id("txn-1")
            .idempotent(true)
            .build(client);
        assert_eq!(Arc::strong_count(&producer), 1);
    }
}

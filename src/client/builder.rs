//! Fluent construction of a `BaseClient`, mirroring `ClientConfig`'s own builder methods.

use std::sync::Arc;
use std::time::Duration;

use crate::client::{BaseClient, ClientConfig};
use crate::sasl::Credentials;

#[derive(Clone, Debug)]
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    pub fn new(bootstrap_servers: Vec<String>) -> Self {
        ClientBuilder {
            config: ClientConfig::new(bootstrap_servers),
        }
    }

    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.config = self.config.client_id(id);
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.config = self.config.credentials(credentials);
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.config = self.config.retries(retries);
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config = self.config.retry_delay(delay);
        self
    }

    pub fn metadata_max_age(mut self, max_age: Duration) -> Self {
        self.config = self.config.metadata_max_age(max_age);
        self
    }

    pub fn build(self) -> Arc<BaseClient> {
        Arc::new(BaseClient::new(self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_defaults() {
        let client = ClientBuilder::new(vec!["localhost:9092".into()]).build();
        assert_eq!(Arc::strong_count(&client), 1);
    }
}

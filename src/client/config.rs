//! Client configuration (§4.6, §5 timeouts).

use std::time::Duration;

use crate::sasl::Credentials;

/// Configuration shared by every high-level facade (producer, consumer, admin) built on top of
/// the base client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub bootstrap_servers: Vec<String>,
    pub client_id: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub metadata_max_age: Duration,
    pub retries: u32,
    pub retry_delay: Duration,
    pub credentials: Option<Credentials>,
}

impl ClientConfig {
    pub fn new(bootstrap_servers: Vec<String>) -> Self {
        ClientConfig {
            bootstrap_servers,
            client_id: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            metadata_max_age: Duration::from_secs(5 * 60),
            retries: 3,
            retry_delay: Duration::from_millis(200),
            credentials: None,
        }
    }

    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn metadata_max_age(mut self, max_age: Duration) -> Self {
        self.metadata_max_age = max_age;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = ClientConfig::new(vec!["localhost:9092".into()]);
        assert_eq!(cfg.retries, 3);
        assert!(cfg.credentials.is_none());
    }
}

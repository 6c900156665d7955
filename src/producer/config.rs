//! Producer tuning knobs (§4.8): batching, acks, idempotence, transactions, and compression.

use std::time::Duration;

use crate::protocol::RequiredAcks;
use crate::sasl::Credentials;

pub const DEFAULT_ACKS: RequiredAcks = RequiredAcks::All;
pub const DEFAULT_BATCH_SIZE: usize = 16_384;
pub const DEFAULT_LINGER: Duration = Duration::from_millis(0);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_IN_FLIGHT_PER_CONNECTION: usize = 5;

#[derive(Clone, Debug)]
pub struct ProducerConfig {
    pub bootstrap_servers: Vec<String>,
    pub client_id: Option<String>,
    pub credentials: Option<Credentials>,
    pub acks: RequiredAcks,
    pub batch_size: usize,
    pub linger: Duration,
    pub request_timeout: Duration,
    pub retries: u32,
    pub retry_delay: Duration,
    pub compression: String,
    pub idempotent: bool,
    pub transactional_id: Option<String>,
    pub transaction_timeout: Duration,
    pub max_in_flight_per_connection: usize,
}

impl ProducerConfig {
    pub fn new(bootstrap_servers: Vec<String>) -> Self {
        ProducerConfig {
            bootstrap_servers,
            client_id: None,
            credentials: None,
            acks: DEFAULT_ACKS,
            batch_size: DEFAULT_BATCH_SIZE,
            linger: DEFAULT_LINGER,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retries: 3,
            retry_delay: Duration::from_millis(200),
            compression: "none".to_owned(),
            idempotent: false,
            transactional_id: None,
            transaction_timeout: Duration::from_secs(60),
            max_in_flight_per_connection: DEFAULT_MAX_IN_FLIGHT_PER_CONNECTION,
        }
    }

    /// A transactional id implies idempotence (§4.8: "transactions are idempotence plus a
    /// coordinator-tracked id").
    pub fn is_transactional(&self) -> bool {
        self.transactional_id.is_some()
    }

    pub fn requires_idempotence(&self) -> bool {
        self.idempotent || self.is_transactional()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transactional_id_implies_idempotence() {
        let mut cfg = ProducerConfig::new(vec!["localhost:9092".into()]);
        assert!(!cfg.requires_idempotence());
        cfg.transactional_id = Some("txn-1".into());
        assert!(cfg.requires_idempotence());
    }
}

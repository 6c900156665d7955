//! A native Rust client for the Apache Kafka wire protocol: connection pooling, metadata and API
//! version discovery, a producer engine (batching, idempotence, transactions), a consumer group
//! state machine (assignment, heartbeat, fetch pump, offset management), and a thin admin façade,
//! all built directly on the broker wire protocol rather than any JVM or C client binding.

pub mod admin;
pub mod client;
pub mod compression;
pub mod consumer;
pub mod errors;
pub mod network;
pub mod producer;
pub mod protocol;
pub mod sasl;

pub use admin::AdminClient;
pub use client::{BaseClient, ClientBuilder, ClientConfig};
pub use compression::Compression;
pub use consumer::{Consumer, ConsumerBuilder, ConsumerRecord, KafkaConsumer};
pub use errors::{Error, ErrorKind};
pub use network::{Connection, ConnectionPool, ScriptedBroker};
pub use producer::{KafkaProducer, Producer, ProducerBuilder, ProducerRecord, RecordMetadata};
pub use protocol::{ApiKey, RequiredAcks, TopicPartition};
pub use sasl::Credentials;

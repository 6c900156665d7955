//! The producer half of the client (§4.8): batches records per topic-partition, partitions keyed
//! records consistently, and optionally layers idempotence or full transactions on top.

mod accumulator;
mod batch;
mod builder;
mod config;
mod idempotent;
mod interceptor;
mod partitioner;
mod producer;
mod record;
mod serialization;
mod transaction;

pub use self::accumulator::{Accumulator, PushRecord};
pub use self::batch::{ProducerBatch, Thunk};
pub use self::builder::ProducerBuilder;
pub use self::config::{ProducerConfig, DEFAULT_ACKS, DEFAULT_BATCH_SIZE, DEFAULT_LINGER, DEFAULT_REQUEST_TIMEOUT};
pub use self::idempotent::{IdempotentState, ProducerIdentity};
pub use self::interceptor::{ProducerInterceptor, ProducerInterceptors};
pub use self::partitioner::{DefaultPartitioner, Partitioner, RoundRobinPartitioner};
pub use self::producer::{KafkaProducer, Producer, SendRecord};
pub use self::record::{ProducerRecord, RecordMetadata};
pub use self::serialization::{BytesSerializer, NoopSerializer, RawSerializer, Serializer, StrEncodingSerializer};
pub use self::transaction::{TransactionManager, TransactionState};

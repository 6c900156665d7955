//! The consumer half of the client (§4.7): group membership, partition assignment, the fetch
//! pump, and offset management.

mod assignor;
mod builder;
mod config;
mod consumer;
mod coordinator;
mod fetcher;
mod protocol;
mod subscriptions;

pub use self::assignor::{Assignment, AssignmentStrategy, PartitionAssignor, RangeAssignor, RoundRobinAssignor, Subscription};
pub use self::builder::ConsumerBuilder;
pub use self::config::{
    ConsumerConfig, IsolationLevel, OffsetResetStrategy, StartMode, DEFAULT_AUTO_COMMIT_INTERVAL,
    DEFAULT_FETCH_MAX_BYTES, DEFAULT_FETCH_MAX_WAIT, DEFAULT_FETCH_MIN_BYTES, DEFAULT_HEARTBEAT_INTERVAL,
    DEFAULT_MAX_POLL_RECORDS, DEFAULT_PARTITION_FETCH_MAX_BYTES, DEFAULT_REBALANCE_TIMEOUT, DEFAULT_SESSION_TIMEOUT,
};
pub use self::consumer::{Consumer, KafkaConsumer};
pub use self::coordinator::{Coordinator, ConsumerCoordinator, GroupState, JoinResult};
pub use self::fetcher::{ConsumerRecord, Fetcher};
pub use self::protocol::CONSUMER_PROTOCOL;
pub use self::subscriptions::{PartitionState, Subscriptions};

//! Broker connectivity: framing, multiplexing, request dedup, and pooling (§4.4, §4.5).

pub mod connection;
pub mod fingerprint;
pub mod pool;
pub mod testing;

pub use connection::Connection;
pub use pool::ConnectionPool;
pub use testing::ScriptedBroker;

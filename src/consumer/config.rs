//! Consumer tuning knobs (§4.7): group membership timing, fetch sizing, offset reset behavior,
//! and autocommit.

use std::time::Duration;

use crate::sasl::Credentials;

pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_REBALANCE_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_MAX_POLL_RECORDS: usize = 500;
pub const DEFAULT_AUTO_COMMIT_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_FETCH_MIN_BYTES: i32 = 1;
pub const DEFAULT_FETCH_MAX_BYTES: i32 = 52_428_800;
pub const DEFAULT_PARTITION_FETCH_MAX_BYTES: i32 = 1_048_576;
pub const DEFAULT_FETCH_MAX_WAIT: Duration = Duration::from_millis(500);

/// Where to start reading a partition that has no usable position yet.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OffsetResetStrategy {
    Earliest,
    Latest,
}

/// `mode` (§4.7): `committed` resumes from the group's last committed offset; `earliest`/`latest`
/// seek to the log's respective end. `fallbackMode` only applies when `mode` is `Committed` and
/// the partition has no committed offset yet.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StartMode {
    Earliest,
    Latest,
    Committed,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
}

impl IsolationLevel {
    pub fn code(self) -> i8 {
        match self {
            IsolationLevel::ReadUncommitted => 0,
            IsolationLevel::ReadCommitted => 1,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ConsumerConfig {
    pub bootstrap_servers: Vec<String>,
    pub client_id: Option<String>,
    pub credentials: Option<Credentials>,
    pub group_id: String,
    pub group_instance_id: Option<String>,
    pub session_timeout: Duration,
    pub rebalance_timeout: Duration,
    pub heartbeat_interval: Duration,
    pub max_poll_records: usize,
    pub auto_commit: bool,
    pub auto_commit_interval: Duration,
    pub fetch_min_bytes: i32,
    pub fetch_max_bytes: i32,
    pub partition_fetch_max_bytes: i32,
    pub fetch_max_wait: Duration,
    pub isolation_level: IsolationLevel,
    pub mode: StartMode,
    pub fallback_mode: OffsetResetStrategy,
}

impl ConsumerConfig {
    pub fn new(bootstrap_servers: Vec<String>, group_id: impl Into<String>) -> Self {
        ConsumerConfig {
            bootstrap_servers,
            client_id: None,
            credentials: None,
            group_id: group_id.into(),
            group_instance_id: None,
            session_timeout: DEFAULT_SESSION_TIMEOUT,
            rebalance_timeout: DEFAULT_REBALANCE_TIMEOUT,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            max_poll_records: DEFAULT_MAX_POLL_RECORDS,
            auto_commit: true,
            auto_commit_interval: DEFAULT_AUTO_COMMIT_INTERVAL,
            fetch_min_bytes: DEFAULT_FETCH_MIN_BYTES,
            fetch_max_bytes: DEFAULT_FETCH_MAX_BYTES,
            partition_fetch_max_bytes: DEFAULT_PARTITION_FETCH_MAX_BYTES,
            fetch_max_wait: DEFAULT_FETCH_MAX_WAIT,
            isolation_level: IsolationLevel::ReadUncommitted,
            mode: StartMode::Committed,
            fallback_mode: OffsetResetStrategy::Latest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_start_from_committed_with_latest_fallback() {
        let cfg = ConsumerConfig::new(vec!["localhost:9092".into()], "g1");
        assert_eq!(cfg.mode, StartMode::Committed);
        assert_eq!(cfg.fallback_mode, OffsetResetStrategy::Latest);
        assert!(cfg.auto_commit);
    }
}

//! The closed error taxonomy used throughout the crate.
//!
//! Every error carries a domain `kind` (§3 of the design): `user`, `network`, `authentication`,
//! `protocol`, `response`, `unsupported`, `unsupported-compression`, `unexpected-correlation-id`,
//! `unfinished-write-buffer`, or `multiple`. Protocol errors additionally carry the numeric
//! api-error code, its symbolic name, and the retry-classification flags that drive
//! `client::retry::perform_with_retry`.

use std::fmt;

use error_chain::error_chain;

use crate::protocol::ApiKey;

/// Numeric Kafka protocol error codes and the flags that drive retry classification.
///
/// See <http://kafka.apache.org/protocol.html#protocol_error_codes>.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(i16)]
pub enum KafkaCode {
    Unknown = -1,
    None = 0,
    OffsetOutOfRange = 1,
    CorruptMessage = 2,
    UnknownTopicOrPartition = 3,
    InvalidFetchSize = 4,
    LeaderNotAvailable = 5,
    NotLeaderForPartition = 6,
    RequestTimedOut = 7,
    BrokerNotAvailable = 8,
    ReplicaNotAvailable = 9,
    MessageTooLarge = 10,
    StaleControllerEpoch = 11,
    OffsetMetadataTooLarge = 12,
    NetworkException = 13,
    CoordinatorLoadInProgress = 14,
    CoordinatorNotAvailable = 15,
    NotCoordinator = 16,
    InvalidTopicException = 17,
    RecordListTooLarge = 18,
    NotEnoughReplicas = 19,
    NotEnoughReplicasAfterAppend = 20,
    InvalidRequiredAcks = 21,
    IllegalGeneration = 22,
    InconsistentGroupProtocol = 23,
    InvalidGroupId = 24,
    UnknownMemberId = 25,
    InvalidSessionTimeout = 26,
    RebalanceInProgress = 27,
    InvalidCommitOffsetSize = 28,
    TopicAuthorizationFailed = 29,
    GroupAuthorizationFailed = 30,
    ClusterAuthorizationFailed = 31,
    InvalidTimestamp = 32,
    UnsupportedSaslMechanism = 33,
    IllegalSaslState = 34,
    UnsupportedVersion = 35,
    TopicAlreadyExists = 36,
    InvalidPartitions = 37,
    InvalidReplicationFactor = 38,
    InvalidReplicaAssignment = 39,
    InvalidConfig = 40,
    NotController = 41,
    InvalidRequest = 42,
    UnsupportedForMessageFormat = 43,
    PolicyViolation = 44,
    OutOfOrderSequenceNumber = 45,
    DuplicateSequenceNumber = 46,
    InvalidProducerEpoch = 47,
    InvalidTxnState = 48,
    InvalidProducerIdMapping = 49,
    InvalidTransactionTimeout = 50,
    ConcurrentTransactions = 51,
    TransactionCoordinatorFenced = 52,
    TransactionalIdAuthorizationFailed = 53,
    SecurityDisabled = 54,
    OperationNotAttempted = 55,
    KafkaStorageError = 56,
    LogDirNotFound = 57,
    SaslAuthenticationFailed = 58,
    UnknownProducerId = 59,
    ReassignmentInProgress = 60,
    MemberIdRequired = 79,
}

impl From<i16> for KafkaCode {
    fn from(v: i16) -> Self {
        // SAFETY: falls back to `Unknown` for any value the enum does not name, so this never
        // reads an invalid discriminant.
        match v {
            -1 => KafkaCode::Unknown,
            0 => KafkaCode::None,
            1 => KafkaCode::OffsetOutOfRange,
            2 => KafkaCode::CorruptMessage,
            3 => KafkaCode::UnknownTopicOrPartition,
            4 => KafkaCode::InvalidFetchSize,
            5 => KafkaCode::LeaderNotAvailable,
            6 => KafkaCode::NotLeaderForPartition,
            7 => KafkaCode::RequestTimedOut,
            8 => KafkaCode::BrokerNotAvailable,
            9 => KafkaCode::ReplicaNotAvailable,
            10 => KafkaCode::MessageTooLarge,
            11 => KafkaCode::StaleControllerEpoch,
            12 => KafkaCode::OffsetMetadataTooLarge,
            13 => KafkaCode::NetworkException,
            14 => KafkaCode::CoordinatorLoadInProgress,
            15 => KafkaCode::CoordinatorNotAvailable,
            16 => KafkaCode::NotCoordinator,
            17 => KafkaCode::InvalidTopicException,
            18 => KafkaCode::RecordListTooLarge,
            19 => KafkaCode::NotEnoughReplicas,
            20 => KafkaCode::NotEnoughReplicasAfterAppend,
            21 => KafkaCode::InvalidRequiredAcks,
            22 => KafkaCode::IllegalGeneration,
            23 => KafkaCode::InconsistentGroupProtocol,
            24 => KafkaCode::InvalidGroupId,
            25 => KafkaCode::UnknownMemberId,
            26 => KafkaCode::InvalidSessionTimeout,
            27 => KafkaCode::RebalanceInProgress,
            28 => KafkaCode::InvalidCommitOffsetSize,
            29 => KafkaCode::TopicAuthorizationFailed,
            30 => KafkaCode::GroupAuthorizationFailed,
            31 => KafkaCode::ClusterAuthorizationFailed,
            32 => KafkaCode::InvalidTimestamp,
            33 => KafkaCode::UnsupportedSaslMechanism,
            34 => KafkaCode::IllegalSaslState,
            35 => KafkaCode::UnsupportedVersion,
            36 => KafkaCode::TopicAlreadyExists,
            37 => KafkaCode::InvalidPartitions,
            38 => KafkaCode::InvalidReplicationFactor,
            39 => KafkaCode::InvalidReplicaAssignment,
            40 => KafkaCode::InvalidConfig,
            41 => KafkaCode::NotController,
            42 => KafkaCode::InvalidRequest,
            43 => KafkaCode::UnsupportedForMessageFormat,
            44 => KafkaCode::PolicyViolation,
            45 => KafkaCode::OutOfOrderSequenceNumber,
            46 => KafkaCode::DuplicateSequenceNumber,
            47 => KafkaCode::InvalidProducerEpoch,
            48 => KafkaCode::InvalidTxnState,
            49 => KafkaCode::InvalidProducerIdMapping,
            50 => KafkaCode::InvalidTransactionTimeout,
            51 => KafkaCode::ConcurrentTransactions,
            52 => KafkaCode::TransactionCoordinatorFenced,
            53 => KafkaCode::TransactionalIdAuthorizationFailed,
            54 => KafkaCode::SecurityDisabled,
            55 => KafkaCode::OperationNotAttempted,
            56 => KafkaCode::KafkaStorageError,
            57 => KafkaCode::LogDirNotFound,
            58 => KafkaCode::SaslAuthenticationFailed,
            59 => KafkaCode::UnknownProducerId,
            60 => KafkaCode::ReassignmentInProgress,
            79 => KafkaCode::MemberIdRequired,
            _ => KafkaCode::Unknown,
        }
    }
}

/// Retry-classification flags carried by every `KafkaCode`, seeded from the official error table.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ErrorFlags {
    pub can_retry: bool,
    pub has_stale_metadata: bool,
    pub rebalance_in_progress: bool,
    pub needs_rejoin: bool,
}

impl KafkaCode {
    pub fn flags(self) -> ErrorFlags {
        use KafkaCode::*;
        match self {
            RequestTimedOut | NetworkException | CoordinatorLoadInProgress
            | CoordinatorNotAvailable | KafkaStorageError | OperationNotAttempted => ErrorFlags {
                can_retry: true,
                ..Default::default()
            },
            LeaderNotAvailable | NotLeaderForPartition | UnknownTopicOrPartition | NotController
            | NotCoordinator | ReassignmentInProgress => ErrorFlags {
                can_retry: true,
                has_stale_metadata: true,
                ..Default::default()
            },
            RebalanceInProgress => ErrorFlags {
                can_retry: true,
                rebalance_in_progress: true,
                ..Default::default()
            },
            MemberIdRequired | IllegalGeneration | UnknownMemberId => ErrorFlags {
                can_retry: true,
                rebalance_in_progress: true,
                needs_rejoin: true,
                ..Default::default()
            },
            ConcurrentTransactions => ErrorFlags {
                can_retry: true,
                ..Default::default()
            },
            _ => ErrorFlags::default(),
        }
    }
}

impl fmt::Display for KafkaCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// `{ path, errorCode }` pair accumulated while parsing a response; aggregated into a
/// `ErrorKind::Response` when any path reports a non-zero code.
#[derive(Debug, Clone)]
pub struct PathError {
    pub path: String,
    pub code: KafkaCode,
}

error_chain! {
    foreign_links {
        Io(::std::io::Error);
        Utf8(::std::string::FromUtf8Error);
    }

    errors {
        /// Bad arguments supplied by the caller (`user` kind, §3).
        User(reason: String) {
            description("invalid argument")
            display("invalid argument: {}", reason)
        }

        /// A single protocol-level error returned by the broker for one RPC.
        Protocol(api_key: ApiKey, code: KafkaCode) {
            description("kafka protocol error")
            display("kafka protocol error on {:?}: {}", api_key, code)
        }

        /// Aggregate of multiple `Protocol` errors from one RPC (e.g. per-topic errors in
        /// `Metadata`); preserves the path for each and carries a debug rendering of the whole
        /// decoded response so callers may inspect partial results.
        Response(api_key: ApiKey, paths: Vec<PathError>, partial: String) {
            description("kafka response contained one or more errors")
            display("kafka response for {:?} contained {} error(s)", api_key, paths.len())
        }

        /// The requested API is missing at the broker, or the client/broker version ranges are
        /// disjoint.
        Unsupported(api_key: ApiKey) {
            description("unsupported api")
            display("api {:?} is not supported by this broker or client version", api_key)
        }

        /// A record batch asked for a compression codec this build was not compiled with.
        UnsupportedCompression(codec: u8) {
            description("unsupported compression codec")
            display("compression codec {} is not available in this build", codec)
        }

        /// A response frame's correlation id did not match any pending waiter.
        UnexpectedCorrelationId(id: i32) {
            description("unexpected correlation id")
            display("received response for unknown correlation id {}", id)
        }

        /// A write to the socket completed with fewer bytes than the framed request size.
        UnfinishedWriteBuffer(written: usize, expected: usize) {
            description("short write")
            display("wrote {} of {} expected bytes", written, expected)
        }

        /// Aggregate of multiple unrelated failures (fan-out / retry exhaustion).
        Multiple(causes: Vec<Error>) {
            description("multiple errors")
            display("{} error(s) occurred", causes.len())
        }

        /// Authentication (SASL) failed.
        Authentication(reason: String) {
            description("authentication failed")
            display("authentication failed: {}", reason)
        }

        /// A read or write ran past its deadline.
        Timeout(what: String) {
            description("operation timed out")
            display("{} timed out", what)
        }

        /// The codec read past the end of the supplied buffer.
        OutOfBounds(at: usize, needed: usize, len: usize) {
            description("out of bounds read")
            display("read {} bytes at offset {} but buffer only has {}", needed, at, len)
        }

        /// A malformed encoding that isn't simply a short read, e.g. a runaway varint.
        CodecError(reason: String) {
            description("codec error")
            display("codec error: {}", reason)
        }

        /// No broker currently holds the leader/coordinator for this resource.
        BrokerNotFound(what: String) {
            description("broker not found")
            display("no broker found for {}", what)
        }

        /// A second transaction was started while one was already active.
        TransactionInProgress {
            description("a transaction is already in progress")
        }

        /// The producer was fenced by a newer producer epoch / out-of-order sequence.
        ProducerFenced {
            description("producer has been fenced by the broker")
        }

        /// An operation was cancelled by its caller before completing.
        Cancelled(what: String) {
            description("operation cancelled")
            display("{} was cancelled", what)
        }
    }
}

impl Error {
    /// Best-effort retry classification by error kind, per §7's propagation policy.
    pub fn flags(&self) -> ErrorFlags {
        match self.0 {
            ErrorKind::Protocol(_, code) => code.flags(),
            ErrorKind::Io(_) => ErrorFlags {
                can_retry: true,
                ..Default::default()
            },
            ErrorKind::Response(_, ref paths, _) => {
                let mut flags = ErrorFlags::default();
                for p in paths {
                    let f = p.code.flags();
                    flags.can_retry |= f.can_retry;
                    flags.has_stale_metadata |= f.has_stale_metadata;
                    flags.rebalance_in_progress |= f.rebalance_in_progress;
                    flags.needs_rejoin |= f.needs_rejoin;
                }
                flags
            }
            _ => ErrorFlags::default(),
        }
    }
}

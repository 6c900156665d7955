//! `performWithRetry` (§4.6): repeats an operation until it succeeds, a non-retryable error is
//! observed, or `retries` is exhausted. Backoff is linear at `retryDelay`. Cancellation aborts a
//! wait or an in-flight retry immediately, returning the last observed error.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::{Error, ErrorFlags, Result};

#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub retries: u32,
    pub retry_delay: Duration,
}

impl RetryPolicy {
    pub fn new(retries: u32, retry_delay: Duration) -> Self {
        RetryPolicy {
            retries,
            retry_delay,
        }
    }
}

/// Runs `op` up to `policy.retries + 1` times. Before each retry, `on_retry` is invoked with the
/// flags of the failing error so the caller can react — force a metadata refresh on
/// `has_stale_metadata`, rejoin the group on `rebalance_in_progress` — before the next attempt
/// fires. Returns as soon as `op` succeeds, `cancel` fires, or the error is not retryable.
pub async fn perform_with_retry<T, Op, Fut, OnRetry, OnRetryFut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut on_retry: OnRetry,
    mut op: Op,
) -> Result<T>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    OnRetry: FnMut(&ErrorFlags) -> OnRetryFut,
    OnRetryFut: Future<Output = ()>,
{
    let mut attempt = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(crate::errors::ErrorKind::Cancelled("retry loop".into()).into());
        }

        let result = op().await;
        let err = match result {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        let flags = err.flags();
        if !flags.can_retry || attempt >= policy.retries {
            if attempt >= policy.retries && flags.can_retry {
                warn!(attempt, "retry budget exhausted");
            }
            return Err(err);
        }

        debug!(attempt, error = %err, "retrying after classified error");
        on_retry(&flags).await;
        attempt += 1;

        tokio::select! {
            _ = tokio::time::sleep(policy.retry_delay) => {}
            _ = cancel.cancelled() => {
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::protocol::ApiKey;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retrying_when_op_succeeds_first_try() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);
        let result = perform_with_retry(&policy, &cancel, |_| async {}, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Error>(42)
        })
        .await
        .unwrap();
        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_retryable_errors_until_success() {
        let policy = RetryPolicy::new(5, Duration::from_millis(1));
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);
        let result = perform_with_retry(&policy, &cancel, |_| async {}, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ErrorKind::Io(std::io::Error::new(std::io::ErrorKind::Other, "boom")).into())
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(result, 2);
    }

    #[tokio::test]
    async fn non_retryable_error_returns_immediately() {
        let policy = RetryPolicy::new(5, Duration::from_millis(1));
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);
        let result: Result<()> = perform_with_retry(&policy, &cancel, |_| async {}, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ErrorKind::User("bad argument".into()).into()) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausting_retries_returns_the_last_error() {
        let policy = RetryPolicy::new(2, Duration::from_millis(1));
        let cancel = CancellationToken::new();
        let result: Result<()> = perform_with_retry(&policy, &cancel, |_| async {}, || async {
            Err(ErrorKind::Protocol(ApiKey::Metadata, crate::errors::KafkaCode::LeaderNotAvailable).into())
        })
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn on_retry_observes_stale_metadata_flag() {
        let policy = RetryPolicy::new(1, Duration::from_millis(1));
        let cancel = CancellationToken::new();
        let mut saw_stale = false;
        let calls = AtomicU32::new(0);
        let _: Result<()> = perform_with_retry(
            &policy,
            &cancel,
            |flags| {
                saw_stale = flags.has_stale_metadata;
                async {}
            },
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(ErrorKind::Protocol(ApiKey::Metadata, crate::errors::KafkaCode::NotLeaderForPartition)
                        .into())
                }
            },
        )
        .await;
        assert!(saw_stale);
    }
}

//! Retry policy per operation class.
//!
//! Reads and remote-idempotent mutations retry transient failures with capped
//! exponential backoff. Creates never retry blindly: the resource client
//! re-runs its lookup first and only re-issues the create when nothing was
//! created (see [`crate::resource::ResourceClient::create_item`]).

use std::future::Future;
use std::time::Duration;

use crate::error::Result;

/// Default attempts for retryable classes.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;

/// Base backoff duration.
const BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Maximum backoff duration.
const BACKOFF_MAX: Duration = Duration::from_secs(30);

/// How an operation may be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationClass {
    /// Lookups and listings.
    IdempotentRead,
    /// Resource creation; a retry could duplicate the resource.
    Create,
    /// Role grants, bindings, capacity assignment and other writes the
    /// control plane applies idempotently.
    Mutation,
}

/// Attempts and backoff for one operation class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Delay cap.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub const NONE: Self = Self {
        max_attempts: 1,
        base_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
    };

    /// Default policy of an operation class.
    #[must_use]
    pub const fn for_class(class: OperationClass) -> Self {
        match class {
            OperationClass::IdempotentRead | OperationClass::Mutation => Self {
                max_attempts: DEFAULT_MAX_ATTEMPTS,
                base_delay: BACKOFF_BASE,
                max_delay: BACKOFF_MAX,
            },
            OperationClass::Create => Self::NONE,
        }
    }

    /// Delay before retry number `retry` (1-based).
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Runs `op`, retrying transient failures.
    ///
    /// # Errors
    ///
    /// Returns the first non-transient error, or the last error once attempts
    /// are exhausted.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_transient() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        %error,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio_test::block_on;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::for_class(OperationClass::IdempotentRead);
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for(10), Duration::from_secs(30));
        assert_eq!(policy.delay_for(64), Duration::from_secs(30));
    }

    #[test]
    fn creates_are_single_attempt() {
        assert_eq!(RetryPolicy::for_class(OperationClass::Create).max_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::for_class(OperationClass::IdempotentRead);

        let value = policy
            .run("list items", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Error::remote("list items", 503, "busy"))
                } else {
                    Ok(7)
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::for_class(OperationClass::Mutation);

        let result: Result<()> = policy
            .run("bind", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::remote("bind", 429, "throttled"))
            })
            .await;

        assert!(matches!(result, Err(Error::RemoteCall { status: 429, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), DEFAULT_MAX_ATTEMPTS);
    }

    #[test]
    fn permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::for_class(OperationClass::IdempotentRead);

        let result: Result<()> = block_on(policy.run("get", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::remote("get", 404, "missing"))
        }));

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

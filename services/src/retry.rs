//! Fixed-delay retry driver.
//!
//! Every attempt runs the whole operation again; between attempts the driver
//! sleeps for a constant delay (no backoff) and holds nothing while sleeping.
//! Errors that report themselves as permanent end the loop immediately.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

/// Lets the driver tell transient failures from permanent ones.
pub trait Retryable {
    fn is_retryable(&self) -> bool {
        true
    }
}

/// Attempt budget and delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts, including the first one. Zero behaves like one.
    pub attempts: u32,

    /// Sleep between two consecutive attempts.
    pub delay: Duration,
}

impl RetryConfig {
    /// 5 attempts, one minute apart.
    pub const DEFAULT: Self = Self {
        attempts: 5,
        delay: Duration::from_secs(60),
    };

    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Outcome of a retried operation.
#[derive(Debug)]
pub enum RetryResult<T, E> {
    /// The operation succeeded after `failed_attempts` failures.
    Success { value: T, failed_attempts: u32 },

    /// Every attempt failed; `last_error` is the error of the final one.
    ExhaustedRetries { last_error: E, attempts: u32 },

    /// A non-retryable error stopped the loop early.
    PermanentError { error: E, attempts: u32 },
}

impl<T, E> RetryResult<T, E> {
    pub fn into_result(self) -> Result<T, E> {
        match self {
            RetryResult::Success { value, .. } => Ok(value),
            RetryResult::ExhaustedRetries { last_error, .. } => Err(last_error),
            RetryResult::PermanentError { error, .. } => Err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RetryResult::Success { .. })
    }

    /// Number of times the operation ran.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryResult::Success { failed_attempts, .. } => failed_attempts + 1,
            RetryResult::ExhaustedRetries { attempts, .. } => *attempts,
            RetryResult::PermanentError { attempts, .. } => *attempts,
        }
    }
}

/// Runs `operation` until it succeeds, fails permanently or the attempt budget is spent.
///
/// `label` identifies the unit of work in logs. Each failed attempt is logged
/// at `warn`; exhaustion is logged at `error`.
pub async fn retry_fixed<T, E, F, Fut>(
    config: RetryConfig,
    label: &str,
    mut operation: F,
) -> RetryResult<T, E>
where
    E: Retryable + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = config.attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        let err = match operation().await {
            Ok(value) => {
                return RetryResult::Success {
                    value,
                    failed_attempts: attempt - 1,
                };
            }
            Err(e) => e,
        };

        if !err.is_retryable() {
            warn!(%label, attempt, error = %err, "permanent failure, not retrying");
            return RetryResult::PermanentError {
                error: err,
                attempts: attempt,
            };
        }

        if attempt >= max_attempts {
            error!(%label, attempts = attempt, error = %err, "giving up after exhausting retries");
            return RetryResult::ExhaustedRetries {
                last_error: err,
                attempts: attempt,
            };
        }

        warn!(
            %label,
            attempt,
            max_attempts,
            delay_secs = config.delay.as_secs(),
            error = %err,
            "attempt failed, retrying"
        );
        tokio::time::sleep(config.delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[derive(Debug, PartialEq, Eq)]
    enum TestError {
        Transient(u32),
        Permanent,
    }

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                TestError::Transient(n) => write!(f, "transient #{n}"),
                TestError::Permanent => write!(f, "permanent"),
            }
        }
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            matches!(self, TestError::Transient(_))
        }
    }

    const CONFIG: RetryConfig = RetryConfig {
        attempts: 5,
        delay: Duration::from_secs(60),
    };

    #[test]
    fn default_is_five_attempts_one_minute_apart() {
        assert_eq!(RetryConfig::default(), CONFIG);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_four_failures() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let res = retry_fixed(CONFIG, "test", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= 4 {
                Err(TestError::Transient(n))
            } else {
                Ok("done")
            }
        })
        .await;

        assert!(matches!(
            res,
            RetryResult::Success { value: "done", failed_attempts: 4 }
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert!(started.elapsed() >= Duration::from_secs(4 * 60));
    }

    #[tokio::test(start_paused = true)]
    async fn always_failing_stops_after_budget() {
        let calls = AtomicU32::new(0);

        let res: RetryResult<(), _> = retry_fixed(CONFIG, "test", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Err(TestError::Transient(n))
        })
        .await;

        assert_eq!(res.attempts(), 5);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        match res {
            RetryResult::ExhaustedRetries { last_error, attempts } => {
                assert_eq!(last_error, TestError::Transient(5));
                assert_eq!(attempts, 5);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let res: RetryResult<(), _> = retry_fixed(CONFIG, "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TestError::Permanent)
        })
        .await;

        assert!(matches!(
            res,
            RetryResult::PermanentError { error: TestError::Permanent, attempts: 1 }
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_runs_once() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::new(0, Duration::from_secs(1));

        let res: RetryResult<(), _> = retry_fixed(config, "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TestError::Transient(1))
        })
        .await;

        assert_eq!(res.attempts(), 1);
        assert!(!res.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn into_result_returns_last_error() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::new(2, Duration::from_millis(10));

        let res: Result<(), TestError> = retry_fixed(config, "test", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Err(TestError::Transient(n))
        })
        .await
        .into_result();

        assert_eq!(res, Err(TestError::Transient(2)));
    }
}

use crate::{LidarrError, Result};
use std::future::Future;
use std::time::Duration;

/// Configuration for retrying a whole logical operation.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,
    /// Wait before the second attempt
    pub initial_wait: Duration,
    /// Multiplier applied to the wait after every failed attempt
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_wait: Duration::from_secs(2),
            backoff_factor: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

/// Result of a retry operation with context
#[derive(Debug)]
pub struct RetryResult<T> {
    /// The successful result
    pub result: T,
    /// Number of failed attempts before the successful one
    pub attempts_made: u32,
    /// Total time spent sleeping between attempts
    pub total_retry_time: Duration,
}

/// Run `operation` until it succeeds, retrying on transport failures.
///
/// This sits above the gateway's own status-code retries: the operation may
/// issue several requests, and it is re-run from the start whenever one of
/// them fails with an error for which [`LidarrError::is_retryable`] holds.
/// Anything else, including [`LidarrError::Cancelled`], is returned at once.
/// The error from the final attempt is returned unchanged.
///
/// # Arguments
/// * `config` - Retry configuration
/// * `operation_name` - Name of the operation for logging
/// * `operation` - Async function that returns a Result
/// * `on_retry` - Called before each sleep with the failed attempt number
///   (1-based), the upcoming wait and the error
pub async fn retry_with_backoff<T, F, Fut, OnRetry>(
    config: RetryConfig,
    operation_name: &str,
    mut operation: F,
    mut on_retry: OnRetry,
) -> Result<RetryResult<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    OnRetry: FnMut(u32, Duration, &LidarrError),
{
    let max_attempts = config.max_attempts.max(1);
    let mut wait = config.initial_wait;
    let mut attempt = 0;
    let mut total_retry_time = Duration::ZERO;

    loop {
        attempt += 1;
        match operation().await {
            Ok(result) => {
                return Ok(RetryResult {
                    result,
                    attempts_made: attempt - 1,
                    total_retry_time,
                });
            }
            Err(error) if error.is_retryable() && attempt < max_attempts => {
                log::info!(
                    "{operation_name} attempt {attempt} failed ({error}), retrying in {:.1} seconds",
                    wait.as_secs_f64()
                );
                on_retry(attempt, wait, &error);

                tokio::time::sleep(wait).await;
                total_retry_time += wait;
                wait = wait.mul_f64(config.backoff_factor.max(0.0));
            }
            Err(error) => {
                if error.is_retryable() {
                    log::warn!("{operation_name} failed after {attempt} attempt(s): {error}");
                }
                return Err(error);
            }
        }
    }
}

/// Simplified retry function for callers that only need the log notice
pub async fn retry_operation<T, F, Fut>(
    config: RetryConfig,
    operation_name: &str,
    operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_with_backoff(config, operation_name, operation, |_, _, _| {})
        .await
        .map(|retry| retry.result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TransportFailure;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    fn connection_error() -> LidarrError {
        LidarrError::Transport {
            url: "http://localhost:8686/api/v1/artist".to_string(),
            failure: TransportFailure::Connection("connection refused".to_string()),
        }
    }

    #[tokio::test]
    async fn test_successful_operation() {
        let result = retry_with_backoff(
            RetryConfig::default(),
            "test",
            || async { Ok::<i32, LidarrError>(42) },
            |_, _, _| panic!("no retry expected"),
        )
        .await;

        let retry_result = result.unwrap();
        assert_eq!(retry_result.result, 42);
        assert_eq!(retry_result.attempts_made, 0);
        assert_eq!(retry_result.total_retry_time, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_third_attempt_after_backoff() {
        let call_count = Arc::new(AtomicU32::new(0));
        let call_count_clone = call_count.clone();
        let mut notices = Vec::new();

        let start = Instant::now();
        let result = retry_with_backoff(
            RetryConfig::default(),
            "list artists",
            move || {
                let count = call_count_clone.fetch_add(1, Ordering::SeqCst);
                async move {
                    if count < 2 {
                        Err(connection_error())
                    } else {
                        Ok::<&str, LidarrError>("third")
                    }
                }
            },
            |attempt, wait, _| notices.push((attempt, wait)),
        )
        .await
        .unwrap();
        let elapsed = start.elapsed();

        assert_eq!(result.result, "third");
        assert_eq!(result.attempts_made, 2);
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
        // 2s initial wait, then 2s * 2.0
        assert_eq!(result.total_retry_time, Duration::from_secs(6));
        assert!(elapsed >= Duration::from_secs(6));
        assert!(elapsed < Duration::from_millis(6100));
        assert_eq!(
            notices,
            vec![(1, Duration::from_secs(2)), (2, Duration::from_secs(4))]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_failure_propagates_unchanged() {
        let call_count = Arc::new(AtomicU32::new(0));
        let call_count_clone = call_count.clone();

        let result = retry_operation(RetryConfig::default(), "test", move || {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), LidarrError>(connection_error()) }
        })
        .await;

        assert_eq!(call_count.load(Ordering::SeqCst), 3);
        match result.unwrap_err() {
            LidarrError::Transport {
                failure: TransportFailure::Connection(message),
                ..
            } => assert_eq!(message, "connection refused"),
            other => panic!("Expected connection error, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancellation_is_never_retried() {
        let call_count = Arc::new(AtomicU32::new(0));
        let call_count_clone = call_count.clone();

        let result = retry_operation(RetryConfig::default(), "test", move || {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), LidarrError>(LidarrError::Cancelled) }
        })
        .await;

        assert!(matches!(result, Err(LidarrError::Cancelled)));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_decode_errors_are_not_retried() {
        let call_count = Arc::new(AtomicU32::new(0));
        let call_count_clone = call_count.clone();

        let result = retry_operation(RetryConfig::default(), "test", move || {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), LidarrError>(LidarrError::Decode("bad json".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(LidarrError::Decode(_))));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let config = RetryConfig::default().with_max_attempts(0);
        let result = retry_operation(config, "test", || async { Ok::<u8, LidarrError>(1) }).await;
        assert_eq!(result.unwrap(), 1);
    }
}

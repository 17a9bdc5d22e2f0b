//! Retry logic with exponential backoff and jitter.
//!
//! Used for bounded retries of collaborator calls whose failure may be
//! transient, such as a metadata provider that briefly reports a repository
//! as having no branches.

use std::future::Future;
use std::time::Duration;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 = no retries).
    pub max_attempts: u32,

    /// Initial delay before first retry.
    pub initial_delay: Duration,

    /// Maximum delay between retries.
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (e.g., 2.0 = double each time).
    pub backoff_multiplier: f64,

    /// Whether to add jitter to delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::branch_discovery()
    }
}

impl RetryConfig {
    /// Create a config with no retries (fail fast).
    pub fn no_retry() -> Self {
        Self { max_attempts: 0, ..Self::branch_discovery() }
    }

    /// Bounded retry for branch discovery.
    pub fn branch_discovery() -> Self {
        Self {
            max_attempts: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(4),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }

    /// Calculate delay for the given attempt number.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_delay = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32 - 1);
        let capped_delay = base_delay.min(self.max_delay.as_millis() as f64);

        let final_delay = if self.jitter {
            // Up to 25% on top of the computed delay
            capped_delay * (1.0 + rand_jitter() * 0.25)
        } else {
            capped_delay
        };

        Duration::from_millis(final_delay as u64)
    }
}

/// Pseudo-random jitter in `0.0..1.0` taken from the clock's sub-second part.
fn rand_jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos % 1000) as f64 / 1000.0
}

/// Result of a retry operation.
#[derive(Debug)]
pub struct RetryResult<T, E> {
    /// The final result (success or last error).
    pub result: Result<T, E>,

    /// Number of attempts made.
    pub attempts: u32,
}

impl<T, E> RetryResult<T, E> {
    /// Check if the operation succeeded.
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// Whether more than one attempt was made.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Get the result.
    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

/// Retry an async operation while `should_retry` accepts the error.
///
/// Errors the predicate rejects are returned immediately.
pub async fn retry_async_when<T, E, F, Fut, P>(
    config: &RetryConfig,
    mut operation: F,
    should_retry: P,
) -> RetryResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut attempts = 0;
    let max_attempts = config.max_attempts + 1;

    loop {
        attempts += 1;
        let result = operation().await;

        let retryable = matches!(&result, Err(e) if should_retry(e));
        if !retryable || attempts >= max_attempts {
            return RetryResult { result, attempts };
        }

        let delay = config.delay_for_attempt(attempts);
        tracing::debug!(attempt = attempts, delay_ms = delay.as_millis() as u64, "Retrying");
        tokio::time::sleep(delay).await;
    }
}

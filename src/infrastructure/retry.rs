use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// RetryConfig は指数バックオフ付きリトライの方針を表す。
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Delay before the retry that follows the zero-based `attempt`.
    /// With jitter the result varies by at most 10% around the capped value.
    pub fn compute_delay(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_millis() as f64);
        let delay_ms = if self.jitter {
            let jitter_range = capped * 0.1;
            capped - jitter_range + (rand::random::<f64>() * jitter_range * 2.0)
        } else {
            capped
        };
        Duration::from_millis(delay_ms as u64)
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RetryError<E> {
    /// The operation failed with an error the predicate refused to retry.
    #[error("{0}")]
    Permanent(E),

    #[error("retries exhausted after {attempts} attempts: {last_error}")]
    ExhaustedRetries { attempts: u32, last_error: E },
}

/// with_retry は `should_retry` が真を返すエラーに限り操作を再試行する。
pub async fn with_retry<F, Fut, T, E, P>(
    config: &RetryConfig,
    should_retry: P,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    P: Fn(&E) -> bool,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !should_retry(&err) {
            return Err(RetryError::Permanent(err));
        }
        attempt += 1;
        tracing::warn!(attempt, max_attempts, error = %err, "retryable failure");
        if attempt >= max_attempts {
            return Err(RetryError::ExhaustedRetries {
                attempts: attempt,
                last_error: err,
            });
        }
        tokio::time::sleep(config.compute_delay(attempt - 1)).await;
    }
}

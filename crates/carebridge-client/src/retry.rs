use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Exponential backoff policy for transient vendor failures.
///
/// The delay starts at `initial_delay`, is multiplied by
/// `backoff_multiplier` after every failed attempt, and is clamped to
/// `max_delay`. No jitter. The error of the final attempt is returned to the
/// caller unchanged.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    #[must_use]
    pub fn with_backoff_multiplier(mut self, backoff_multiplier: f64) -> Self {
        self.backoff_multiplier = backoff_multiplier;
        self
    }

    /// Run `operation`, retrying every failure up to the budget.
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.execute_if(operation, |_| true).await
    }

    /// Run `operation`, retrying only failures for which `should_retry`
    /// returns true. Excluded failures surface immediately without spending
    /// budget; after `max_retries` retries the last error is returned as-is.
    pub async fn execute_if<T, E, F, Fut, P>(
        &self,
        mut operation: F,
        should_retry: P,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        P: Fn(&E) -> bool,
    {
        let mut retries = 0u32;
        let mut delay = self.initial_delay;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if retries >= self.max_retries || !should_retry(&error) {
                        return Err(error);
                    }
                    retries += 1;
                    let sleep_for = delay.min(self.max_delay);
                    tracing::warn!(
                        attempt = retries,
                        max_retries = self.max_retries,
                        delay_ms = sleep_for.as_millis() as u64,
                        error = %error,
                        "operation failed, backing off before retry"
                    );
                    tokio::time::sleep(sleep_for).await;
                    delay = delay.mul_f64(self.backoff_multiplier).min(self.max_delay);
                }
            }
        }
    }
}

use crate::config::RetryConfig;
use crate::error::{ClassifiedError, ToolError};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::classify::classify;

pub type RetryPredicate = Arc<dyn Fn(&ClassifiedError) -> bool + Send + Sync>;

/// Bounded exponential backoff settings for one tool invocation
#[derive(Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub retry_predicate: RetryPredicate,
}

impl RetryPolicy {
    pub fn with_predicate<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&ClassifiedError) -> bool + Send + Sync + 'static,
    {
        self.retry_predicate = Arc::new(predicate);
        self
    }

    pub fn should_retry(&self, error: &ClassifiedError) -> bool {
        (self.retry_predicate)(error)
    }

    /// Unjittered delay after attempt `attempt` (0-based): min(max, base * mult^attempt)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let max = self.max_delay.as_secs_f64();

        if secs.is_finite() && secs >= 0.0 && secs < max {
            Duration::from_secs_f64(secs)
        } else {
            self.max_delay
        }
    }

    /// Backoff scaled by a random factor in [0.5, 1.0)
    pub fn jittered_backoff(&self, attempt: u32) -> Duration {
        let factor = 0.5 + rand::random::<f64>() * 0.5;
        self.backoff(attempt).mul_f64(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            backoff_multiplier: config.backoff_multiplier,
            retry_predicate: Arc::new(|e: &ClassifiedError| e.is_retryable),
        }
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .finish_non_exhaustive()
    }
}

/// Execute an async operation with jittered exponential backoff.
///
/// Both the attempt in flight and the backoff sleep are raced against `cancel`;
/// once it fires the call resolves to a non-retryable cancelled error.
pub async fn retry_with_backoff<F, Fut, T>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, ClassifiedError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ToolError>>,
{
    let mut attempt: u32 = 0;

    loop {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ToolError::Cancelled),
            result = operation() => result,
        };

        let error = match outcome {
            Ok(value) => return Ok(value),
            Err(e) => classify(&e),
        };

        if cancel.is_cancelled() {
            return Err(ClassifiedError::cancelled());
        }

        if attempt >= policy.max_retries {
            warn!("All {} attempts failed: {}", attempt + 1, error);
            return Err(error);
        }

        if !policy.should_retry(&error) {
            debug!(
                "Attempt {} failed with non-retryable {} error: {}",
                attempt + 1,
                error.code,
                error
            );
            return Err(error);
        }

        let delay = policy.jittered_backoff(attempt);
        warn!(
            "Attempt {} failed: {}. Retrying in {:?}...",
            attempt + 1,
            error,
            delay
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ClassifiedError::cancelled()),
            _ = sleep(delay) => {}
        }

        attempt += 1;
    }
}

/// Runs retrying operations while keeping a cancellation handle per request id,
/// so a caller that only knows the id can abort an in-flight call.
#[derive(Default)]
pub struct RetryExecutor {
    handles: Mutex<HashMap<String, CancellationToken>>,
}

impl RetryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request ids are expected to be unique among in-flight calls.
    pub async fn execute<F, Fut, T>(
        &self,
        request_id: &str,
        policy: &RetryPolicy,
        parent: &CancellationToken,
        operation: F,
    ) -> Result<T, ClassifiedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ToolError>>,
    {
        let token = parent.child_token();
        let _guard = HandleGuard::register(self, request_id, token.clone());

        retry_with_backoff(policy, &token, operation).await
    }

    /// Cancel the in-flight call registered under `request_id`
    pub fn cancel(&self, request_id: &str) -> bool {
        match self.lock().get(request_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_in_flight(&self, request_id: &str) -> bool {
        self.lock().contains_key(request_id)
    }

    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CancellationToken>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes the handle on final success, final failure, or when the call is dropped
struct HandleGuard<'a> {
    executor: &'a RetryExecutor,
    request_id: String,
}

impl<'a> HandleGuard<'a> {
    fn register(executor: &'a RetryExecutor, request_id: &str, token: CancellationToken) -> Self {
        executor.lock().insert(request_id.to_string(), token);
        Self {
            executor,
            request_id: request_id.to_string(),
        }
    }
}

impl Drop for HandleGuard<'_> {
    fn drop(&mut self) {
        self.executor.lock().remove(&self.request_id);
    }
}

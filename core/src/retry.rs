//! Retry policy for transient server failures.
//!
//! Only responses with a status in `retryable_statuses` are retried; requests
//! that never got a response fail immediately. Backoff is pure exponential
//! (`base_delay * 2^(attempt - 1)`) with no jitter.
//!
//! Automatic retry is limited to idempotent methods. A POST or PATCH is
//! retried only when its descriptor opted in with `HttpRequest::retryable`,
//! since replaying e.g. a cleanup dispatch may create a duplicate job.

use std::time::Duration;

use crate::http::HttpRequest;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_RETRYABLE_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_RETRY_DELAY,
            retryable_statuses: DEFAULT_RETRYABLE_STATUSES.to_vec(),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Decide whether `request`, which just received `status`, gets another
    /// attempt.
    pub fn should_retry(&self, request: &HttpRequest, status: u16) -> bool {
        (request.method.is_idempotent() || request.retry_opt_in)
            && request.attempt < self.max_retries
            && self.retryable_statuses.contains(&status)
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

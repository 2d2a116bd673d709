//! Fixed-delay retry policy.
//!
//! The queue deliberately retries with a flat delay rather than exponential
//! backoff: the primary retry trigger is connectivity restoration, an
//! external event, and the delay only paces retries that happen while
//! already online. Parts of a larger system that hammer an API directly
//! want exponential pressure relief; a connectivity-gated queue does not.

use std::time::Duration;

/// Outcome of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Schedule another attempt after the given delay.
    RetryAfter(Duration),
    /// Retry budget spent; the action is terminally failed.
    Exhausted,
}

/// Pure retry decision function over `(retry_count, max_retries)`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    retry_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy with the given fixed delay.
    pub fn new(retry_delay: Duration) -> Self {
        Self { retry_delay }
    }

    /// The configured flat delay, identical for every retry of an action.
    pub fn delay(&self) -> Duration {
        self.retry_delay
    }

    /// Decide what happens after a failed attempt. `retry_count` is the
    /// count *before* the failure is recorded: an action fails terminally
    /// exactly when its budget was already spent going into the attempt.
    pub fn after_failure(&self, retry_count: u32, max_retries: u32) -> RetryDecision {
        if retry_count < max_retries {
            RetryDecision::RetryAfter(self.retry_delay)
        } else {
            RetryDecision::Exhausted
        }
    }
}

use crate::error::ProviderError;
use std::time::Duration;

/// Bounded retry with capped exponential backoff. The policy only computes
/// delays; actually sleeping is the coordinator's business, which keeps
/// this testable without timers.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts per adapter, first try included.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(4),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based). Doubles each time,
    /// capped at `max_delay`.
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// One step of the fetch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStep {
    /// Call adapter `adapter` (index into the priority-ordered chain).
    /// `delay` is the backoff to wait first; `None` on a fresh attempt.
    Attempt {
        adapter: usize,
        attempt: u32,
        delay: Option<Duration>,
    },
    /// Every adapter has been exhausted.
    Exhausted,
}

/// Explicit adapter-cursor plus attempt-counter state machine. Retryable
/// errors burn attempts on the current adapter; deterministic ones advance
/// the cursor immediately. A test can drive this synchronously by feeding
/// it errors.
#[derive(Debug)]
pub struct FetchPlan {
    policy: RetryPolicy,
    adapter_count: usize,
    cursor: usize,
    attempt: u32,
}

impl FetchPlan {
    pub fn new(policy: RetryPolicy, adapter_count: usize) -> Self {
        FetchPlan {
            policy,
            adapter_count,
            cursor: 0,
            attempt: 1,
        }
    }

    pub fn next_step(&self) -> FetchStep {
        if self.cursor >= self.adapter_count {
            return FetchStep::Exhausted;
        }
        let delay = if self.attempt > 1 {
            Some(self.policy.backoff_delay(self.attempt - 1))
        } else {
            None
        };
        FetchStep::Attempt {
            adapter: self.cursor,
            attempt: self.attempt,
            delay,
        }
    }

    /// Record a failed call and move the machine forward.
    pub fn record_failure(&mut self, err: &ProviderError) {
        if err.is_retryable() && self.attempt < self.policy.max_attempts {
            self.attempt += 1;
        } else {
            self.advance_adapter();
        }
    }

    /// Skip the current adapter without burning attempts (unavailable:
    /// missing key, policy-disabled).
    pub fn advance_adapter(&mut self) {
        self.cursor += 1;
        self.attempt = 1;
    }
}

//! Retry policy for a single provider
//!
//! `RetryPolicy::execute` drives one provider through up to `max_attempts`
//! attempts. Every completed attempt is reported to the `HealthMonitor`, and
//! both attempts and backoff sleeps stop as soon as the caller cancels or the
//! overall deadline passes.

use super::backoff::{BackoffSchedule, BackoffStrategy};
use crate::error::OrchestrationError;
use crate::health::HealthMonitor;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Configuration for retry behavior
///
/// # Example
/// ```
/// use quill_core::recovery::RetryConfig;
/// use std::time::Duration;
///
/// let config = RetryConfig::default()
///     .with_max_attempts(5)
///     .with_base_delay(Duration::from_millis(200));
/// assert_eq!(config.max_attempts, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per provider, including the first
    pub max_attempts: u32,
    /// Delay unit of the backoff schedule
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
    /// Upper bound for any single delay, including server-requested ones
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    pub schedule: BackoffSchedule,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            schedule: BackoffSchedule::Linear,
        }
    }
}

impl RetryConfig {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_schedule(mut self, schedule: BackoffSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Create the backoff strategy described by this config
    pub fn create_backoff(&self) -> Box<dyn BackoffStrategy> {
        self.schedule.strategy(self.base_delay, self.max_delay)
    }
}

/// Cancellation and deadline shared by every attempt of one call
#[derive(Debug, Clone)]
pub struct CallContext {
    cancel: CancellationToken,
    timeout: Duration,
    deadline: Instant,
}

impl CallContext {
    /// Context whose deadline is `timeout` from now
    pub fn new(timeout: Duration) -> Self {
        Self {
            cancel: CancellationToken::new(),
            timeout,
            deadline: Instant::now() + timeout,
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// The error that ends the call early, if the caller cancelled or the deadline passed
    pub fn interruption(&self) -> Option<OrchestrationError> {
        if self.cancel.is_cancelled() {
            Some(OrchestrationError::cancelled())
        } else if self.is_expired() {
            Some(OrchestrationError::deadline_exceeded(self.timeout))
        } else {
            None
        }
    }
}

/// Result of `RetryPolicy::execute`
#[derive(Debug)]
pub struct RetryOutcome<T> {
    pub result: Result<T, OrchestrationError>,
    /// Attempts started against the provider
    pub attempts: u32,
}

/// Retry policy for one provider
#[derive(Debug)]
pub struct RetryPolicy {
    config: RetryConfig,
    backoff: Box<dyn BackoffStrategy>,
    health: Arc<HealthMonitor>,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig, health: Arc<HealthMonitor>) -> Self {
        let backoff = config.create_backoff();
        Self {
            config,
            backoff,
            health,
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Delay after `failures` consecutive failures, raised to a server-supplied
    /// minimum and capped at `max_delay`
    pub fn delay_for_attempt(&self, failures: u32, retry_after: Option<Duration>) -> Duration {
        let scheduled = self.backoff.delay_for_attempt(failures);
        retry_after
            .map_or(scheduled, |minimum| scheduled.max(minimum))
            .min(self.config.max_delay)
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `operation` receives the 1-based attempt number. Each completed attempt
    /// is recorded with the health monitor; an attempt abandoned because the
    /// call was cancelled or its deadline passed is not recorded.
    pub async fn execute<T, F, Fut>(
        &self,
        provider: &str,
        ctx: &CallContext,
        mut operation: F,
    ) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, OrchestrationError>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            if let Some(stop) = ctx.interruption() {
                return RetryOutcome {
                    result: Err(stop),
                    attempts: attempt,
                };
            }

            attempt += 1;
            let started = Instant::now();
            let result = tokio::select! {
                biased;
                _ = ctx.cancel_token().cancelled() => {
                    debug!(provider, attempt, "attempt abandoned, call cancelled");
                    Err(OrchestrationError::cancelled())
                }
                _ = tokio::time::sleep_until(ctx.deadline()) => {
                    debug!(provider, attempt, "attempt abandoned, deadline passed");
                    Err(OrchestrationError::deadline_exceeded(ctx.timeout))
                }
                result = operation(attempt) => {
                    let latency_ms = started.elapsed().as_millis() as u64;
                    match &result {
                        Ok(_) => self.health.record_outcome(provider, true, latency_ms, None),
                        Err(error) => {
                            self.health
                                .record_outcome(provider, false, latency_ms, Some(error.kind()))
                        }
                    }
                    result
                }
            };

            let error = match result {
                Ok(value) => {
                    return RetryOutcome {
                        result: Ok(value),
                        attempts: attempt,
                    };
                }
                Err(error) => error,
            };

            if !error.is_retryable() || attempt >= max_attempts {
                return RetryOutcome {
                    result: Err(error),
                    attempts: attempt,
                };
            }

            let delay = self.delay_for_attempt(attempt, error.retry_after());
            warn!(
                provider,
                attempt,
                max_attempts,
                delay = ?delay,
                kind = %error.kind(),
                "attempt failed, retrying"
            );

            tokio::select! {
                biased;
                _ = ctx.cancel_token().cancelled() => {
                    return RetryOutcome {
                        result: Err(OrchestrationError::cancelled()),
                        attempts: attempt,
                    };
                }
                _ = tokio::time::sleep_until(ctx.deadline()) => {
                    return RetryOutcome {
                        result: Err(OrchestrationError::deadline_exceeded(ctx.timeout)),
                        attempts: attempt,
                    };
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

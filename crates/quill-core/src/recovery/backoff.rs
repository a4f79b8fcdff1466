//! Backoff schedules for retrying a single provider

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backoff strategy trait
pub trait BackoffStrategy: Send + Sync + std::fmt::Debug {
    /// Delay after the `failures`-th consecutive failed attempt (1-based)
    fn delay_for_attempt(&self, failures: u32) -> Duration;
}

/// `min(base * k, max)`
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    base: Duration,
    max_delay: Duration,
}

impl LinearBackoff {
    pub fn new(base: Duration, max_delay: Duration) -> Self {
        Self { base, max_delay }
    }
}

impl BackoffStrategy for LinearBackoff {
    fn delay_for_attempt(&self, failures: u32) -> Duration {
        self.base
            .checked_mul(failures.max(1))
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// `min(base * 2^(k-1), max)`
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base: Duration,
    max_delay: Duration,
}

impl ExponentialBackoff {
    pub fn new(base: Duration, max_delay: Duration) -> Self {
        Self { base, max_delay }
    }
}

impl BackoffStrategy for ExponentialBackoff {
    fn delay_for_attempt(&self, failures: u32) -> Duration {
        let exponent = failures.max(1) - 1;
        2u32.checked_pow(exponent)
            .and_then(|factor| self.base.checked_mul(factor))
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Which schedule `[retry]` uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffSchedule {
    #[default]
    Linear,
    Exponential,
}

impl BackoffSchedule {
    pub fn strategy(&self, base: Duration, max_delay: Duration) -> Box<dyn BackoffStrategy> {
        match self {
            BackoffSchedule::Linear => Box::new(LinearBackoff::new(base, max_delay)),
            BackoffSchedule::Exponential => Box::new(ExponentialBackoff::new(base, max_delay)),
        }
    }
}

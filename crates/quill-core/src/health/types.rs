//! Health data types

use crate::error::ErrorKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Ordering used to put healthier providers first
    pub fn rank(&self) -> u8 {
        match self {
            HealthStatus::Healthy => 0,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 2,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Thresholds of the health state machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Consecutive failures before a healthy provider is degraded
    pub degraded_after: u32,
    /// Further consecutive failures before a degraded provider is unhealthy
    pub unhealthy_after: u32,
    /// How long an unhealthy provider is skipped
    #[serde(with = "humantime_serde")]
    pub cooldown: Duration,
    /// Background probe period; probes are off when unset
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub probe_interval: Option<Duration>,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            degraded_after: 3,
            unhealthy_after: 2,
            cooldown: Duration::from_secs(60),
            probe_interval: None,
        }
    }
}

/// Point-in-time health of one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderHealth {
    pub provider_name: String,
    pub status: HealthStatus,
    pub consecutive_failures: u32,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub last_latency_ms: Option<u64>,
    /// Exponentially smoothed latency (alpha 0.3)
    pub avg_latency_ms: Option<u64>,
    pub last_error_kind: Option<ErrorKind>,
    pub total_requests: u64,
    pub total_failures: u64,
    pub tokens_served: u64,
}

impl ProviderHealth {
    pub fn new(provider_name: impl Into<String>) -> Self {
        Self {
            provider_name: provider_name.into(),
            status: HealthStatus::Healthy,
            consecutive_failures: 0,
            last_success_at: None,
            last_failure_at: None,
            last_latency_ms: None,
            avg_latency_ms: None,
            last_error_kind: None,
            total_requests: 0,
            total_failures: 0,
            tokens_served: 0,
        }
    }

    /// Share of recorded attempts that succeeded; 1.0 before any attempt
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            1.0
        } else {
            (self.total_requests - self.total_failures) as f64 / self.total_requests as f64
        }
    }
}

/// A status transition, broadcast to subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthEvent {
    pub provider: String,
    pub from: HealthStatus,
    pub to: HealthStatus,
    pub consecutive_failures: u32,
    pub at: DateTime<Utc>,
}

//! Provider health tracking
//!
//! Each provider moves through a small state machine driven by call outcomes:
//!
//! ```text
//! healthy --N consecutive failures--> degraded --M more--> unhealthy
//!    ^                                                        |
//!    +------------- any success <---- degraded <-- cooldown --+
//! ```
//!
//! Unhealthy providers are skipped until their cooldown elapses; the first
//! eligibility check afterwards moves them to degraded (half-open), where a
//! single success restores them and another failure sends them straight back.

mod monitor;
mod types;


pub use monitor::HealthMonitor;
pub use types::{HealthConfig, HealthEvent, HealthStatus, ProviderHealth};

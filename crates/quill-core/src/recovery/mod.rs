//! Attempt-level recovery
//!
//! - Backoff schedules (linear by default, exponential on request)
//! - The per-provider retry loop with cancellation and deadlines
//!
//! Provider-level fallback lives in `llm::orchestrator`.

pub mod backoff;
pub mod retry;

pub use backoff::{BackoffSchedule, BackoffStrategy, ExponentialBackoff, LinearBackoff};
pub use retry::{CallContext, RetryConfig, RetryOutcome, RetryPolicy};

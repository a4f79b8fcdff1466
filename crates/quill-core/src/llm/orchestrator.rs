//! Provider-level fallback
//!
//! ```text
//! Selecting -> Attempting -> Succeeded ----------------> Terminal(Success)
//!                  |
//!                  +-------> NextProvider -> Attempting
//!                                  |
//!                                  +-------------------> Terminal(Exhausted)
//! ```
//!
//! Candidates are tried strictly one at a time. Each one runs under the
//! `RetryPolicy`; a cancelled or expired call stops without trying the rest.

use super::classifier::ErrorClassifier;
use super::provider::RawProviderError;
use super::registry::{ProviderRegistry, RegisteredProvider, RegistrySnapshot};
use super::request::CompletionRequest;
use super::response::{CompletionResponse, RawCompletion, ResponseNormalizer};
use crate::error::{ErrorKind, OrchestrationError, ProviderFailure};
use crate::health::HealthMonitor;
use crate::recovery::{CallContext, RetryConfig, RetryPolicy};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Where a call is in the fallback loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackState {
    Selecting,
    Attempting { provider: String },
    NextProvider { failed: String },
    Succeeded { provider: String },
    Exhausted,
}

impl fmt::Display for FallbackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Selecting => write!(f, "selecting"),
            Self::Attempting { provider } => write!(f, "attempting {}", provider),
            Self::NextProvider { failed } => write!(f, "next provider after {}", failed),
            Self::Succeeded { provider } => write!(f, "succeeded on {}", provider),
            Self::Exhausted => write!(f, "exhausted"),
        }
    }
}

pub struct FallbackOrchestrator {
    registry: Arc<ProviderRegistry>,
    health: Arc<HealthMonitor>,
    retry: RetryPolicy,
    attempt_timeout: Duration,
}

impl FallbackOrchestrator {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        health: Arc<HealthMonitor>,
        retry_config: RetryConfig,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            retry: RetryPolicy::new(retry_config, Arc::clone(&health)),
            registry,
            health,
            attempt_timeout,
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Providers to try, in order, plus the providers skipped up front.
    ///
    /// Order is healthy before degraded, then priority, then configuration
    /// order. A provider named by the request's model preference goes first
    /// if it is eligible.
    pub fn candidates(
        &self,
        snapshot: &RegistrySnapshot,
        request: &CompletionRequest,
    ) -> (Vec<Arc<RegisteredProvider>>, Vec<ProviderFailure>) {
        let required = request.required_capability();
        let mut candidates = Vec::new();
        let mut skipped = Vec::new();

        for entry in snapshot.entries() {
            let name = entry.name();
            if !entry.descriptor.supports(required) {
                skipped.push(ProviderFailure::skipped(
                    name,
                    ErrorKind::ClientError,
                    format!("does not support {:?} requests", required).to_lowercase(),
                ));
                continue;
            }
            if !self.health.is_eligible(name) {
                let kind = self
                    .health
                    .status_of(name)
                    .last_error_kind
                    .unwrap_or(ErrorKind::ServerError);
                skipped.push(ProviderFailure::skipped(
                    name,
                    kind,
                    "unhealthy, waiting for cooldown",
                ));
                continue;
            }
            candidates.push(Arc::clone(entry));
        }

        // snapshot entries are already in priority order; the sort is stable
        candidates.sort_by_key(|entry| self.health.status_of(entry.name()).status.rank());

        if let Some(preference) = request.model() {
            if let Some(index) = candidates
                .iter()
                .position(|entry| entry.descriptor.matches_preference(preference))
            {
                let preferred = candidates.remove(index);
                candidates.insert(0, preferred);
            }
        }

        (candidates, skipped)
    }

    /// Serve `request` from the first provider that succeeds
    #[instrument(skip_all, fields(request_id = %request.id()))]
    pub async fn run(
        &self,
        request: &CompletionRequest,
        ctx: &CallContext,
    ) -> Result<CompletionResponse, OrchestrationError> {
        self.transition(FallbackState::Selecting);
        let snapshot = self.registry.snapshot();
        let (candidates, mut failures) = self.candidates(&snapshot, request);
        debug!(
            registry_version = snapshot.version(),
            candidates = candidates.len(),
            skipped = failures.len(),
            "providers selected"
        );

        for entry in candidates {
            if let Some(stop) = ctx.interruption() {
                return Err(stop);
            }

            let name = entry.name();
            self.transition(FallbackState::Attempting {
                provider: name.to_string(),
            });
            let started = Instant::now();
            let outcome = self
                .retry
                .execute(name, ctx, |attempt| self.attempt_once(&entry, request, attempt))
                .await;

            match outcome.result {
                Ok(raw) => {
                    let response = ResponseNormalizer::normalize(
                        raw,
                        &entry.descriptor,
                        started.elapsed(),
                        outcome.attempts,
                    );
                    self.health.record_usage(name, response.tokens_used());
                    if !failures.is_empty() {
                        info!(
                            provider = %name,
                            failed_providers = failures.len(),
                            "served by fallback provider"
                        );
                    }
                    self.transition(FallbackState::Succeeded {
                        provider: name.to_string(),
                    });
                    return Ok(response);
                }
                Err(error) => {
                    if let Some(stop) = ctx.interruption() {
                        debug!(provider = %name, "call interrupted, not trying further providers");
                        return Err(stop);
                    }
                    warn!(
                        provider = %name,
                        kind = %error.kind(),
                        attempts = outcome.attempts,
                        error = %error,
                        "provider failed, falling back"
                    );
                    failures.push(ProviderFailure::from_error(name, &error, outcome.attempts));
                    self.transition(FallbackState::NextProvider {
                        failed: name.to_string(),
                    });
                }
            }
        }

        self.transition(FallbackState::Exhausted);
        let error = OrchestrationError::exhausted(failures);
        warn!(error = %error, "no provider could serve the request");
        Err(error)
    }

    #[instrument(skip_all, level = "debug", fields(provider = %entry.name(), attempt = attempt))]
    async fn attempt_once(
        &self,
        entry: &RegisteredProvider,
        request: &CompletionRequest,
        attempt: u32,
    ) -> Result<RawCompletion, OrchestrationError> {
        let call = entry.adapter.complete(request, entry.credentials());
        match tokio::time::timeout(self.attempt_timeout, call).await {
            Ok(Ok(raw)) => Ok(raw),
            Ok(Err(raw)) => Err(ErrorClassifier::classify(&raw, entry.name())),
            Err(_) => Err(ErrorClassifier::classify(
                &RawProviderError::Timeout(self.attempt_timeout),
                entry.name(),
            )),
        }
    }

    fn transition(&self, state: FallbackState) {
        debug!(state = %state, "fallback state");
    }
}

impl fmt::Debug for FallbackOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackOrchestrator")
            .field("registry_version", &self.registry.version())
            .field("retry", self.retry.config())
            .field("attempt_timeout", &self.attempt_timeout)
            .finish()
    }
}

use super::types::{HealthConfig, HealthEvent, HealthStatus, ProviderHealth};
use crate::error::ErrorKind;
use crate::events::EventBus;
use crate::llm::classifier::ErrorClassifier;
use crate::llm::registry::ProviderRegistry;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const LATENCY_SMOOTHING: f64 = 0.3;

#[derive(Debug)]
struct ProviderState {
    health: ProviderHealth,
    unhealthy_since: Option<Instant>,
}

impl ProviderState {
    fn new(name: &str) -> Self {
        Self {
            health: ProviderHealth::new(name),
            unhealthy_since: None,
        }
    }
}

/// Process-wide provider health.
///
/// Each provider's state sits behind its own mutex, so outcomes for one
/// provider are applied in order without blocking the others.
#[derive(Debug)]
pub struct HealthMonitor {
    config: HealthConfig,
    providers: DashMap<String, Arc<Mutex<ProviderState>>>,
    events: EventBus<HealthEvent>,
}

impl HealthMonitor {
    pub fn new(config: HealthConfig) -> Self {
        Self {
            config,
            providers: DashMap::new(),
            events: EventBus::default(),
        }
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    /// Start tracking a provider so it appears in snapshots before its first call
    pub fn register(&self, name: &str) {
        self.state(name);
    }

    fn state(&self, name: &str) -> Arc<Mutex<ProviderState>> {
        if let Some(existing) = self.providers.get(name) {
            return Arc::clone(existing.value());
        }
        self.providers
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ProviderState::new(name))))
            .value()
            .clone()
    }

    /// Apply the outcome of one attempt.
    pub fn record_outcome(
        &self,
        name: &str,
        success: bool,
        latency_ms: u64,
        error_kind: Option<ErrorKind>,
    ) {
        let state = self.state(name);
        let event = {
            let mut guard = state.lock();
            let ProviderState {
                health,
                unhealthy_since,
            } = &mut *guard;
            let previous = health.status;
            let now = Utc::now();

            health.total_requests += 1;
            health.last_latency_ms = Some(latency_ms);
            health.avg_latency_ms = Some(match health.avg_latency_ms {
                None => latency_ms,
                Some(avg) => (LATENCY_SMOOTHING * latency_ms as f64
                    + (1.0 - LATENCY_SMOOTHING) * avg as f64)
                    .round() as u64,
            });

            if success {
                health.consecutive_failures = 0;
                health.last_success_at = Some(now);
                health.status = HealthStatus::Healthy;
                *unhealthy_since = None;
            } else {
                health.consecutive_failures += 1;
                health.total_failures += 1;
                health.last_failure_at = Some(now);
                health.last_error_kind = error_kind;

                let failures = health.consecutive_failures;
                let unhealthy_at = self.config.degraded_after + self.config.unhealthy_after;
                if failures >= unhealthy_at {
                    health.status = HealthStatus::Unhealthy;
                    *unhealthy_since = Some(Instant::now());
                } else if failures >= self.config.degraded_after {
                    health.status = HealthStatus::Degraded;
                }
            }

            (previous != health.status).then(|| HealthEvent {
                provider: name.to_string(),
                from: previous,
                to: health.status,
                consecutive_failures: health.consecutive_failures,
                at: now,
            })
        };

        if let Some(event) = event {
            self.announce(event);
        }
    }

    /// Count tokens delivered by a successful call
    pub fn record_usage(&self, name: &str, tokens: u32) {
        let state = self.state(name);
        state.lock().health.tokens_served += u64::from(tokens);
    }

    /// Current health; unknown providers read as healthy with no history
    pub fn status_of(&self, name: &str) -> ProviderHealth {
        match self.providers.get(name) {
            Some(state) => state.lock().health.clone(),
            None => ProviderHealth::new(name),
        }
    }

    /// Whether a provider may be attempted now.
    ///
    /// An unhealthy provider whose cooldown has elapsed is moved to degraded
    /// here and becomes eligible again.
    pub fn is_eligible(&self, name: &str) -> bool {
        let Some(state) = self.providers.get(name).map(|s| Arc::clone(s.value())) else {
            return true;
        };

        let event = {
            let mut state = state.lock();
            if state.health.status != HealthStatus::Unhealthy {
                return true;
            }
            let cooled = state
                .unhealthy_since
                .is_none_or(|since| since.elapsed() >= self.config.cooldown);
            if !cooled {
                return false;
            }
            state.health.status = HealthStatus::Degraded;
            state.unhealthy_since = None;
            HealthEvent {
                provider: name.to_string(),
                from: HealthStatus::Unhealthy,
                to: HealthStatus::Degraded,
                consecutive_failures: state.health.consecutive_failures,
                at: Utc::now(),
            }
        };

        self.announce(event);
        true
    }

    /// Health of every known provider, keyed by name
    pub fn snapshot(&self) -> BTreeMap<String, ProviderHealth> {
        self.providers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().lock().health.clone()))
            .collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HealthEvent> {
        self.events.subscribe()
    }

    fn announce(&self, event: HealthEvent) {
        match event.to {
            HealthStatus::Healthy => info!(
                provider = %event.provider,
                from = %event.from,
                "provider recovered"
            ),
            HealthStatus::Degraded => warn!(
                provider = %event.provider,
                from = %event.from,
                consecutive_failures = event.consecutive_failures,
                "provider degraded"
            ),
            HealthStatus::Unhealthy => warn!(
                provider = %event.provider,
                consecutive_failures = event.consecutive_failures,
                cooldown = ?self.config.cooldown,
                "provider marked unhealthy"
            ),
        }
        self.events.publish(event);
    }

    /// Probe every registered provider once and record the outcomes.
    ///
    /// Returns whether each probe succeeded.
    pub async fn probe_all(
        &self,
        registry: &ProviderRegistry,
        timeout: Duration,
    ) -> BTreeMap<String, bool> {
        let snapshot = registry.snapshot();
        let mut results = BTreeMap::new();

        for entry in snapshot.entries() {
            let name = entry.name();
            let started = Instant::now();
            let outcome = tokio::time::timeout(timeout, entry.adapter.probe(entry.credentials())).await;
            let latency_ms = started.elapsed().as_millis() as u64;

            let ok = match outcome {
                Ok(Ok(())) => {
                    self.record_outcome(name, true, latency_ms, None);
                    true
                }
                Ok(Err(raw)) => {
                    let error = ErrorClassifier::classify(&raw, name);
                    debug!(provider = %name, error = %error, "probe failed");
                    self.record_outcome(name, false, latency_ms, Some(error.kind()));
                    false
                }
                Err(_) => {
                    debug!(provider = %name, ?timeout, "probe timed out");
                    self.record_outcome(name, false, latency_ms, Some(ErrorKind::Timeout));
                    false
                }
            };
            results.insert(name.to_string(), ok);
        }

        results
    }

    /// Run `probe_all` every `interval` until `cancel` fires
    pub fn spawn_prober(
        self: Arc<Self>,
        registry: Arc<ProviderRegistry>,
        interval: Duration,
        probe_timeout: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("health prober stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let results = self.probe_all(&registry, probe_timeout).await;
                        let healthy = results.values().filter(|ok| **ok).count();
                        debug!(healthy, total = results.len(), "health probe round finished");
                    }
                }
            }
        })
    }
}

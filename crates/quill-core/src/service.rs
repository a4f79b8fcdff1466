//! The engine's inbound API
//!
//! `AiService` ties the pieces together for one call:
//! normalize, filter inbound, answer from the response cache when enabled,
//! orchestrate with retry and fallback, normalize the response, filter outbound.

use crate::cache::{CacheKey, ResponseCache};
use crate::config::{QuillConfig, SecretStore};
use crate::error::{OrchestrationError, QuillResult};
use crate::filter::ContentFilter;
use crate::health::{HealthEvent, HealthMonitor, ProviderHealth};
use crate::llm::messages::{ConversationContext, Message};
use crate::llm::normalizer::RequestNormalizer;
use crate::llm::orchestrator::FallbackOrchestrator;
use crate::llm::provider::ProviderSummary;
use crate::llm::registry::{ProviderRegistry, RegisteredProvider};
use crate::llm::request::{CompletionOptions, CompletionRequest, RawRequest};
use crate::llm::response::CompletionResponse;
use crate::recovery::CallContext;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Completion and chat calls with retry, provider fallback and health tracking
#[derive(Debug)]
pub struct AiService {
    config: QuillConfig,
    normalizer: RequestNormalizer,
    filter: ContentFilter,
    registry: Arc<ProviderRegistry>,
    health: Arc<HealthMonitor>,
    orchestrator: FallbackOrchestrator,
    cache: Option<ResponseCache>,
}

impl AiService {
    /// Create a service over an existing registry
    pub fn new(config: QuillConfig, registry: Arc<ProviderRegistry>) -> QuillResult<Self> {
        let filter = ContentFilter::from_config(config.enable_content_filtering, &config.filter)?;
        let health = Arc::new(HealthMonitor::new(config.health.clone()));
        for provider in registry.ordered() {
            health.register(&provider.name);
        }

        let orchestrator = FallbackOrchestrator::new(
            Arc::clone(&registry),
            Arc::clone(&health),
            config.retry.clone(),
            config.timeouts.attempt,
        );

        info!(
            providers = registry.snapshot().len(),
            content_filtering = filter.is_enabled(),
            response_cache = config.cache.enabled,
            "ai service ready"
        );

        Ok(Self {
            normalizer: RequestNormalizer::new(config.request_limits()),
            filter,
            registry,
            health,
            orchestrator,
            cache: ResponseCache::from_config(&config.cache),
            config,
        })
    }

    /// Build adapters for `config.providers`, resolving credentials through `secrets`
    pub fn from_config(config: QuillConfig, secrets: &dyn SecretStore) -> QuillResult<Self> {
        let registry = Arc::new(ProviderRegistry::from_config(&config, secrets)?);
        Self::new(config, registry)
    }

    pub fn config(&self) -> &QuillConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn health_monitor(&self) -> &Arc<HealthMonitor> {
        &self.health
    }

    /// Complete a message list
    pub async fn complete(
        &self,
        messages: Vec<Message>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, OrchestrationError> {
        self.complete_with_cancel(messages, options, CancellationToken::new())
            .await
    }

    /// Complete a message list; cancelling `cancel` ends the call with a timeout error
    pub async fn complete_with_cancel(
        &self,
        messages: Vec<Message>,
        options: CompletionOptions,
        cancel: CancellationToken,
    ) -> Result<CompletionResponse, OrchestrationError> {
        self.complete_raw(RawRequest::new(messages).with_options(options), cancel)
            .await
    }

    /// Complete a request as received from a caller
    pub async fn complete_raw(
        &self,
        raw: RawRequest,
        cancel: CancellationToken,
    ) -> Result<CompletionResponse, OrchestrationError> {
        let request = self.normalizer.normalize(raw)?;
        self.execute(request, cancel).await
    }

    /// Send `message` after the caller's conversation so far.
    ///
    /// The context is not modified; callers append the exchange themselves.
    pub async fn chat(
        &self,
        message: &str,
        context: &ConversationContext,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, OrchestrationError> {
        self.chat_with_cancel(message, context, options, CancellationToken::new())
            .await
    }

    pub async fn chat_with_cancel(
        &self,
        message: &str,
        context: &ConversationContext,
        options: CompletionOptions,
        cancel: CancellationToken,
    ) -> Result<CompletionResponse, OrchestrationError> {
        let request = self.normalizer.build_chat(message, context, options)?;
        self.execute(request, cancel).await
    }

    #[instrument(skip_all, fields(request_id = %request.id()))]
    async fn execute(
        &self,
        request: CompletionRequest,
        cancel: CancellationToken,
    ) -> Result<CompletionResponse, OrchestrationError> {
        self.filter.check_request(&request)?;

        let cached = self
            .cache
            .as_ref()
            .map(|cache| (cache, CacheKey::for_request(&request)));
        if let Some(hit) = cached.as_ref().and_then(|(cache, key)| cache.get(key)) {
            debug!(provider = hit.provider(), "served from response cache");
            return Ok(hit);
        }

        let ctx = CallContext::new(self.config.timeouts.request).with_cancel(cancel);
        let response = self.orchestrator.run(&request, &ctx).await?;

        let filtered = self.filter.filter_outbound(response.content());
        if filtered.redacted {
            debug!(provider = response.provider(), "response content redacted");
        }
        let response = response.into_filtered(filtered.text, filtered.redacted);
        if let Some((cache, key)) = cached {
            cache.insert(key, response.clone());
        }
        Ok(response)
    }

    /// Drop every cached response, e.g. after switching providers
    pub fn clear_response_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    /// Health of every registered provider
    pub fn get_provider_health(&self) -> BTreeMap<String, ProviderHealth> {
        self.health.snapshot()
    }

    /// Name, priority and capabilities of each provider, in priority order
    pub fn list_providers(&self) -> Vec<ProviderSummary> {
        self.registry.summaries()
    }

    /// Swap the provider set, e.g. after rotating credentials.
    ///
    /// Calls already in flight finish against the previous set. Health
    /// history is kept for providers that remain; cached responses are not.
    pub fn reload_providers(&self, entries: Vec<RegisteredProvider>) -> QuillResult<u64> {
        let names: Vec<String> = entries.iter().map(|e| e.name().to_string()).collect();
        let version = self.registry.reload(entries)?;
        for name in &names {
            self.health.register(name);
        }
        self.clear_response_cache();
        Ok(version)
    }

    /// Rebuild providers from the current configuration and `secrets`
    pub fn reload_from_secrets(&self, secrets: &dyn SecretStore) -> QuillResult<u64> {
        let entries = ProviderRegistry::entries_from_config(&self.config, secrets)?;
        self.reload_providers(entries)
    }

    /// Health transitions from now on
    pub fn subscribe_health(&self) -> broadcast::Receiver<HealthEvent> {
        self.health.subscribe()
    }

    /// Start background probes when `[health] probe_interval` is set
    pub fn start_health_probes(&self, cancel: CancellationToken) -> Option<JoinHandle<()>> {
        let interval = self.config.health.probe_interval?;
        info!(interval = ?interval, "starting background health probes");
        Some(Arc::clone(&self.health).spawn_prober(
            Arc::clone(&self.registry),
            interval,
            self.config.timeouts.attempt,
            cancel,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::health::HealthStatus;
    use crate::llm::provider::{Credentials, MockProviderAdapter, ProviderDescriptor};
    use crate::llm::response::{FinishReason, RawCompletion};

    fn reply(content: &str) -> RawCompletion {
        RawCompletion {
            content: content.to_string(),
            model: Some("test-model".to_string()),
            prompt_tokens: 3,
            completion_tokens: 4,
            finish_reason: Some("stop".to_string()),
        }
    }

    fn service_with(adapter: MockProviderAdapter, config: QuillConfig) -> AiService {
        let registry = ProviderRegistry::new(vec![RegisteredProvider::new(
            ProviderDescriptor::new("claude", 0),
            Arc::new(adapter),
            Credentials::new("sk-ant-test"),
        )])
        .unwrap();
        AiService::new(config, Arc::new(registry)).unwrap()
    }

    #[tokio::test]
    async fn completes_through_the_pipeline() {
        let mut adapter = MockProviderAdapter::new();
        adapter
            .expect_complete()
            .withf(|request, credentials| {
                request.max_tokens() == 800 && credentials.expose() == Some("sk-ant-test")
            })
            .times(1)
            .returning(|_, _| Ok(reply("Autumn moonlight")));
        let service = service_with(adapter, QuillConfig::default());

        let response = service
            .complete(vec![Message::user("Write a haiku")], CompletionOptions::default())
            .await
            .unwrap();

        assert_eq!(response.content(), "Autumn moonlight");
        assert_eq!(response.provider(), "claude");
        assert_eq!(response.tokens_used(), 7);
        assert_eq!(service.get_provider_health()["claude"].tokens_served, 7);
    }

    #[tokio::test]
    async fn identical_requests_are_answered_from_the_cache() {
        let mut adapter = MockProviderAdapter::new();
        adapter
            .expect_complete()
            .times(2)
            .returning(|request, _| Ok(reply(&format!("echo: {}", request.messages()[0].content))));
        let mut config = QuillConfig::default();
        config.cache.enabled = true;
        let service = service_with(adapter, config);
        let ask = |text: &str| {
            service.complete(vec![Message::user(text)], CompletionOptions::default())
        };

        let first = ask("Name the cat").await.unwrap();
        let second = ask("Name the cat").await.unwrap();
        let other = ask("Name the dog").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(other.content(), "echo: Name the dog");
        assert_eq!(service.get_provider_health()["claude"].total_requests, 2);

        service.clear_response_cache();
        assert!(service.cache.as_ref().is_some_and(ResponseCache::is_empty));
    }

    #[tokio::test]
    async fn invalid_requests_never_reach_a_provider() {
        let mut adapter = MockProviderAdapter::new();
        adapter.expect_complete().never();
        let service = service_with(adapter, QuillConfig::default());

        let empty = service
            .complete(Vec::new(), CompletionOptions::default())
            .await
            .unwrap_err();
        assert_eq!(empty.kind(), ErrorKind::Validation);

        let hot = service
            .complete(
                vec![Message::user("hi")],
                CompletionOptions::default().with_temperature(1.5),
            )
            .await
            .unwrap_err();
        assert_eq!(hot.kind(), ErrorKind::Validation);
        assert_eq!(service.get_provider_health()["claude"].total_requests, 0);
    }

    #[tokio::test]
    async fn sensitive_prompts_are_rejected_before_any_call() {
        let mut adapter = MockProviderAdapter::new();
        adapter.expect_complete().never();
        let service = service_with(adapter, QuillConfig::default());

        let error = service
            .complete(
                vec![Message::user("my ssn is 123-45-6789")],
                CompletionOptions::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Validation);
        assert!(!error.message().contains("6789"));
    }

    #[tokio::test]
    async fn sensitive_output_is_redacted() {
        let mut adapter = MockProviderAdapter::new();
        adapter
            .expect_complete()
            .returning(|_, _| Ok(reply("the password: correcthorse is stored")));
        let service = service_with(adapter, QuillConfig::default());

        let response = service
            .complete(vec![Message::user("hello")], CompletionOptions::default())
            .await
            .unwrap();
        assert!(!response.content().contains("correcthorse"));
        assert_eq!(response.finish_reason(), FinishReason::Filtered);
    }

    #[tokio::test]
    async fn filtering_can_be_disabled() {
        let mut adapter = MockProviderAdapter::new();
        adapter
            .expect_complete()
            .times(1)
            .returning(|_, _| Ok(reply("123-45-6789")));
        let config = QuillConfig {
            enable_content_filtering: false,
            ..QuillConfig::default()
        };
        let service = service_with(adapter, config);

        let response = service
            .complete(vec![Message::user("ssn 123-45-6789")], CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(response.content(), "123-45-6789");
        assert_eq!(response.finish_reason(), FinishReason::Stop);
    }

    #[tokio::test]
    async fn chat_sends_context_and_new_message() {
        let mut adapter = MockProviderAdapter::new();
        adapter
            .expect_complete()
            .withf(|request, _| {
                request.system_prompt().as_deref() == Some("Be brief.")
                    && request.conversation().count() == 3
                    && request.messages().last().map(|m| m.content.as_str()) == Some("and now?")
            })
            .times(1)
            .returning(|_, _| Ok(reply("done")));
        let service = service_with(adapter, QuillConfig::default());

        let mut context = ConversationContext::new().with_system_prompt("Be brief.");
        context.push_exchange("hello", "hi");
        let response = service
            .chat("and now?", &context, CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(response.content(), "done");
        assert_eq!(context.history.len(), 2);
    }

    #[tokio::test]
    async fn lists_providers_without_credentials() {
        let service = service_with(MockProviderAdapter::new(), QuillConfig::default());
        let providers = service.list_providers();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].name, "claude");
        let printed = serde_json::to_string(&providers).unwrap();
        assert!(!printed.contains("sk-ant"));
    }

    #[tokio::test]
    async fn reload_registers_new_providers_and_notifies() {
        let service = service_with(MockProviderAdapter::new(), QuillConfig::default());
        let mut events = service.subscribe_health();

        let version = service
            .reload_providers(vec![RegisteredProvider::new(
                ProviderDescriptor::new("openai", 0),
                Arc::new(MockProviderAdapter::new()),
                Credentials::new("sk-rotated"),
            )])
            .unwrap();
        assert_eq!(version, 2);
        assert_eq!(service.list_providers()[0].name, "openai");
        assert!(service.get_provider_health().contains_key("openai"));

        for _ in 0..3 {
            service
                .health_monitor()
                .record_outcome("openai", false, 5, Some(ErrorKind::Network));
        }
        let event = events.recv().await.unwrap();
        assert_eq!(event.provider, "openai");
        assert_eq!(event.to, HealthStatus::Degraded);
    }

    #[tokio::test]
    async fn probes_only_start_when_configured() {
        let service = service_with(MockProviderAdapter::new(), QuillConfig::default());
        assert!(service.start_health_probes(CancellationToken::new()).is_none());
    }
}

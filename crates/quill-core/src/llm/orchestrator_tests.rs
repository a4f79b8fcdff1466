//! Tests for provider fallback

use super::messages::Message;
use super::normalizer::RequestNormalizer;
use super::orchestrator::FallbackOrchestrator;
use super::provider::{
    Capability, Credentials, MockProviderAdapter, ProviderAdapter, ProviderDescriptor,
    RawProviderError,
};
use super::registry::{ProviderRegistry, RegisteredProvider};
use super::request::{CompletionOptions, CompletionRequest, RawRequest};
use super::response::{FinishReason, RawCompletion};
use crate::error::ErrorKind;
use crate::health::{HealthConfig, HealthMonitor, HealthStatus};
use crate::recovery::{CallContext, RetryConfig};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Clone)]
enum Step {
    Reply(&'static str),
    Fail(RawProviderError),
    Hang,
}

/// Plays back `steps`, then repeats `then` forever
struct ScriptedAdapter {
    steps: Mutex<VecDeque<Step>>,
    then: Step,
    calls: Arc<AtomicU32>,
}

impl ScriptedAdapter {
    fn new(steps: Vec<Step>, then: Step) -> (Self, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let adapter = Self {
            steps: Mutex::new(steps.into()),
            then,
            calls: Arc::clone(&calls),
        };
        (adapter, calls)
    }

    fn always(step: Step) -> (Self, Arc<AtomicU32>) {
        Self::new(Vec::new(), step)
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    async fn complete(
        &self,
        _request: &CompletionRequest,
        _credentials: &Credentials,
    ) -> Result<RawCompletion, RawProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().pop_front().unwrap_or_else(|| self.then.clone());
        match step {
            Step::Reply(content) => Ok(RawCompletion {
                content: content.to_string(),
                model: Some("scripted-1".to_string()),
                prompt_tokens: 10,
                completion_tokens: 5,
                finish_reason: Some("stop".to_string()),
            }),
            Step::Fail(error) => Err(error),
            Step::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(RawProviderError::Transport("hung".to_string()))
            }
        }
    }
}

fn server_error() -> Step {
    Step::Fail(RawProviderError::Http {
        status: 503,
        body: r#"{"error":"overloaded"}"#.to_string(),
        retry_after: None,
    })
}

fn entry(name: &str, priority: u32, adapter: impl ProviderAdapter + 'static) -> RegisteredProvider {
    RegisteredProvider::new(
        ProviderDescriptor::new(name, priority).with_models([format!("{}-model", name)]),
        Arc::new(adapter),
        Credentials::new("test-key"),
    )
}

fn orchestrator(entries: Vec<RegisteredProvider>) -> (FallbackOrchestrator, Arc<HealthMonitor>) {
    let registry = Arc::new(ProviderRegistry::new(entries).unwrap());
    let health = Arc::new(HealthMonitor::new(HealthConfig::default()));
    let orchestrator = FallbackOrchestrator::new(
        registry,
        Arc::clone(&health),
        RetryConfig::default(),
        Duration::from_secs(20),
    );
    (orchestrator, health)
}

fn request(options: CompletionOptions) -> CompletionRequest {
    RequestNormalizer::default()
        .normalize(RawRequest::new(vec![Message::user("Write a haiku")]).with_options(options))
        .unwrap()
}

fn ctx() -> CallContext {
    CallContext::new(Duration::from_secs(60))
}

#[tokio::test(start_paused = true)]
async fn first_healthy_provider_serves() {
    let (claude, _) = ScriptedAdapter::always(Step::Reply("waves fold"));
    let mut openai = MockProviderAdapter::new();
    openai.expect_complete().never();

    let (orchestrator, health) = orchestrator(vec![entry("claude", 0, claude), entry("openai", 1, openai)]);
    let response = orchestrator.run(&request(CompletionOptions::default()), &ctx()).await.unwrap();

    assert_eq!(response.content(), "waves fold");
    assert_eq!(response.provider(), "claude");
    assert_eq!(response.model(), "scripted-1");
    assert_eq!(response.tokens_used(), 15);
    assert_eq!(response.attempts(), 1);
    assert_eq!(response.finish_reason(), FinishReason::Stop);
    assert_eq!(health.status_of("claude").tokens_served, 15);
}

#[tokio::test(start_paused = true)]
async fn degraded_provider_is_tried_after_healthy_ones() {
    let (claude, claude_calls) = ScriptedAdapter::always(Step::Reply("from claude"));
    let (openai, openai_calls) = ScriptedAdapter::always(server_error());
    let (local, local_calls) = ScriptedAdapter::always(Step::Reply("from local"));

    let (orchestrator, health) = orchestrator(vec![
        entry("claude", 0, claude),
        entry("openai", 1, openai),
        entry("local", 2, local),
    ]);
    for _ in 0..3 {
        health.record_outcome("claude", false, 100, Some(ErrorKind::ServerError));
    }
    assert_eq!(health.status_of("claude").status, HealthStatus::Degraded);

    let response = orchestrator.run(&request(CompletionOptions::default()), &ctx()).await.unwrap();

    assert_eq!(response.provider(), "local");
    assert_eq!(openai_calls.load(Ordering::SeqCst), 3);
    assert_eq!(local_calls.load(Ordering::SeqCst), 1);
    assert_eq!(claude_calls.load(Ordering::SeqCst), 0);
    assert_eq!(health.status_of("openai").status, HealthStatus::Degraded);
}

#[tokio::test(start_paused = true)]
async fn auth_failure_falls_back_without_retrying() {
    let (claude, claude_calls) = ScriptedAdapter::always(Step::Fail(RawProviderError::Http {
        status: 401,
        body: r#"{"error":{"message":"invalid x-api-key"}}"#.to_string(),
        retry_after: None,
    }));
    let (openai, _) = ScriptedAdapter::always(Step::Reply("ok"));

    let (orchestrator, _) = orchestrator(vec![entry("claude", 0, claude), entry("openai", 1, openai)]);
    let started = Instant::now();
    let response = orchestrator.run(&request(CompletionOptions::default()), &ctx()).await.unwrap();

    assert_eq!(response.provider(), "openai");
    assert_eq!(claude_calls.load(Ordering::SeqCst), 1);
    // no backoff was needed
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn unhealthy_provider_is_skipped_and_reported() {
    let mut claude = MockProviderAdapter::new();
    claude.expect_complete().never();
    let (openai, _) = ScriptedAdapter::always(Step::Fail(RawProviderError::Http {
        status: 400,
        body: "bad".to_string(),
        retry_after: None,
    }));

    let (orchestrator, health) = orchestrator(vec![entry("claude", 0, claude), entry("openai", 1, openai)]);
    for _ in 0..5 {
        health.record_outcome("claude", false, 100, Some(ErrorKind::Network));
    }

    let error = orchestrator
        .run(&request(CompletionOptions::default()), &ctx())
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::AllProvidersExhausted);
    let failures = error.failures();
    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0].provider, "claude");
    assert_eq!(failures[0].kind, ErrorKind::Network);
    assert_eq!(failures[0].attempts, 0);
    assert_eq!(failures[1].provider, "openai");
    assert_eq!(failures[1].kind, ErrorKind::ClientError);
    assert_eq!(failures[1].status_code, Some(400));
    assert!(error.message().contains("claude (network)"));
}

#[tokio::test(start_paused = true)]
async fn model_preference_moves_provider_to_front() {
    let (claude, claude_calls) = ScriptedAdapter::always(Step::Reply("claude"));
    let (local, _) = ScriptedAdapter::always(Step::Reply("local"));
    let (orchestrator, _) = orchestrator(vec![entry("claude", 0, claude), entry("local", 2, local)]);

    let by_name = orchestrator
        .run(&request(CompletionOptions::default().with_model("local")), &ctx())
        .await
        .unwrap();
    assert_eq!(by_name.provider(), "local");

    let by_model = orchestrator
        .run(&request(CompletionOptions::default().with_model("local-model")), &ctx())
        .await
        .unwrap();
    assert_eq!(by_model.provider(), "local");
    assert_eq!(claude_calls.load(Ordering::SeqCst), 0);

    // unknown preferences leave the order alone
    let unknown = orchestrator
        .run(&request(CompletionOptions::default().with_model("gpt-9")), &ctx())
        .await
        .unwrap();
    assert_eq!(unknown.provider(), "claude");
}

#[tokio::test(start_paused = true)]
async fn preference_for_cooling_provider_is_ignored() {
    let mut local = MockProviderAdapter::new();
    local.expect_complete().never();
    let (claude, _) = ScriptedAdapter::always(Step::Reply("claude"));
    let (orchestrator, health) = orchestrator(vec![entry("claude", 0, claude), entry("local", 1, local)]);
    for _ in 0..5 {
        health.record_outcome("local", false, 100, Some(ErrorKind::Network));
    }

    let response = orchestrator
        .run(&request(CompletionOptions::default().with_model("local")), &ctx())
        .await
        .unwrap();
    assert_eq!(response.provider(), "claude");
}

#[tokio::test(start_paused = true)]
async fn chat_requests_skip_completion_only_providers() {
    let mut legacy = MockProviderAdapter::new();
    legacy.expect_complete().never();
    let (openai, _) = ScriptedAdapter::always(Step::Reply("chat reply"));

    let legacy = RegisteredProvider::new(
        ProviderDescriptor::new("legacy", 0).with_capabilities([Capability::Completion]),
        Arc::new(legacy),
        Credentials::none(),
    );
    let (orchestrator, _) = orchestrator(vec![legacy, entry("openai", 1, openai)]);

    let chat = RequestNormalizer::default()
        .normalize(RawRequest::new(vec![
            Message::user("hi"),
            Message::assistant("hello"),
            Message::user("write a haiku"),
        ]))
        .unwrap();
    assert_eq!(chat.required_capability(), Capability::Chat);

    let response = orchestrator.run(&chat, &ctx()).await.unwrap();
    assert_eq!(response.provider(), "openai");
}

#[tokio::test(start_paused = true)]
async fn hung_attempts_time_out_and_fall_back() {
    let (claude, claude_calls) = ScriptedAdapter::always(Step::Hang);
    let (openai, _) = ScriptedAdapter::always(Step::Reply("ok"));
    let (orchestrator, health) = orchestrator(vec![entry("claude", 0, claude), entry("openai", 1, openai)]);

    let started = Instant::now();
    let ctx = CallContext::new(Duration::from_secs(120));
    let response = orchestrator.run(&request(CompletionOptions::default()), &ctx).await.unwrap();

    assert_eq!(response.provider(), "openai");
    assert_eq!(claude_calls.load(Ordering::SeqCst), 3);
    // three 20s attempts plus 0.5s and 1s of backoff
    assert_eq!(started.elapsed(), Duration::from_millis(61_500));
    assert_eq!(
        health.status_of("claude").last_error_kind,
        Some(ErrorKind::Timeout)
    );
}

#[tokio::test(start_paused = true)]
async fn cancelled_call_stops_before_any_provider() {
    let mut claude = MockProviderAdapter::new();
    claude.expect_complete().never();
    let (orchestrator, _) = orchestrator(vec![entry("claude", 0, claude)]);

    let ctx = ctx();
    ctx.cancel_token().cancel();
    let error = orchestrator
        .run(&request(CompletionOptions::default()), &ctx)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Timeout);
    assert!(!error.is_retryable());
}

#[tokio::test(start_paused = true)]
async fn no_providers_means_exhausted() {
    let (orchestrator, _) = orchestrator(Vec::new());
    let error = orchestrator
        .run(&request(CompletionOptions::default()), &ctx())
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::AllProvidersExhausted);
    assert!(error.failures().is_empty());
}

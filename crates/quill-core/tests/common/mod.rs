//! Shared helpers for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use quill_core::{
    AiService, CompletionRequest, Credentials, ProviderAdapter, ProviderDescriptor,
    ProviderRegistry, QuillConfig, RawCompletion, RawProviderError, RegisteredProvider,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

#[derive(Clone, Debug)]
pub enum Step {
    Reply(&'static str),
    Fail(RawProviderError),
    Hang,
}

pub fn server_error() -> Step {
    Step::Fail(RawProviderError::Http {
        status: 503,
        body: r#"{"error":{"type":"overloaded_error"}}"#.to_string(),
        retry_after: None,
    })
}

pub fn rate_limited(retry_after: Duration) -> Step {
    Step::Fail(RawProviderError::Http {
        status: 429,
        body: "too many requests".to_string(),
        retry_after: Some(retry_after),
    })
}

/// 429 without a Retry-After hint
pub fn throttled() -> Step {
    Step::Fail(RawProviderError::Http {
        status: 429,
        body: r#"{"error":{"type":"rate_limit_error"}}"#.to_string(),
        retry_after: None,
    })
}

pub fn refused() -> Step {
    Step::Fail(RawProviderError::Connect("connection refused".to_string()))
}

/// Plays back a script, then repeats the last step
pub struct ScriptedAdapter {
    steps: Mutex<VecDeque<Step>>,
    then: Step,
    calls: AtomicU32,
    max_tokens_seen: Mutex<Vec<u32>>,
}

impl ScriptedAdapter {
    pub fn new(steps: Vec<Step>, then: Step) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            then,
            calls: AtomicU32::new(0),
            max_tokens_seen: Mutex::new(Vec::new()),
        })
    }

    pub fn always(step: Step) -> Arc<Self> {
        Self::new(Vec::new(), step)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// `max_tokens` of every request received, in order
    pub fn max_tokens_seen(&self) -> Vec<u32> {
        self.max_tokens_seen.lock().clone()
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    async fn complete(
        &self,
        request: &CompletionRequest,
        _credentials: &Credentials,
    ) -> Result<RawCompletion, RawProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.max_tokens_seen.lock().push(request.max_tokens());
        let step = self
            .steps
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.then.clone());
        match step {
            Step::Reply(content) => Ok(reply(content)),
            Step::Fail(error) => Err(error),
            Step::Hang => {
                tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
                Err(RawProviderError::Transport("never answered".to_string()))
            }
        }
    }
}

pub fn reply(content: &str) -> RawCompletion {
    RawCompletion {
        content: content.to_string(),
        model: Some("scripted-model".to_string()),
        prompt_tokens: 12,
        completion_tokens: 17,
        finish_reason: Some("stop".to_string()),
    }
}

pub fn entry(name: &str, priority: u32, adapter: Arc<dyn ProviderAdapter>) -> RegisteredProvider {
    RegisteredProvider::new(
        ProviderDescriptor::new(name, priority),
        adapter,
        Credentials::new(format!("{}-secret", name)),
    )
}

pub fn service(config: QuillConfig, entries: Vec<RegisteredProvider>) -> AiService {
    let registry = ProviderRegistry::new(entries).expect("unique provider names");
    AiService::new(config, Arc::new(registry)).expect("valid service config")
}

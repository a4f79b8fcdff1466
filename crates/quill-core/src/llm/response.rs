//! Completion response types and normalization

use super::provider::ProviderDescriptor;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Provider payload after wire decoding, before normalization
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCompletion {
    pub content: String,
    /// Model reported by the provider, when it reports one
    pub model: Option<String>,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    /// Provider-specific stop reason string
    pub finish_reason: Option<String>,
}

/// Why generation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    Filtered,
    Error,
}

impl FinishReason {
    /// Map provider stop reasons onto the shared set
    pub fn from_provider(reason: Option<&str>) -> Self {
        match reason {
            None => FinishReason::Stop,
            Some("stop" | "end_turn" | "stop_sequence" | "eos") => FinishReason::Stop,
            Some("length" | "max_tokens" | "model_length") => FinishReason::Length,
            Some("content_filter" | "refusal" | "safety") => FinishReason::Filtered,
            Some(other) => {
                tracing::debug!(reason = other, "unrecognized finish reason, treating as stop");
                FinishReason::Stop
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FinishReason::Stop => "stop",
            FinishReason::Length => "length",
            FinishReason::Filtered => "filtered",
            FinishReason::Error => "error",
        }
    }
}

/// Uniform result of a successful call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionResponse {
    content: String,
    model: String,
    tokens_used: u32,
    finish_reason: FinishReason,
    provider: String,
    latency_ms: u64,
    attempts: u32,
}

impl CompletionResponse {
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Model that actually served the call
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn tokens_used(&self) -> u32 {
        self.tokens_used
    }

    pub fn finish_reason(&self) -> FinishReason {
        self.finish_reason
    }

    /// Provider that actually served the call
    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn latency_ms(&self) -> u64 {
        self.latency_ms
    }

    /// Attempts made against the serving provider
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Replace the content after outbound filtering, producing a new response
    pub(crate) fn into_filtered(self, content: String, redacted: bool) -> Self {
        let finish_reason = if redacted {
            FinishReason::Filtered
        } else {
            self.finish_reason
        };
        Self {
            content,
            finish_reason,
            ..self
        }
    }
}

/// Converts provider payloads into `CompletionResponse`
pub struct ResponseNormalizer;

impl ResponseNormalizer {
    pub fn normalize(
        raw: RawCompletion,
        provider: &ProviderDescriptor,
        latency: Duration,
        attempts: u32,
    ) -> CompletionResponse {
        let model = raw
            .model
            .filter(|m| !m.is_empty())
            .or_else(|| provider.default_model().map(str::to_string))
            .unwrap_or_else(|| provider.name.clone());

        CompletionResponse {
            finish_reason: FinishReason::from_provider(raw.finish_reason.as_deref()),
            content: raw.content,
            model,
            tokens_used: raw.prompt_tokens.saturating_add(raw.completion_tokens),
            provider: provider.name.clone(),
            latency_ms: latency.as_millis() as u64,
            attempts,
        }
    }
}

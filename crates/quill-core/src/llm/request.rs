//! Completion request types
//!
//! `RawRequest` is what callers hand in; `CompletionRequest` is the canonical,
//! validated form produced by `RequestNormalizer` and never modified afterwards.

use super::messages::{Message, Role};
use super::provider::Capability;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-call options bag
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOptions {
    /// Model id or provider name to prefer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

impl CompletionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = Some(stream);
        self
    }
}

/// Unvalidated request as supplied by a caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRequest {
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(flatten)]
    pub options: CompletionOptions,
}

impl RawRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            options: CompletionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }
}

/// Canonical completion request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    id: Uuid,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
    stream: bool,
}

impl CompletionRequest {
    /// Assemble an already validated request
    pub(crate) fn from_parts(
        messages: Vec<Message>,
        model: Option<String>,
        max_tokens: u32,
        temperature: f32,
        top_p: Option<f32>,
        stop: Vec<String>,
        stream: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            messages,
            model,
            max_tokens,
            temperature,
            top_p,
            stop,
            stream,
        }
    }

    /// Smallest request a provider will accept, used by health probes
    pub(crate) fn probe() -> Self {
        Self::from_parts(
            vec![Message::user("ping")],
            None,
            1,
            0.0,
            None,
            Vec::new(),
            false,
        )
    }

    /// Generated id used to correlate log lines of one call
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn top_p(&self) -> Option<f32> {
        self.top_p
    }

    pub fn stop(&self) -> &[String] {
        &self.stop
    }

    /// Streaming is a hint; responses are always delivered whole
    pub fn stream(&self) -> bool {
        self.stream
    }

    /// Concatenated system messages, if any
    pub fn system_prompt(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }

    /// Messages other than system instructions, in order
    pub fn conversation(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.role != Role::System)
    }

    /// Total prompt size in characters
    pub fn prompt_chars(&self) -> usize {
        self.messages.iter().map(Message::char_len).sum()
    }

    /// Multi-turn requests need chat support; a single prompt only completion
    pub fn required_capability(&self) -> Capability {
        if self.conversation().count() > 1 {
            Capability::Chat
        } else {
            Capability::Completion
        }
    }
}

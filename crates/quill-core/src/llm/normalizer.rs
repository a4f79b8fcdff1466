//! Request validation and canonicalization
//!
//! Turns caller input into a `CompletionRequest`, rejecting anything no
//! provider should ever see. Pure: no I/O and no provider knowledge.

use super::messages::{ConversationContext, Message, Role};
use super::request::{CompletionOptions, CompletionRequest, RawRequest};
use crate::error::OrchestrationError;

/// Limits and defaults applied to every request
#[derive(Debug, Clone, PartialEq)]
pub struct RequestLimits {
    pub max_prompt_chars: usize,
    pub default_max_tokens: u32,
    pub default_temperature: f32,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_prompt_chars: 32_000,
            default_max_tokens: 800,
            default_temperature: 0.7,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestNormalizer {
    limits: RequestLimits,
}

impl RequestNormalizer {
    pub fn new(limits: RequestLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &RequestLimits {
        &self.limits
    }

    /// Validate a raw request and fill in defaults
    pub fn normalize(&self, raw: RawRequest) -> Result<CompletionRequest, OrchestrationError> {
        let RawRequest { messages, options } = raw;

        if messages.is_empty() {
            return Err(OrchestrationError::validation("request contains no messages"));
        }
        if let Some(index) = messages.iter().position(|m| m.content.trim().is_empty()) {
            return Err(OrchestrationError::validation(format!(
                "message {} ({}) is empty",
                index, messages[index].role
            )));
        }
        if !messages.iter().any(|m| m.role != Role::System) {
            return Err(OrchestrationError::validation(
                "request contains only system messages",
            ));
        }

        let prompt_chars: usize = messages.iter().map(Message::char_len).sum();
        if prompt_chars > self.limits.max_prompt_chars {
            return Err(OrchestrationError::validation(format!(
                "prompt is {} characters; the limit is {}",
                prompt_chars, self.limits.max_prompt_chars
            )));
        }

        let max_tokens = match options.max_tokens {
            Some(0) => return Err(OrchestrationError::validation("max_tokens must be positive")),
            Some(n) => n,
            None => self.limits.default_max_tokens,
        };

        let temperature = options.temperature.unwrap_or(self.limits.default_temperature);
        if !temperature.is_finite() || !(0.0..=1.0).contains(&temperature) {
            return Err(OrchestrationError::validation(format!(
                "temperature must be between 0 and 1, got {}",
                temperature
            )));
        }

        if let Some(top_p) = options.top_p {
            if !top_p.is_finite() || top_p <= 0.0 || top_p > 1.0 {
                return Err(OrchestrationError::validation(format!(
                    "top_p must be in (0, 1], got {}",
                    top_p
                )));
            }
        }

        let stop: Vec<String> = options
            .stop
            .unwrap_or_default()
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect();

        let model = options
            .model
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        Ok(CompletionRequest::from_parts(
            messages,
            model,
            max_tokens,
            temperature,
            options.top_p,
            stop,
            options.stream.unwrap_or(false),
        ))
    }

    /// Build a chat request from caller-held context plus a new user message.
    ///
    /// When the history does not fit the prompt budget, the oldest turns are
    /// dropped first, along with any reply whose user turn was dropped. The
    /// system prompt and the new message are always kept.
    pub fn build_chat(
        &self,
        message: impl Into<String>,
        context: &ConversationContext,
        options: CompletionOptions,
    ) -> Result<CompletionRequest, OrchestrationError> {
        let user = Message::user(message);
        let system = context
            .system_prompt
            .as_ref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| Message::system(s.clone()));

        let fixed_chars = user.char_len() + system.as_ref().map_or(0, Message::char_len);
        let budget = self.limits.max_prompt_chars.saturating_sub(fixed_chars);

        let mut kept: Vec<&Message> = Vec::new();
        let mut used = 0usize;
        for turn in context.history.iter().rev() {
            let len = turn.char_len();
            if used + len > budget {
                break;
            }
            used += len;
            kept.push(turn);
        }
        // the kept history must open on a user turn
        while kept.last().is_some_and(|turn| turn.role != Role::User) {
            kept.pop();
        }
        let dropped = context.history.len() - kept.len();
        if dropped > 0 {
            tracing::debug!(dropped, kept = kept.len(), "trimmed conversation history to fit prompt budget");
        }

        let mut messages = Vec::with_capacity(kept.len() + 2);
        messages.extend(system);
        messages.extend(kept.into_iter().rev().cloned());
        messages.push(user);

        self.normalize(RawRequest { messages, options })
    }
}

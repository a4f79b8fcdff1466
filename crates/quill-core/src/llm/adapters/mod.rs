//! Provider adapters
//!
//! One adapter per wire protocol. Each owns a shared `reqwest::Client`, its
//! base URL and the models it serves.

pub mod anthropic;
pub mod error_utils;
pub mod ollama;
pub mod openai;

pub use anthropic::AnthropicAdapter;
pub use ollama::OllamaAdapter;
pub use openai::OpenAiAdapter;

use crate::config::{ProviderKind, ProviderSettings, TimeoutConfig};
use crate::error::QuillResult;
use crate::llm::messages::Message;
use crate::llm::provider::ProviderAdapter;
use crate::llm::request::CompletionRequest;
use reqwest::Client;
use serde_json::{Value, json};
use std::sync::Arc;

/// HTTP client shared by every adapter built from one configuration
pub fn build_http_client(timeouts: &TimeoutConfig) -> QuillResult<Client> {
    let client = Client::builder()
        .connect_timeout(timeouts.connect)
        .timeout(timeouts.attempt)
        .user_agent(concat!("quill/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Build the adapter matching a provider entry
pub fn build_adapter(
    settings: &ProviderSettings,
    http_client: Client,
    timeouts: &TimeoutConfig,
) -> Arc<dyn ProviderAdapter> {
    let models = ModelSelection::new(settings.effective_models());
    match settings.kind {
        ProviderKind::Anthropic => Arc::new(AnthropicAdapter::new(
            settings.base_url(),
            settings.api_version.clone(),
            models,
            http_client,
            timeouts.attempt,
        )),
        ProviderKind::OpenAi => Arc::new(OpenAiAdapter::new(
            settings.base_url(),
            models,
            http_client,
            timeouts.attempt,
        )),
        ProviderKind::Ollama => Arc::new(OllamaAdapter::new(
            settings.base_url(),
            models,
            http_client,
            timeouts.attempt,
        )),
    }
}

/// Models an adapter may send; the first is used unless the request names another
#[derive(Debug, Clone)]
pub struct ModelSelection {
    models: Vec<String>,
}

impl ModelSelection {
    /// `models` must not be empty; `ProviderSettings::effective_models` guarantees it
    pub fn new(models: Vec<String>) -> Self {
        Self { models }
    }

    pub fn pick<'a>(&'a self, request: &'a CompletionRequest) -> &'a str {
        match request.model() {
            Some(requested) if self.models.iter().any(|m| m == requested) => requested,
            _ => self.models.first().map(String::as_str).unwrap_or_default(),
        }
    }
}

/// `{role, content}` objects shared by the OpenAI and Ollama formats
pub(crate) fn role_content_messages<'a>(messages: impl Iterator<Item = &'a Message>) -> Value {
    Value::Array(
        messages
            .map(|m| json!({"role": m.role.as_str(), "content": m.content}))
            .collect(),
    )
}

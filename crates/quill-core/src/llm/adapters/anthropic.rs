//! Anthropic messages API adapter

use super::ModelSelection;
use super::error_utils::{from_reqwest, http_error};
use crate::llm::parsers::ResponseParser;
use crate::llm::provider::{Credentials, ProviderAdapter, RawProviderError};
use crate::llm::request::CompletionRequest;
use crate::llm::response::RawCompletion;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::instrument;

const DEFAULT_API_VERSION: &str = "2023-06-01";

/// Primary cloud provider
pub struct AnthropicAdapter {
    base_url: String,
    api_version: String,
    models: ModelSelection,
    http_client: Client,
    attempt_budget: Duration,
}

impl AnthropicAdapter {
    pub fn new(
        base_url: String,
        api_version: Option<String>,
        models: ModelSelection,
        http_client: Client,
        attempt_budget: Duration,
    ) -> Self {
        Self {
            base_url,
            api_version: api_version.unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            models,
            http_client,
            attempt_budget,
        }
    }

    /// Request body for `/v1/messages`; system text travels outside the message list
    pub fn request_body(&self, request: &CompletionRequest) -> Value {
        let messages: Vec<Value> = request
            .conversation()
            .map(|m| json!({"role": m.role.as_str(), "content": m.content}))
            .collect();

        // The API rejects temperature and top_p together; temperature is always set.
        let mut body = json!({
            "model": self.models.pick(request),
            "messages": messages,
            "max_tokens": request.max_tokens(),
            "temperature": request.temperature(),
        });

        if let Some(system) = request.system_prompt() {
            body["system"] = json!(system);
        }
        if !request.stop().is_empty() {
            body["stop_sequences"] = json!(request.stop());
        }
        body
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    #[instrument(skip_all, level = "debug", fields(request_id = %request.id()))]
    async fn complete(
        &self,
        request: &CompletionRequest,
        credentials: &Credentials,
    ) -> Result<RawCompletion, RawProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        let mut http_request = self
            .http_client
            .post(&url)
            .header("anthropic-version", &self.api_version)
            .json(&self.request_body(request));

        if let Some(api_key) = credentials.expose() {
            http_request = http_request.header("x-api-key", api_key);
        }

        let response = http_request
            .send()
            .await
            .map_err(|e| from_reqwest(e, self.attempt_budget))?;

        if !response.status().is_success() {
            return Err(http_error(response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| RawProviderError::Decode(format!("Anthropic response: {}", e)))?;

        ResponseParser::parse_anthropic(&body)
    }
}

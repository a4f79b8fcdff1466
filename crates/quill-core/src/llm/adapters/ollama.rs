//! Ollama adapter for the local/offline model

use super::error_utils::{from_reqwest, http_error};
use super::{ModelSelection, role_content_messages};
use crate::llm::parsers::ResponseParser;
use crate::llm::provider::{Credentials, ProviderAdapter, RawProviderError};
use crate::llm::request::CompletionRequest;
use crate::llm::response::RawCompletion;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::instrument;

pub struct OllamaAdapter {
    base_url: String,
    models: ModelSelection,
    http_client: Client,
    attempt_budget: Duration,
}

impl OllamaAdapter {
    pub fn new(
        base_url: String,
        models: ModelSelection,
        http_client: Client,
        attempt_budget: Duration,
    ) -> Self {
        Self {
            base_url,
            models,
            http_client,
            attempt_budget,
        }
    }

    pub fn request_body(&self, request: &CompletionRequest) -> Value {
        let mut options = json!({
            "temperature": request.temperature(),
            "num_predict": request.max_tokens(),
        });
        if let Some(top_p) = request.top_p() {
            options["top_p"] = json!(top_p);
        }
        if !request.stop().is_empty() {
            options["stop"] = json!(request.stop());
        }

        json!({
            "model": self.models.pick(request),
            "messages": role_content_messages(request.messages().iter()),
            "stream": false,
            "options": options,
        })
    }
}

#[async_trait]
impl ProviderAdapter for OllamaAdapter {
    #[instrument(skip_all, level = "debug", fields(request_id = %request.id()))]
    async fn complete(
        &self,
        request: &CompletionRequest,
        credentials: &Credentials,
    ) -> Result<RawCompletion, RawProviderError> {
        let url = format!("{}/api/chat", self.base_url);
        let mut http_request = self.http_client.post(&url).json(&self.request_body(request));

        // Local servers normally run open; a key is only sent when configured (e.g. behind a proxy).
        if let Some(api_key) = credentials.expose() {
            http_request = http_request.bearer_auth(api_key);
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
            .map_err(|e| RawProviderError::Decode(format!("Ollama response: {}", e)))?;

        ResponseParser::parse_ollama(&body)
    }

    /// `/api/tags` answers without loading a model
    async fn probe(&self, _credentials: &Credentials) -> Result<(), RawProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| from_reqwest(e, self.attempt_budget))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(http_error(response).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::messages::Message;
    use crate::llm::normalizer::RequestNormalizer;
    use crate::llm::request::RawRequest;

    #[test]
    fn sampling_options_are_nested() {
        let adapter = OllamaAdapter::new(
            "http://localhost:11434".to_string(),
            ModelSelection::new(vec!["llama3.2".to_string()]),
            Client::new(),
            Duration::from_secs(20),
        );
        let request = RequestNormalizer::default()
            .normalize(RawRequest::new(vec![Message::user("Continue the story")]))
            .unwrap();

        let body = adapter.request_body(&request);
        assert_eq!(body["model"], "llama3.2");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_predict"], 800);
        assert!(body.get("max_tokens").is_none());
    }
}

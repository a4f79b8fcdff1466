//! OpenAI chat completions adapter

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

/// Secondary cloud provider
pub struct OpenAiAdapter {
    base_url: String,
    models: ModelSelection,
    http_client: Client,
    attempt_budget: Duration,
}

impl OpenAiAdapter {
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
        let mut body = json!({
            "model": self.models.pick(request),
            "messages": role_content_messages(request.messages().iter()),
            "max_tokens": request.max_tokens(),
            "temperature": request.temperature(),
        });
        if let Some(top_p) = request.top_p() {
            body["top_p"] = json!(top_p);
        }
        if !request.stop().is_empty() {
            body["stop"] = json!(request.stop());
        }
        body
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    #[instrument(skip_all, level = "debug", fields(request_id = %request.id()))]
    async fn complete(
        &self,
        request: &CompletionRequest,
        credentials: &Credentials,
    ) -> Result<RawCompletion, RawProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut http_request = self.http_client.post(&url).json(&self.request_body(request));

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
            .map_err(|e| RawProviderError::Decode(format!("OpenAI response: {}", e)))?;

        ResponseParser::parse_openai(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::messages::Message;
    use crate::llm::normalizer::RequestNormalizer;
    use crate::llm::request::{CompletionOptions, RawRequest};

    #[test]
    fn keeps_system_message_inline() {
        let adapter = OpenAiAdapter::new(
            "https://api.openai.com/v1".to_string(),
            ModelSelection::new(vec!["gpt-4o-mini".to_string()]),
            Client::new(),
            Duration::from_secs(20),
        );
        let request = RequestNormalizer::default()
            .normalize(
                RawRequest::new(vec![Message::system("Be terse."), Message::user("Summarize")])
                    .with_options(CompletionOptions::new().with_top_p(0.5)),
            )
            .unwrap();

        let body = adapter.request_body(&request);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Summarize");
        assert_eq!(body["top_p"], 0.5);
        assert_eq!(body["max_tokens"], 800);
        assert!(body.get("stop").is_none());
    }
}

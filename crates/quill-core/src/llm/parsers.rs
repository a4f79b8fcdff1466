//! Response parsing for the supported provider wire formats

use super::provider::RawProviderError;
use super::response::RawCompletion;
use serde_json::Value;

/// Response parser for various providers
pub struct ResponseParser;

impl ResponseParser {
    /// Parse an OpenAI chat completion
    pub fn parse_openai(response: &Value) -> Result<RawCompletion, RawProviderError> {
        let choice = response["choices"]
            .get(0)
            .ok_or_else(|| RawProviderError::Decode("no choices in OpenAI response".to_string()))?;

        let content = choice["message"]["content"]
            .as_str()
            .ok_or_else(|| RawProviderError::Decode("OpenAI choice has no text content".to_string()))?
            .to_string();

        Ok(RawCompletion {
            content,
            model: response["model"].as_str().map(str::to_string),
            prompt_tokens: token_count(&response["usage"]["prompt_tokens"]),
            completion_tokens: token_count(&response["usage"]["completion_tokens"]),
            finish_reason: choice["finish_reason"].as_str().map(str::to_string),
        })
    }

    /// Parse an Anthropic messages response
    ///
    /// Text blocks are joined with newlines; other block types are ignored.
    pub fn parse_anthropic(response: &Value) -> Result<RawCompletion, RawProviderError> {
        let blocks = response["content"].as_array().ok_or_else(|| {
            RawProviderError::Decode("Anthropic response has no content array".to_string())
        })?;

        let mut content = String::new();
        let mut saw_text = false;
        for block in blocks {
            if block["type"].as_str() == Some("text") {
                if let Some(text) = block["text"].as_str() {
                    if saw_text {
                        content.push('\n');
                    }
                    content.push_str(text);
                    saw_text = true;
                }
            }
        }
        if !saw_text {
            return Err(RawProviderError::Decode(
                "Anthropic response contains no text block".to_string(),
            ));
        }

        Ok(RawCompletion {
            content,
            model: response["model"].as_str().map(str::to_string),
            prompt_tokens: token_count(&response["usage"]["input_tokens"]),
            completion_tokens: token_count(&response["usage"]["output_tokens"]),
            finish_reason: response["stop_reason"].as_str().map(str::to_string),
        })
    }

    /// Parse an Ollama `/api/chat` response (non-streaming)
    pub fn parse_ollama(response: &Value) -> Result<RawCompletion, RawProviderError> {
        let content = response["message"]["content"]
            .as_str()
            .ok_or_else(|| RawProviderError::Decode("Ollama response has no message".to_string()))?
            .to_string();

        Ok(RawCompletion {
            content,
            model: response["model"].as_str().map(str::to_string),
            prompt_tokens: token_count(&response["prompt_eval_count"]),
            completion_tokens: token_count(&response["eval_count"]),
            finish_reason: response["done_reason"].as_str().map(str::to_string),
        })
    }
}

fn token_count(value: &Value) -> u32 {
    value
        .as_u64()
        .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
        .unwrap_or(0)
}

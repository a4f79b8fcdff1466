//! Helpers for turning HTTP failures into `RawProviderError`s without
//! leaking secrets.

use crate::llm::provider::RawProviderError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::error::Error as _;
use std::time::Duration;

const MAX_ERROR_TEXT_CHARS: usize = 1_024;
const REDACTED: &str = "[REDACTED]";

static BEARER_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bBearer\s+[A-Za-z0-9._\-+/=]{8,}").expect("valid bearer token regex")
});

static KEY_VALUE_SECRET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\b(api[_-]?key|access[_-]?token|token|secret|password|authorization|x-api-key)\b["']?\s*[:=]\s*["']?[^"',\s}]+"#,
    )
    .expect("valid key/value secret regex")
});

static PROVIDER_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bsk-[A-Za-z0-9_\-]{8,}").expect("valid provider key regex")
});

/// Redact secrets and truncate a provider error payload.
pub fn sanitize_provider_error_text(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "<empty error response body>".to_string();
    }

    if let Ok(mut json) = serde_json::from_str::<Value>(trimmed) {
        redact_json_value(&mut json);
        let serialized =
            serde_json::to_string(&json).unwrap_or_else(|_| "<unserializable error>".to_string());
        return truncate_with_suffix(serialized);
    }

    truncate_with_suffix(redact_inline_secrets(trimmed))
}

fn redact_json_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if is_sensitive_key(key) {
                    *val = Value::String(REDACTED.to_string());
                } else {
                    redact_json_value(val);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_json_value),
        Value::String(s) => *s = redact_inline_secrets(s),
        _ => {}
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.to_ascii_lowercase().replace(['-', ' '], "_");
    ["api_key", "token", "secret", "password", "authorization", "cookie", "private_key"]
        .iter()
        .any(|needle| normalized.contains(needle))
}

fn redact_inline_secrets(input: &str) -> String {
    let step = BEARER_TOKEN_RE.replace_all(input, "Bearer [REDACTED]");
    let step = KEY_VALUE_SECRET_RE.replace_all(&step, "$1=[REDACTED]");
    PROVIDER_KEY_RE.replace_all(&step, REDACTED).into_owned()
}

fn truncate_with_suffix(input: String) -> String {
    let char_count = input.chars().count();
    if char_count <= MAX_ERROR_TEXT_CHARS {
        return input;
    }

    let truncated: String = input.chars().take(MAX_ERROR_TEXT_CHARS).collect();
    format!(
        "{}... [truncated {} chars]",
        truncated,
        char_count - MAX_ERROR_TEXT_CHARS
    )
}

/// Read a non-success response into an `Http` error.
pub async fn http_error(response: reqwest::Response) -> RawProviderError {
    let status = response.status().as_u16();
    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_retry_after);
    let body = response.text().await.unwrap_or_default();
    RawProviderError::Http {
        status,
        body: sanitize_provider_error_text(&body),
        retry_after,
    }
}

/// `Retry-After` in delta-seconds form; HTTP dates are ignored.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    value
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

/// Map a reqwest transport failure onto the raw taxonomy.
pub fn from_reqwest(err: reqwest::Error, attempt_budget: Duration) -> RawProviderError {
    let chain = error_chain_text(&err);
    if err.is_timeout() {
        RawProviderError::Timeout(attempt_budget)
    } else if err.is_builder() {
        RawProviderError::InvalidRequest(chain)
    } else if err.is_decode() {
        RawProviderError::Decode(chain)
    } else if err.is_connect() {
        let lowered = chain.to_ascii_lowercase();
        if lowered.contains("dns") || lowered.contains("resolve") || lowered.contains("lookup") {
            RawProviderError::Dns(chain)
        } else {
            RawProviderError::Connect(chain)
        }
    } else {
        let lowered = chain.to_ascii_lowercase();
        if lowered.contains("reset") || lowered.contains("broken pipe") {
            RawProviderError::Reset(chain)
        } else {
            RawProviderError::Transport(chain)
        }
    }
}

fn error_chain_text(err: &reqwest::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    sanitize_provider_error_text(&text)
}

//! Configuration data model

use super::logging::LoggingConfig;
use crate::cache::CacheConfig;
use crate::error::{QuillError, QuillResult};
use crate::filter::FilterConfig;
use crate::health::HealthConfig;
use crate::llm::normalizer::RequestLimits;
use crate::llm::provider::{Capability, CredentialsRef, ProviderDescriptor};
use crate::recovery::RetryConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Wire protocol spoken by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Anthropic,
    #[serde(rename = "openai")]
    OpenAi,
    Ollama,
}

impl ProviderKind {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "https://api.anthropic.com",
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::Ollama => "http://localhost:11434",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "claude-3-5-haiku-latest",
            ProviderKind::OpenAi => "gpt-4o-mini",
            ProviderKind::Ollama => "llama3.2",
        }
    }

    /// Local models run without an API key
    pub fn requires_credentials(&self) -> bool {
        !matches!(self, ProviderKind::Ollama)
    }
}

/// One `[[providers]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub name: String,
    pub kind: ProviderKind,
    #[serde(default)]
    pub priority: u32,
    /// Served models, default first; empty means the kind's default model
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Name of the secret to resolve, e.g. an environment variable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
    #[serde(default = "default_capabilities")]
    pub capabilities: Vec<Capability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_capabilities() -> Vec<Capability> {
    vec![Capability::Completion, Capability::Chat, Capability::Streaming]
}

fn default_enabled() -> bool {
    true
}

impl ProviderSettings {
    pub fn new(name: impl Into<String>, kind: ProviderKind, priority: u32) -> Self {
        Self {
            name: name.into(),
            kind,
            priority,
            models: Vec::new(),
            base_url: None,
            credentials: None,
            capabilities: default_capabilities(),
            api_version: None,
            enabled: true,
        }
    }

    pub fn with_models(mut self, models: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.models = models.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_credentials(mut self, reference: impl Into<String>) -> Self {
        self.credentials = Some(reference.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn base_url(&self) -> String {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.kind.default_base_url())
            .trim_end_matches('/')
            .to_string()
    }

    /// Configured models, or the kind's default
    pub fn effective_models(&self) -> Vec<String> {
        if self.models.is_empty() {
            vec![self.kind.default_model().to_string()]
        } else {
            self.models.clone()
        }
    }

    pub fn descriptor(&self) -> ProviderDescriptor {
        let mut descriptor = ProviderDescriptor::new(self.name.clone(), self.priority)
            .with_capabilities(self.capabilities.iter().copied())
            .with_models(self.effective_models());
        if let Some(reference) = &self.credentials {
            descriptor = descriptor.with_credentials_ref(CredentialsRef::new(reference.clone()));
        }
        descriptor
    }
}

/// Per-attempt and per-call deadlines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Bound on a single provider attempt
    #[serde(with = "humantime_serde")]
    pub attempt: Duration,
    /// Bound on a whole call, across retries and fallback
    #[serde(with = "humantime_serde")]
    pub request: Duration,
    #[serde(with = "humantime_serde")]
    pub connect: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            attempt: Duration::from_secs(20),
            request: Duration::from_secs(60),
            connect: Duration::from_secs(10),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuillConfig {
    pub max_prompt_chars: usize,
    pub default_max_tokens: u32,
    pub default_temperature: f32,
    pub enable_content_filtering: bool,
    pub retry: RetryConfig,
    pub health: HealthConfig,
    pub timeouts: TimeoutConfig,
    pub logging: LoggingConfig,
    pub filter: FilterConfig,
    pub cache: CacheConfig,
    pub providers: Vec<ProviderSettings>,
}

impl Default for QuillConfig {
    fn default() -> Self {
        let limits = RequestLimits::default();
        Self {
            max_prompt_chars: limits.max_prompt_chars,
            default_max_tokens: limits.default_max_tokens,
            default_temperature: limits.default_temperature,
            enable_content_filtering: true,
            retry: RetryConfig::default(),
            health: HealthConfig::default(),
            timeouts: TimeoutConfig::default(),
            logging: LoggingConfig::default(),
            filter: FilterConfig::default(),
            cache: CacheConfig::default(),
            providers: vec![
                ProviderSettings::new("claude", ProviderKind::Anthropic, 0)
                    .with_credentials("ANTHROPIC_API_KEY"),
                ProviderSettings::new("openai", ProviderKind::OpenAi, 1)
                    .with_credentials("OPENAI_API_KEY"),
                ProviderSettings::new("local", ProviderKind::Ollama, 2),
            ],
        }
    }
}

impl QuillConfig {
    pub fn request_limits(&self) -> RequestLimits {
        RequestLimits {
            max_prompt_chars: self.max_prompt_chars,
            default_max_tokens: self.default_max_tokens,
            default_temperature: self.default_temperature,
        }
    }

    /// Check invariants the rest of the engine relies on
    pub fn validate(&self) -> QuillResult<()> {
        if self.max_prompt_chars == 0 {
            return Err(QuillError::config("max_prompt_chars must be positive"));
        }
        if self.default_max_tokens == 0 {
            return Err(QuillError::config("default_max_tokens must be positive"));
        }
        if !(0.0..=1.0).contains(&self.default_temperature) {
            return Err(QuillError::config(format!(
                "default_temperature must be between 0 and 1, got {}",
                self.default_temperature
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(QuillError::config_with_context(
                "max_attempts must be at least 1",
                "[retry]",
            ));
        }
        if self.retry.base_delay > self.retry.max_delay {
            return Err(QuillError::config_with_context(
                "base_delay must not exceed max_delay",
                "[retry]",
            ));
        }
        if self.health.degraded_after == 0 || self.health.unhealthy_after == 0 {
            return Err(QuillError::config_with_context(
                "degraded_after and unhealthy_after must be at least 1",
                "[health]",
            ));
        }
        if self.timeouts.attempt.is_zero() || self.timeouts.request.is_zero() {
            return Err(QuillError::config_with_context(
                "timeouts must be non-zero",
                "[timeouts]",
            ));
        }

        let mut seen = HashSet::new();
        for (index, provider) in self.providers.iter().enumerate() {
            let context = format!("providers[{}]", index);
            if provider.name.trim().is_empty() {
                return Err(QuillError::config_with_context("provider name is empty", context));
            }
            if !seen.insert(provider.name.as_str()) {
                return Err(QuillError::config_with_context(
                    format!("duplicate provider name '{}'", provider.name),
                    context,
                ));
            }
            if provider.capabilities.is_empty() {
                return Err(QuillError::config_with_context(
                    format!("provider '{}' declares no capabilities", provider.name),
                    context,
                ));
            }
            if provider.models.iter().any(|m| m.trim().is_empty()) {
                return Err(QuillError::config_with_context(
                    format!("provider '{}' lists an empty model name", provider.name),
                    context,
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = QuillConfig::default();
        config.validate().unwrap();
        assert_eq!(config.providers.len(), 3);
        assert_eq!(config.default_max_tokens, 800);
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn duplicate_provider_names_are_rejected() {
        let mut config = QuillConfig::default();
        config.providers.push(ProviderSettings::new("claude", ProviderKind::Anthropic, 5));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate provider name 'claude'"));
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let mut config = QuillConfig::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn settings_fall_back_to_kind_defaults() {
        let settings = ProviderSettings::new("local", ProviderKind::Ollama, 2)
            .with_base_url("http://127.0.0.1:11434/");
        assert_eq!(settings.base_url(), "http://127.0.0.1:11434");
        assert_eq!(settings.effective_models(), ["llama3.2".to_string()]);
        let descriptor = settings.descriptor();
        assert_eq!(descriptor.default_model(), Some("llama3.2"));
        assert!(descriptor.credentials_ref.is_none());
    }

    #[test]
    fn provider_kind_uses_lowercase_names() {
        let settings: ProviderSettings =
            toml::from_str("name = \"gpt\"\nkind = \"openai\"\npriority = 1").unwrap();
        assert_eq!(settings.kind, ProviderKind::OpenAi);
        assert!(settings.enabled);
        assert_eq!(settings.capabilities.len(), 3);
    }
}

//! Provider descriptors, credentials and the adapter contract

use super::request::CompletionRequest;
use super::response::RawCompletion;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

/// What a provider can serve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Completion,
    Chat,
    Streaming,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Completion => write!(f, "completion"),
            Capability::Chat => write!(f, "chat"),
            Capability::Streaming => write!(f, "streaming"),
        }
    }
}

/// Opaque handle resolved by a `SecretStore`; never logged.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CredentialsRef(String);

impl CredentialsRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CredentialsRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CredentialsRef(..)")
    }
}

/// Resolved provider secret. `Debug` never prints the value.
#[derive(Clone, Default)]
pub struct Credentials {
    secret: Option<String>,
}

impl Credentials {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Some(secret.into()),
        }
    }

    /// No secret; used by local providers
    pub fn none() -> Self {
        Self { secret: None }
    }

    /// Borrow the secret for building an outbound request
    pub fn expose(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    pub fn is_present(&self) -> bool {
        self.secret.is_some()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.secret {
            Some(_) => f.write_str("Credentials([REDACTED])"),
            None => f.write_str("Credentials(None)"),
        }
    }
}

/// Static description of a configured provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDescriptor {
    pub name: String,
    /// Lower is tried first
    pub priority: u32,
    pub capabilities: BTreeSet<Capability>,
    /// Models the provider serves; the first one is its default
    pub models: Vec<String>,
    pub credentials_ref: Option<CredentialsRef>,
}

impl ProviderDescriptor {
    /// Descriptor with completion and chat support
    pub fn new(name: impl Into<String>, priority: u32) -> Self {
        Self {
            name: name.into(),
            priority,
            capabilities: [Capability::Completion, Capability::Chat].into_iter().collect(),
            models: Vec::new(),
            credentials_ref: None,
        }
    }

    pub fn with_capabilities(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        self.capabilities = capabilities.into_iter().collect();
        self
    }

    pub fn with_models(mut self, models: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.models = models.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_credentials_ref(mut self, reference: CredentialsRef) -> Self {
        self.credentials_ref = Some(reference);
        self
    }

    pub fn default_model(&self) -> Option<&str> {
        self.models.first().map(String::as_str)
    }

    /// Chat-capable providers also accept single prompts
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Completion => {
                self.capabilities.contains(&Capability::Completion)
                    || self.capabilities.contains(&Capability::Chat)
            }
            other => self.capabilities.contains(&other),
        }
    }

    /// Whether `preference` names this provider or one of its models
    pub fn matches_preference(&self, preference: &str) -> bool {
        self.name == preference || self.models.iter().any(|m| m == preference)
    }

    pub fn summary(&self) -> ProviderSummary {
        ProviderSummary {
            name: self.name.clone(),
            priority: self.priority,
            capabilities: self.capabilities.iter().copied().collect(),
        }
    }
}

/// Public view of a provider: no credentials, no adapter internals
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderSummary {
    pub name: String,
    pub priority: u32,
    pub capabilities: Vec<Capability>,
}

/// Transport-level failure reported by an adapter, before classification
#[derive(Debug, Clone, thiserror::Error)]
pub enum RawProviderError {
    #[error("HTTP {status}: {body}")]
    Http {
        status: u16,
        body: String,
        retry_after: Option<Duration>,
    },
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("DNS resolution failed: {0}")]
    Dns(String),
    #[error("connection reset: {0}")]
    Reset(String),
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("request could not be built: {0}")]
    InvalidRequest(String),
    #[error("transport error: {0}")]
    Transport(String),
}

/// One concrete provider API.
///
/// Adapters translate a `CompletionRequest` into the provider's wire format
/// and report failures unclassified; retry and fallback decisions are made by
/// the orchestrator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Run one completion attempt
    async fn complete(
        &self,
        request: &CompletionRequest,
        credentials: &Credentials,
    ) -> Result<RawCompletion, RawProviderError>;

    /// Cheap liveness check used by background probes
    async fn probe(&self, credentials: &Credentials) -> Result<(), RawProviderError> {
        self.complete(&CompletionRequest::probe(), credentials)
            .await
            .map(|_| ())
    }
}

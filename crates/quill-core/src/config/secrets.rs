//! Credential resolution

use crate::llm::provider::{Credentials, CredentialsRef};
use std::collections::HashMap;

/// Resolves a provider's `CredentialsRef` into a usable secret.
pub trait SecretStore: Send + Sync {
    fn resolve(&self, reference: &CredentialsRef) -> Option<Credentials>;
}

/// Treats each reference as the name of an environment variable.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecretStore;

impl SecretStore for EnvSecretStore {
    fn resolve(&self, reference: &CredentialsRef) -> Option<Credentials> {
        std::env::var(reference.as_str())
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(Credentials::new)
    }
}

/// In-memory secrets, used by embedding applications and tests.
#[derive(Default)]
pub struct StaticSecretStore {
    secrets: HashMap<String, String>,
}

impl StaticSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, reference: impl Into<String>, secret: impl Into<String>) -> Self {
        self.secrets.insert(reference.into(), secret.into());
        self
    }
}

impl SecretStore for StaticSecretStore {
    fn resolve(&self, reference: &CredentialsRef) -> Option<Credentials> {
        self.secrets
            .get(reference.as_str())
            .map(|secret| Credentials::new(secret.clone()))
    }
}

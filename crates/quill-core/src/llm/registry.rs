//! Provider registry
//!
//! The registry holds an immutable, priority-ordered snapshot of providers.
//! Readers clone the current `Arc<RegistrySnapshot>`; `reload` swaps in a new
//! snapshot so in-flight calls finish against the one they started with.

use super::adapters::{build_adapter, build_http_client};
use super::provider::{Credentials, ProviderAdapter, ProviderDescriptor, ProviderSummary};
use crate::config::{QuillConfig, SecretStore};
use crate::error::{QuillError, QuillResult};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// A provider ready to be called
pub struct RegisteredProvider {
    pub descriptor: ProviderDescriptor,
    pub adapter: Arc<dyn ProviderAdapter>,
    credentials: Credentials,
}

impl RegisteredProvider {
    pub fn new(
        descriptor: ProviderDescriptor,
        adapter: Arc<dyn ProviderAdapter>,
        credentials: Credentials,
    ) -> Self {
        Self {
            descriptor,
            adapter,
            credentials,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}

impl fmt::Debug for RegisteredProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredProvider")
            .field("descriptor", &self.descriptor)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

/// Immutable view of the registry at one version
#[derive(Debug)]
pub struct RegistrySnapshot {
    version: u64,
    entries: Vec<Arc<RegisteredProvider>>,
}

impl RegistrySnapshot {
    fn build(version: u64, entries: Vec<RegisteredProvider>) -> QuillResult<Self> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.name().to_string()) {
                return Err(QuillError::provider(
                    entry.name(),
                    "registered more than once",
                ));
            }
        }

        let mut entries: Vec<Arc<RegisteredProvider>> = entries.into_iter().map(Arc::new).collect();
        // stable: equal priorities keep configuration order
        entries.sort_by_key(|e| e.descriptor.priority);
        Ok(Self { version, entries })
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Entries ordered by priority, ties by configuration order
    pub fn entries(&self) -> &[Arc<RegisteredProvider>] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&Arc<RegisteredProvider>> {
        self.entries.iter().find(|e| e.name() == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug)]
pub struct ProviderRegistry {
    current: RwLock<Arc<RegistrySnapshot>>,
}

impl ProviderRegistry {
    pub fn new(entries: Vec<RegisteredProvider>) -> QuillResult<Self> {
        Ok(Self {
            current: RwLock::new(Arc::new(RegistrySnapshot::build(1, entries)?)),
        })
    }

    /// Build adapters for every enabled `[[providers]]` entry.
    ///
    /// Providers whose required credentials cannot be resolved are skipped
    /// with a warning so the remaining ones stay usable.
    pub fn from_config(config: &QuillConfig, secrets: &dyn SecretStore) -> QuillResult<Self> {
        Self::new(Self::entries_from_config(config, secrets)?)
    }

    /// Resolve entries without installing them, for use with `reload`
    pub fn entries_from_config(
        config: &QuillConfig,
        secrets: &dyn SecretStore,
    ) -> QuillResult<Vec<RegisteredProvider>> {
        let http_client = build_http_client(&config.timeouts)?;
        let mut entries = Vec::new();

        for settings in config.providers.iter().filter(|p| p.enabled) {
            let descriptor = settings.descriptor();
            let credentials = match &descriptor.credentials_ref {
                Some(reference) => secrets.resolve(reference),
                None => Some(Credentials::none()),
            };
            let credentials = match credentials {
                Some(credentials) => credentials,
                None if settings.kind.requires_credentials() => {
                    tracing::warn!(
                        provider = %settings.name,
                        "secret not found, provider disabled"
                    );
                    continue;
                }
                None => Credentials::none(),
            };

            let adapter = build_adapter(settings, http_client.clone(), &config.timeouts);
            entries.push(RegisteredProvider::new(descriptor, adapter, credentials));
        }

        Ok(entries)
    }

    /// Current snapshot; cheap, never blocks writers for long
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.current.read().clone()
    }

    pub fn ordered(&self) -> Vec<ProviderDescriptor> {
        self.snapshot()
            .entries()
            .iter()
            .map(|e| e.descriptor.clone())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<ProviderDescriptor> {
        self.snapshot().get(name).map(|e| e.descriptor.clone())
    }

    pub fn summaries(&self) -> Vec<ProviderSummary> {
        self.snapshot()
            .entries()
            .iter()
            .map(|e| e.descriptor.summary())
            .collect()
    }

    pub fn version(&self) -> u64 {
        self.current.read().version()
    }

    /// Replace every entry; returns the new version
    pub fn reload(&self, entries: Vec<RegisteredProvider>) -> QuillResult<u64> {
        let mut current = self.current.write();
        let next = RegistrySnapshot::build(current.version() + 1, entries)?;
        let version = next.version();
        *current = Arc::new(next);
        tracing::info!(version, providers = current.len(), "provider registry reloaded");
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProviderKind, ProviderSettings, StaticSecretStore};
    use crate::llm::provider::MockProviderAdapter;

    fn entry(name: &str, priority: u32) -> RegisteredProvider {
        RegisteredProvider::new(
            ProviderDescriptor::new(name, priority),
            Arc::new(MockProviderAdapter::new()),
            Credentials::none(),
        )
    }

    fn names(registry: &ProviderRegistry) -> Vec<String> {
        registry.ordered().into_iter().map(|d| d.name).collect()
    }

    #[test]
    fn orders_by_priority_then_insertion() {
        let registry = ProviderRegistry::new(vec![
            entry("local", 2),
            entry("openai", 1),
            entry("backup", 1),
            entry("claude", 0),
        ])
        .unwrap();
        assert_eq!(names(&registry), ["claude", "openai", "backup", "local"]);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = ProviderRegistry::new(vec![entry("claude", 0), entry("claude", 1)]).unwrap_err();
        assert!(matches!(err, QuillError::Provider { .. }));
    }

    #[test]
    fn reload_bumps_version_and_keeps_old_snapshots() {
        let registry = ProviderRegistry::new(vec![entry("claude", 0)]).unwrap();
        let before = registry.snapshot();
        let version = registry.reload(vec![entry("openai", 0), entry("local", 1)]).unwrap();
        assert_eq!(version, 2);
        assert_eq!(before.version(), 1);
        assert_eq!(before.len(), 1);
        assert_eq!(names(&registry), ["openai", "local"]);
        assert!(registry.get("claude").is_none());
    }

    #[test]
    fn failed_reload_leaves_registry_untouched() {
        let registry = ProviderRegistry::new(vec![entry("claude", 0)]).unwrap();
        assert!(registry.reload(vec![entry("a", 0), entry("a", 1)]).is_err());
        assert_eq!(registry.version(), 1);
        assert_eq!(names(&registry), ["claude"]);
    }

    #[test]
    fn from_config_skips_providers_without_credentials() {
        let mut config = QuillConfig::default();
        config.providers = vec![
            ProviderSettings::new("claude", ProviderKind::Anthropic, 0)
                .with_credentials("ANTHROPIC_API_KEY"),
            ProviderSettings::new("openai", ProviderKind::OpenAi, 1)
                .with_credentials("OPENAI_API_KEY"),
            ProviderSettings::new("local", ProviderKind::Ollama, 2),
        ];
        let secrets = StaticSecretStore::new().with_secret("ANTHROPIC_API_KEY", "sk-ant-test");

        let registry = ProviderRegistry::from_config(&config, &secrets).unwrap();
        assert_eq!(names(&registry), ["claude", "local"]);
        let snapshot = registry.snapshot();
        assert_eq!(
            snapshot.get("claude").unwrap().credentials().expose(),
            Some("sk-ant-test")
        );
        assert!(!snapshot.get("local").unwrap().credentials().is_present());
    }

    #[test]
    fn disabled_providers_are_not_registered() {
        let mut config = QuillConfig::default();
        let mut local = ProviderSettings::new("local", ProviderKind::Ollama, 0);
        local.enabled = false;
        config.providers = vec![local];
        let registry = ProviderRegistry::from_config(&config, &StaticSecretStore::new()).unwrap();
        assert!(registry.snapshot().is_empty());
    }
}

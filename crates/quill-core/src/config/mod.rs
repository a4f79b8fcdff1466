//! Configuration management
//!
//! `QuillConfig` is loaded by `ConfigLoader` from a TOML or JSON file, then
//! overridden from `QUILL_*` environment variables, then validated.

mod loader;
mod logging;
mod model;
mod secrets;

pub use loader::{ConfigLoader, ConfigSource, apply_env_overrides};
pub use logging::{LogFormat, LoggingConfig};
pub use model::{ProviderKind, ProviderSettings, QuillConfig, TimeoutConfig};
pub use secrets::{EnvSecretStore, SecretStore, StaticSecretStore};

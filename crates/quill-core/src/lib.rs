//! Quill Core Library
//!
//! Orchestrates completion and chat calls across several language-model
//! providers: request validation, per-provider retry with backoff, ordered
//! fallback, rolling provider health, content filtering, and an optional
//! response cache.

pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod filter;
pub mod health;
pub mod llm;
pub mod recovery;
pub mod service;

// Re-export commonly used types
pub use cache::{CacheConfig, ResponseCache};
pub use config::{ConfigLoader, EnvSecretStore, QuillConfig, SecretStore, StaticSecretStore};
pub use error::{ErrorKind, OrchestrationError, QuillError, QuillResult, UserFriendlyError};
pub use filter::{ContentFilter, FilterConfig};
pub use health::{HealthConfig, HealthEvent, HealthMonitor, HealthStatus, ProviderHealth};
pub use llm::{
    Capability, CompletionOptions, CompletionRequest, CompletionResponse, ConversationContext,
    Credentials, FinishReason, Message, ProviderAdapter, ProviderDescriptor, ProviderRegistry,
    ProviderSummary, RawCompletion, RawProviderError, RegisteredProvider, Role,
};
pub use recovery::{CallContext, RetryConfig};
pub use service::AiService;

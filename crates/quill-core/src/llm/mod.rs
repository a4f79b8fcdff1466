//! Provider plumbing: request and response types, adapters, the registry
//! and the fallback orchestrator

pub mod adapters;
pub mod classifier;
pub mod messages;
pub mod normalizer;
pub mod orchestrator;
pub mod parsers;
pub mod provider;
pub mod registry;
pub mod request;
pub mod response;

#[cfg(test)]
mod orchestrator_tests;

pub use classifier::ErrorClassifier;
pub use messages::{ConversationContext, Message, Role};
pub use normalizer::{RequestLimits, RequestNormalizer};
pub use orchestrator::{FallbackOrchestrator, FallbackState};
pub use provider::{
    Capability, Credentials, CredentialsRef, ProviderAdapter, ProviderDescriptor, ProviderSummary,
    RawProviderError,
};
pub use registry::{ProviderRegistry, RegisteredProvider, RegistrySnapshot};
pub use request::{CompletionOptions, CompletionRequest, RawRequest};
pub use response::{CompletionResponse, FinishReason, RawCompletion, ResponseNormalizer};

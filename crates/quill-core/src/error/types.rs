//! Crate-wide error type

use super::orchestration::OrchestrationError;
use thiserror::Error;

/// Result type alias for Quill operations
pub type QuillResult<T> = Result<T, QuillError>;

/// Common accessors shared by every Quill error.
pub trait UnifiedError: std::error::Error + Send + Sync {
    /// Get the error code for programmatic handling
    fn error_code(&self) -> &str;

    /// Get the human-readable error message
    fn message(&self) -> &str;

    /// Get optional context about the error
    fn context(&self) -> Option<&str> {
        None
    }

    /// Check if this error is retryable
    fn is_retryable(&self) -> bool {
        false
    }
}

/// Main error type for everything outside a single completion call
#[derive(Error, Debug, Clone)]
pub enum QuillError {
    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        context: Option<String>,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        path: Option<String>,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json { message: String },

    /// HTTP client construction errors
    #[error("HTTP error: {message}")]
    Http { message: String },

    /// A provider entry could not be registered
    #[error("Provider error: {provider}: {message}")]
    Provider { provider: String, message: String },

    /// A completion call failed
    #[error(transparent)]
    Orchestration(#[from] OrchestrationError),
}

impl QuillError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: None,
        }
    }

    /// Create a configuration error with context
    pub fn config_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    /// Create an IO error tied to a path
    pub fn io_with_path(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    /// Create an HTTP setup error
    pub fn http(message: impl Into<String>) -> Self {
        Self::Http {
            message: message.into(),
        }
    }

    /// Create a provider registration error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

impl UnifiedError for QuillError {
    fn error_code(&self) -> &str {
        match self {
            Self::Config { .. } => "QUILL_CONFIG",
            Self::Io { .. } => "QUILL_IO",
            Self::Json { .. } => "QUILL_JSON",
            Self::Http { .. } => "QUILL_HTTP",
            Self::Provider { .. } => "QUILL_PROVIDER",
            Self::Orchestration(err) => err.kind().code(),
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::Config { message, .. } => message,
            Self::Io { message, .. } => message,
            Self::Json { message } => message,
            Self::Http { message } => message,
            Self::Provider { message, .. } => message,
            Self::Orchestration(err) => err.message(),
        }
    }

    fn context(&self) -> Option<&str> {
        match self {
            Self::Config { context, .. } => context.as_deref(),
            Self::Io { path, .. } => path.as_deref(),
            Self::Provider { provider, .. } => Some(provider),
            Self::Orchestration(err) => err.provider(),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Orchestration(err) => err.is_retryable(),
            _ => false,
        }
    }
}

impl From<std::io::Error> for QuillError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            path: None,
        }
    }
}

impl From<serde_json::Error> for QuillError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for QuillError {
    fn from(err: toml::de::Error) -> Self {
        Self::config_with_context(err.to_string(), "failed to parse TOML configuration")
    }
}

impl From<reqwest::Error> for QuillError {
    fn from(err: reqwest::Error) -> Self {
        Self::http(err.to_string())
    }
}

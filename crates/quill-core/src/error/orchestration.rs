//! Classified failure of a completion call

use super::types::UnifiedError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Failure taxonomy shared by the classifier, retry policy and callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The request was rejected before any provider was contacted
    Validation,
    /// The provider throttled the request
    RateLimit,
    /// The provider rejected the request (malformed, unauthorized, forbidden)
    ClientError,
    /// The provider failed internally or returned an unusable payload
    ServerError,
    /// The provider could not be reached
    Network,
    /// An attempt or the whole call ran out of time, or the caller cancelled
    Timeout,
    /// Every candidate provider failed or was skipped
    AllProvidersExhausted,
}

impl ErrorKind {
    /// Stable snake_case name, used in logs and JSON output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::RateLimit => "rate_limit",
            Self::ClientError => "client_error",
            Self::ServerError => "server_error",
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::AllProvidersExhausted => "all_providers_exhausted",
        }
    }

    /// Error code for programmatic handling
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation => "QUILL_VALIDATION",
            Self::RateLimit => "QUILL_RATE_LIMIT",
            Self::ClientError => "QUILL_CLIENT_ERROR",
            Self::ServerError => "QUILL_SERVER_ERROR",
            Self::Network => "QUILL_NETWORK",
            Self::Timeout => "QUILL_TIMEOUT",
            Self::AllProvidersExhausted => "QUILL_ALL_PROVIDERS_EXHAUSTED",
        }
    }

    /// Whether another attempt against the same provider can help
    pub fn retryable_by_default(&self) -> bool {
        matches!(
            self,
            Self::RateLimit | Self::ServerError | Self::Network | Self::Timeout
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last failure recorded for one provider during a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderFailure {
    pub provider: String,
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Attempts made against the provider; zero when it was skipped
    pub attempts: u32,
}

impl ProviderFailure {
    /// Capture the final error of a provider's retry loop
    pub fn from_error(provider: impl Into<String>, error: &OrchestrationError, attempts: u32) -> Self {
        Self {
            provider: provider.into(),
            kind: error.kind(),
            message: error.message().to_string(),
            status_code: error.status_code(),
            attempts,
        }
    }

    /// Record a provider that was never attempted
    pub fn skipped(provider: impl Into<String>, kind: ErrorKind, reason: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            kind,
            message: reason.into(),
            status_code: None,
            attempts: 0,
        }
    }
}

/// The classified error returned for a failed completion call.
///
/// Raw provider detail (already sanitized) is kept for diagnostics only and is
/// never part of `message`.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{kind}: {message}")]
pub struct OrchestrationError {
    kind: ErrorKind,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider: Option<String>,
    retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_code: Option<u16>,
    #[serde(skip)]
    retry_after: Option<Duration>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failures: Vec<ProviderFailure>,
    #[serde(skip)]
    detail: Option<String>,
    #[serde(skip)]
    auth_failure: bool,
}

impl OrchestrationError {
    /// Create an error whose retry decision follows the kind
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            provider: None,
            retryable: kind.retryable_by_default(),
            status_code: None,
            retry_after: None,
            failures: Vec::new(),
            detail: None,
            auth_failure: false,
        }
    }

    /// Invalid caller input
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Inbound content rejected by the content filter
    pub fn policy_violation(rule: &str) -> Self {
        Self::new(
            ErrorKind::Validation,
            format!("request rejected by content policy: contains {}", rule),
        )
    }

    /// The caller cancelled the call
    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Timeout, "request was cancelled").with_retryable(false)
    }

    /// The overall request deadline passed
    pub fn deadline_exceeded(deadline: Duration) -> Self {
        Self::new(
            ErrorKind::Timeout,
            format!("request did not complete within {:?}", deadline),
        )
        .with_retryable(false)
    }

    /// No candidate provider could serve the call
    pub fn exhausted(failures: Vec<ProviderFailure>) -> Self {
        let message = if failures.is_empty() {
            "no providers are configured for this request".to_string()
        } else {
            let tried: Vec<String> = failures
                .iter()
                .map(|f| format!("{} ({})", f.provider, f.kind))
                .collect();
            format!("all providers failed. Tried: {}", tried.join(", "))
        };
        Self {
            failures,
            ..Self::new(ErrorKind::AllProvidersExhausted, message)
        }
        .with_retryable(false)
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Attach sanitized raw provider detail
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Mark the failure as a rejected credential
    pub fn with_auth_failure(mut self) -> Self {
        self.auth_failure = true;
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// Whether the engine may attempt the same provider again
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// Server-supplied minimum wait before the next attempt
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    /// Per-provider last failures, populated for `AllProvidersExhausted`
    pub fn failures(&self) -> &[ProviderFailure] {
        &self.failures
    }

    /// Sanitized provider detail for operator diagnostics
    pub fn diagnostics(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn is_rate_limit(&self) -> bool {
        self.kind == ErrorKind::RateLimit
    }

    pub fn is_server_error(&self) -> bool {
        self.kind == ErrorKind::ServerError
    }

    pub fn is_client_error(&self) -> bool {
        self.kind == ErrorKind::ClientError
    }

    /// The provider rejected the configured credentials (401/403)
    pub fn is_auth_error(&self) -> bool {
        self.auth_failure
    }

    /// Caused by the request itself; offering a retry will not help
    pub fn is_user_error(&self) -> bool {
        matches!(self.kind, ErrorKind::Validation | ErrorKind::ClientError)
    }

    /// Transient; the user may try again later
    pub fn is_temporary(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::RateLimit
                | ErrorKind::ServerError
                | ErrorKind::Network
                | ErrorKind::Timeout
                | ErrorKind::AllProvidersExhausted
        )
    }
}

impl UnifiedError for OrchestrationError {
    fn error_code(&self) -> &str {
        self.kind.code()
    }

    fn message(&self) -> &str {
        &self.message
    }

    fn context(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    fn is_retryable(&self) -> bool {
        self.retryable
    }
}

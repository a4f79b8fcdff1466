//! User-friendly error messages
//!
//! Maps classified orchestration failures to a title, an explanation and
//! suggested actions for the writer-facing surface.

use super::orchestration::{ErrorKind, OrchestrationError};

/// Error category for user-facing messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The request itself was invalid
    InvalidRequest,
    /// A provider rejected the configured credentials
    Authentication,
    /// Rate limiting / quota exceeded
    RateLimit,
    /// Provider-side failures
    ServiceUnavailable,
    /// Network connectivity issues
    Network,
    /// Deadlines and cancellation
    Timeout,
}

impl ErrorCategory {
    /// Get a user-friendly category name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "Invalid Request",
            Self::Authentication => "Authentication Error",
            Self::RateLimit => "Rate Limit Exceeded",
            Self::ServiceUnavailable => "AI Service Unavailable",
            Self::Network => "Network Error",
            Self::Timeout => "Timed Out",
        }
    }
}

/// User-friendly error information
#[derive(Debug, Clone)]
pub struct UserFriendlyError {
    pub category: ErrorCategory,
    pub title: String,
    pub message: String,
    pub suggestions: Vec<String>,
    /// Whether the UI should offer a "try again" action
    pub retry_offered: bool,
    pub error_code: String,
}

impl UserFriendlyError {
    pub fn new(
        category: ErrorCategory,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            title: title.into(),
            message: message.into(),
            suggestions: Vec::new(),
            retry_offered: false,
            error_code: String::new(),
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_retry(mut self, retry_offered: bool) -> Self {
        self.retry_offered = retry_offered;
        self
    }

    pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = code.into();
        self
    }

    /// Format the error for display
    pub fn format_display(&self) -> String {
        let mut output = format!(
            "{}: {}\n\n{}",
            self.category.display_name(),
            self.title,
            self.message
        );

        if !self.suggestions.is_empty() {
            output.push_str("\n\nSuggested actions:");
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("\n  {}. {}", i + 1, suggestion));
            }
        }

        output
    }
}

impl From<&OrchestrationError> for UserFriendlyError {
    fn from(error: &OrchestrationError) -> Self {
        let provider = error.provider().unwrap_or("the AI provider");
        let friendly = if error.is_auth_error() {
            UserFriendlyError::new(
                ErrorCategory::Authentication,
                "Credentials rejected",
                format!("{} did not accept the configured API key.", provider),
            )
            .with_suggestion("Check that the API key for this provider is set and still valid")
            .with_suggestion("Rotate the key and reload providers")
        } else {
            match error.kind() {
                ErrorKind::Validation => UserFriendlyError::new(
                    ErrorCategory::InvalidRequest,
                    "Request not sent",
                    error.message(),
                )
                .with_suggestion("Shorten or edit the text and try again"),
                ErrorKind::ClientError => UserFriendlyError::new(
                    ErrorCategory::InvalidRequest,
                    "Request rejected",
                    error.message(),
                )
                .with_suggestion("Adjust the request options (model, length, temperature)"),
                ErrorKind::RateLimit => UserFriendlyError::new(
                    ErrorCategory::RateLimit,
                    "Too many requests",
                    error.message(),
                )
                .with_suggestion("Wait a moment before asking again"),
                ErrorKind::ServerError => UserFriendlyError::new(
                    ErrorCategory::ServiceUnavailable,
                    "Provider error",
                    error.message(),
                )
                .with_suggestion("Try again in a few minutes"),
                ErrorKind::Network => UserFriendlyError::new(
                    ErrorCategory::Network,
                    "Connection failed",
                    error.message(),
                )
                .with_suggestion("Check your internet connection")
                .with_suggestion("Start the local model to keep working offline"),
                ErrorKind::Timeout => UserFriendlyError::new(
                    ErrorCategory::Timeout,
                    "No answer in time",
                    error.message(),
                )
                .with_suggestion("Try a shorter prompt or a smaller max token count"),
                ErrorKind::AllProvidersExhausted => UserFriendlyError::new(
                    ErrorCategory::ServiceUnavailable,
                    "AI assistance is unavailable right now",
                    error.message(),
                )
                .with_suggestion("Try again later")
                .with_suggestion("Run `quill health` to see which providers are failing"),
            }
        };

        friendly
            .with_retry(error.is_temporary())
            .with_error_code(error.kind().code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_get_their_own_category() {
        let err = OrchestrationError::new(ErrorKind::ClientError, "claude rejected the API key")
            .with_provider("claude")
            .with_status(401)
            .with_auth_failure();
        let friendly = UserFriendlyError::from(&err);
        assert_eq!(friendly.category, ErrorCategory::Authentication);
        assert!(!friendly.retry_offered);
        assert!(friendly.message.contains("claude"));
    }

    #[test]
    fn exhausted_offers_retry() {
        let err = OrchestrationError::exhausted(Vec::new());
        let friendly = UserFriendlyError::from(&err);
        assert_eq!(friendly.category, ErrorCategory::ServiceUnavailable);
        assert!(friendly.retry_offered);
        assert_eq!(friendly.error_code, "QUILL_ALL_PROVIDERS_EXHAUSTED");
    }

    #[test]
    fn format_display_numbers_suggestions() {
        let err = OrchestrationError::new(ErrorKind::Network, "could not reach openai");
        let text = UserFriendlyError::from(&err).format_display();
        assert!(text.starts_with("Network Error: Connection failed"));
        assert!(text.contains("  1. Check your internet connection"));
        assert!(text.contains("  2. Start the local model"));
    }
}

//! Failure classification
//!
//! Maps an adapter's `RawProviderError` onto the shared taxonomy. The retry
//! decision is made here and nowhere else.

use super::adapters::error_utils::sanitize_provider_error_text;
use super::provider::RawProviderError;
use crate::error::{ErrorKind, OrchestrationError};

pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn classify(raw: &RawProviderError, provider: &str) -> OrchestrationError {
        let error = match raw {
            RawProviderError::Http {
                status,
                retry_after,
                ..
            } => Self::classify_status(*status, provider).with_retry_after(*retry_after),
            RawProviderError::Connect(_) => OrchestrationError::new(
                ErrorKind::Network,
                format!("could not connect to {}", provider),
            ),
            RawProviderError::Dns(_) => OrchestrationError::new(
                ErrorKind::Network,
                format!("could not resolve the host for {}", provider),
            ),
            RawProviderError::Reset(_) | RawProviderError::Transport(_) => {
                OrchestrationError::new(
                    ErrorKind::Network,
                    format!("connection to {} was interrupted", provider),
                )
            }
            RawProviderError::Timeout(after) => OrchestrationError::new(
                ErrorKind::Timeout,
                format!("{} did not respond within {:?}", provider, after),
            ),
            RawProviderError::Decode(_) => OrchestrationError::new(
                ErrorKind::ServerError,
                format!("{} returned a response that could not be read", provider),
            ),
            RawProviderError::InvalidRequest(_) => OrchestrationError::new(
                ErrorKind::ClientError,
                format!("request for {} could not be built", provider),
            ),
        };

        let detail = match raw {
            RawProviderError::Http { status, body, .. } => {
                format!("HTTP {}: {}", status, sanitize_provider_error_text(body))
            }
            other => sanitize_provider_error_text(&other.to_string()),
        };

        error.with_provider(provider).with_detail(detail)
    }

    fn classify_status(status: u16, provider: &str) -> OrchestrationError {
        match status {
            400 => OrchestrationError::new(
                ErrorKind::ClientError,
                format!("{} rejected the request as malformed (HTTP 400)", provider),
            ),
            401 | 403 => OrchestrationError::new(
                ErrorKind::ClientError,
                format!("{} rejected the credentials (HTTP {})", provider, status),
            )
            .with_auth_failure(),
            408 => OrchestrationError::new(
                ErrorKind::Timeout,
                format!("{} timed out waiting for the request (HTTP 408)", provider),
            ),
            429 => OrchestrationError::new(
                ErrorKind::RateLimit,
                format!("{} rate limited the request (HTTP 429)", provider),
            ),
            500..=599 => OrchestrationError::new(
                ErrorKind::ServerError,
                format!("{} returned a server error (HTTP {})", provider, status),
            ),
            400..=499 => OrchestrationError::new(
                ErrorKind::ClientError,
                format!("{} rejected the request (HTTP {})", provider, status),
            ),
            // Anything else reaching here was not a success; treat as upstream failure.
            _ => OrchestrationError::new(
                ErrorKind::ServerError,
                format!("{} returned unexpected HTTP status {}", provider, status),
            ),
        }
        .with_status(status)
    }
}

//! LLM error types

use std::time::Duration;
use thiserror::Error;

use super::retry::is_retryable_status;

/// Failures of a completion call, before any worker or resolver turns them
/// into user-facing text
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("API key not found: set the {0} environment variable")]
    MissingApiKey(String),

    #[error("Unknown LLM provider: '{0}'. Supported: anthropic, openai")]
    UnknownProvider(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// Whether a later attempt could succeed; configuration mistakes never do
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimited { .. } | LlmError::Network(_) => true,
            LlmError::ApiError { status, .. } => is_retryable_status(*status),
            LlmError::InvalidResponse(_)
            | LlmError::MissingApiKey(_)
            | LlmError::UnknownProvider(_)
            | LlmError::Json(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(
            LlmError::RateLimited {
                retry_after: Duration::from_secs(60)
            }
            .is_retryable()
        );
        assert!(
            LlmError::ApiError {
                status: 503,
                message: "Unavailable".to_string()
            }
            .is_retryable()
        );
        assert!(
            LlmError::ApiError {
                status: 529,
                message: "Overloaded".to_string()
            }
            .is_retryable()
        );
        assert!(
            !LlmError::ApiError {
                status: 401,
                message: "Unauthorized".to_string()
            }
            .is_retryable()
        );
        assert!(!LlmError::MissingApiKey("ANTHROPIC_API_KEY".to_string()).is_retryable());
        assert!(!LlmError::UnknownProvider("azure".to_string()).is_retryable());
    }

    #[test]
    fn test_error_messages() {
        let err = LlmError::MissingApiKey("OPENAI_API_KEY".to_string());
        assert_eq!(err.to_string(), "API key not found: set the OPENAI_API_KEY environment variable");

        let err = LlmError::UnknownProvider("azure".to_string());
        assert!(err.to_string().contains("Supported: anthropic, openai"));
    }
}

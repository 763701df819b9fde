//! LLM client module for archpilot
//!
//! Provides provider-agnostic completion requests used by the stage workers
//! and the LLM-backed intent resolver.

use std::sync::Arc;

use tracing::debug;

mod anthropic;
pub mod client;
mod error;
mod openai;
mod retry;
mod types;

pub use anthropic::AnthropicClient;
pub use client::LlmClient;
pub use error::LlmError;
pub use openai::OpenAIClient;
pub use types::{
    CompletionRequest, CompletionResponse, Message, Role, StopReason, TokenUsage, ToolCall, ToolDefinition,
};

use crate::config::LlmConfig;

/// Create an LLM client based on the provider specified in config
///
/// Supports "anthropic" and "openai" providers.
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, model = %config.model, "create_client: called");
    match config.provider.as_str() {
        "anthropic" => {
            debug!("create_client: creating Anthropic client");
            Ok(Arc::new(AnthropicClient::from_config(config)?))
        }
        "openai" => {
            debug!("create_client: creating OpenAI client");
            Ok(Arc::new(OpenAIClient::from_config(config)?))
        }
        other => {
            debug!(provider = %other, "create_client: unknown provider");
            Err(LlmError::UnknownProvider(other.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_create_client_unknown_provider() {
        let config = LlmConfig {
            provider: "azure".to_string(),
            ..LlmConfig::default()
        };
        let result = create_client(&config);
        assert!(matches!(result, Err(LlmError::UnknownProvider(p)) if p == "azure"));
    }

    #[test]
    #[serial]
    fn test_create_client_missing_key() {
        let config = LlmConfig {
            api_key_env: "ARCHPILOT_TEST_MISSING_KEY".to_string(),
            ..LlmConfig::default()
        };
        unsafe { std::env::remove_var("ARCHPILOT_TEST_MISSING_KEY") };
        let result = create_client(&config);
        assert!(matches!(result, Err(LlmError::MissingApiKey(_))));
    }

    #[test]
    #[serial]
    fn test_create_client_openai() {
        let config = LlmConfig {
            provider: "openai".to_string(),
            api_key_env: "ARCHPILOT_TEST_OPENAI_KEY".to_string(),
            ..LlmConfig::default()
        };
        unsafe { std::env::set_var("ARCHPILOT_TEST_OPENAI_KEY", "sk-test") };
        assert!(create_client(&config).is_ok());
        unsafe { std::env::remove_var("ARCHPILOT_TEST_OPENAI_KEY") };
    }
}

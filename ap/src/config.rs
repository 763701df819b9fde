//! archpilot configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::intent::Strategy;

/// Project-local config file name
pub const LOCAL_CONFIG_FILE: &str = ".archpilot.yml";

/// Main archpilot configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level used when no `--log-level` flag is given
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Pipeline limits and worker behavior
    pub pipeline: PipelineConfig,

    /// Intent resolver configuration
    pub resolver: ResolverConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Only LLM-backed commands need this; rule-based classification and
    /// prompt printing work without an API key.
    pub fn validate(&self) -> Result<()> {
        debug!("Config::validate: called");
        if self.pipeline.max_hops == 0 {
            return Err(eyre::eyre!("pipeline.max-hops must be at least 1"));
        }
        self.llm.get_api_key()?;
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        debug!(?config_path, "Config::load: called");
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        if let Some(user_config) = Self::user_config_path()
            && user_config.exists()
        {
            match Self::load_from_file(&user_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// `<config_dir>/archpilot/archpilot.yml`
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("archpilot").join("archpilot.yml"))
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name ("anthropic" or "openai")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Sampling temperature
    pub temperature: Option<f32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 4096,
            timeout_ms: 300_000,
            temperature: Some(0.2),
        }
    }
}

impl LlmConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        debug!(api_key_env = %self.api_key_env, "LlmConfig::get_api_key: called");
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable.",
                self.api_key_env
            )),
        }
    }
}

/// Pipeline limits and worker behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Hop ceiling per human turn
    #[serde(rename = "max-hops")]
    pub max_hops: usize,

    /// Character budget for recent worker context
    #[serde(rename = "context-max-chars")]
    pub context_max_chars: usize,

    /// Per-call worker timeout in milliseconds
    #[serde(rename = "worker-timeout-ms")]
    pub worker_timeout_ms: u64,

    /// Rewrite the requirement into neutral technical language before the
    /// architecture stage
    #[serde(rename = "sanitize-requirements")]
    pub sanitize_requirements: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_hops: 25,
            context_max_chars: crate::curator::DEFAULT_CONTEXT_MAX_CHARS,
            worker_timeout_ms: 300_000,
            sanitize_requirements: true,
        }
    }
}

/// Intent resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Backing strategy
    pub strategy: Strategy,

    /// Extra attempts after a failed classification
    pub retries: u32,

    /// Per-attempt timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Hybrid,
            retries: 1,
            timeout_ms: 30_000,
        }
    }
}

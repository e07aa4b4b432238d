//! Server configuration loaded from TOML.

use crate::llm_client::{LlmConfig, LlmProvider};
use derive_getters::Getters;
use derive_more::{Display, Error};
use mafai_game::DisconnectPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Configuration for the game server.
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host for HTTP mode.
    #[serde(default = "default_bind_host")]
    bind_host: String,

    /// Port for HTTP mode.
    #[serde(default = "default_port")]
    port: u16,

    /// Seed for every session's random source; unset draws from the OS.
    #[serde(default)]
    rng_seed: Option<u64>,

    /// What a mid-game disconnect does.
    #[serde(default)]
    disconnect_policy: DisconnectPolicy,

    /// Narration settings.
    #[serde(default)]
    narrator: NarratorConfig,
}

/// Narration collaborator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarratorConfig {
    /// Call an LLM for narration; otherwise use the fixed sentences.
    #[serde(default)]
    enabled: bool,

    /// LLM provider.
    #[serde(default = "default_provider")]
    provider: LlmProvider,

    /// Model name; defaults per provider.
    #[serde(default)]
    model: Option<String>,

    /// Maximum tokens per narration.
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,
}

fn default_bind_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_provider() -> LlmProvider {
    LlmProvider::OpenAI
}

fn default_max_tokens() -> u32 {
    300
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: default_bind_host(),
            port: default_port(),
            rng_seed: None,
            disconnect_policy: DisconnectPolicy::default(),
            narrator: NarratorConfig::default(),
        }
    }
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            model: None,
            max_tokens: default_max_tokens(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        info!(
            port = config.port,
            narrator = config.narrator.enabled,
            "Config loaded successfully"
        );
        Ok(config)
    }

    /// Loads the file if it exists, otherwise returns the defaults.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            warn!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Returns a copy with a fixed random seed.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Returns a copy with a different disconnect policy.
    pub fn with_disconnect_policy(mut self, policy: DisconnectPolicy) -> Self {
        self.disconnect_policy = policy;
        self
    }

    /// Returns a copy with the given bind address.
    pub fn with_bind(mut self, host: String, port: u16) -> Self {
        self.bind_host = host;
        self.port = port;
        self
    }
}

impl NarratorConfig {
    /// True if LLM narration is switched on.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Configured provider.
    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    /// Effective model name.
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    /// Maximum tokens per narration.
    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// Creates LLM configuration from this narrator config.
    /// Requires the provider's API key in the environment.
    #[instrument(skip(self), fields(provider = ?self.provider, model = %self.model()))]
    pub fn create_llm_config(&self) -> Result<LlmConfig, ConfigError> {
        debug!("Creating LLM config");

        let var = self.provider.api_key_var();
        let api_key = std::env::var(var)
            .map_err(|_| ConfigError::new(format!("{} environment variable not set", var)))?;

        Ok(LlmConfig::new(
            self.provider,
            api_key,
            self.model().to_string(),
            self.max_tokens,
        ))
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

//! Configuration management
//!
//! This module handles loading, validation, and management of the Atlas
//! configuration. Configuration is stored in TOML format at
//! ~/.atlas/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level
//! - **llm**: Chat provider settings and preferences
//! - **agents**: Knowledge-agent endpoints and request timeout
//! - **server**: HTTP bind address and port
//! - **store**: Conversation store capacity
//!
//! API keys are never stored in the config file. Providers read them from
//! the environment (`ATLAS_GEMINI_API_KEY`, `ATLAS_OPENAI_API_KEY`).
//!
//! # Examples
//!
//! ```no_run
//! use atlas_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load configuration from default location
//! let config = Config::load_or_create()?;
//!
//! println!("Default provider: {}", config.llm.default_provider);
//! println!("Listening on {}:{}", config.server.bind, config.server.port);
//! # Ok(())
//! # }
//! ```

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
///
/// This structure represents the complete Atlas configuration loaded from
/// ~/.atlas/config.toml. Every field has a serde default, so a partial
/// file (or an empty one) is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Chat provider configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Knowledge-agent endpoints
    #[serde(default)]
    pub agents: AgentsConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Conversation store settings
    #[serde(default)]
    pub store: StoreConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Chat provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Default chat provider (gemini, openai)
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Per-call timeout in seconds when waiting on the provider
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Gemini provider settings
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// OpenAI provider settings
    #[serde(default)]
    pub openai: OpenAiConfig,
}

/// Gemini provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Base URL for the Gemini API
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_gemini_model")]
    pub model: String,
    // Note: API key comes from ATLAS_GEMINI_API_KEY, not from config
}

/// OpenAI provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Base URL for the OpenAI API
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_openai_model")]
    pub model: String,
    // Note: API key comes from ATLAS_OPENAI_API_KEY, not from config
}

/// Knowledge-agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    /// Wikidata SPARQL endpoint
    #[serde(default = "default_wikidata_endpoint")]
    pub wikidata_endpoint: String,

    /// Wikipedia REST summary endpoint
    #[serde(default = "default_wikipedia_endpoint")]
    pub wikipedia_endpoint: String,

    /// Nominatim search endpoint
    #[serde(default = "default_nominatim_endpoint")]
    pub nominatim_endpoint: String,

    /// Open-Meteo forecast endpoint
    #[serde(default = "default_open_meteo_endpoint")]
    pub open_meteo_endpoint: String,

    /// Per-request timeout in seconds for all agents
    #[serde(default = "default_agent_timeout")]
    pub timeout_secs: u64,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Conversation store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Maximum number of conversations held in memory before the
    /// least-recently-updated ones are evicted
    #[serde(default = "default_max_conversations")]
    pub max_conversations: usize,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_provider() -> String {
    "gemini".to_string()
}

fn default_llm_timeout() -> u64 {
    30
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_wikidata_endpoint() -> String {
    "https://query.wikidata.org/sparql".to_string()
}

fn default_wikipedia_endpoint() -> String {
    "https://en.wikipedia.org/api/rest_v1/page/summary".to_string()
}

fn default_nominatim_endpoint() -> String {
    "https://nominatim.openstreetmap.org/search".to_string()
}

fn default_open_meteo_endpoint() -> String {
    "https://api.open-meteo.com/v1/forecast".to_string()
}

fn default_agent_timeout() -> u64 {
    10
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_max_conversations() -> usize {
    100
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            timeout_secs: default_llm_timeout(),
            gemini: GeminiConfig::default(),
            openai: OpenAiConfig::default(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: default_gemini_base_url(),
            model: default_gemini_model(),
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_openai_model(),
        }
    }
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            wikidata_endpoint: default_wikidata_endpoint(),
            wikipedia_endpoint: default_wikipedia_endpoint(),
            nominatim_endpoint: default_nominatim_endpoint(),
            open_meteo_endpoint: default_open_meteo_endpoint(),
            timeout_secs: default_agent_timeout(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_conversations: default_max_conversations(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            core: CoreConfig::default(),
            llm: LlmConfig::default(),
            agents: AgentsConfig::default(),
            server: ServerConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.atlas/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default
    /// configuration file and returns it. Validates the configuration
    /// after loading.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or written, TOML
    /// parsing fails, or validation fails.
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, TOML parsing fails,
    /// or validation fails.
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let config = Self::default();
        config.validate()?;

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.atlas/config.toml)
    fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".atlas").join("config.toml"))
    }

    /// Validate the configuration
    ///
    /// Checks that the log level is known, the provider name is one of
    /// the supported providers, the endpoints parse as URLs, and the
    /// numeric limits are sane.
    pub fn validate(&self) -> Result<(), EngineError> {
        const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];
        if !LOG_LEVELS.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Unknown log level '{}' (expected one of: {})",
                self.core.log_level,
                LOG_LEVELS.join(", ")
            )));
        }

        const PROVIDERS: &[&str] = &["gemini", "openai"];
        if !PROVIDERS.contains(&self.llm.default_provider.as_str()) {
            return Err(EngineError::Config(format!(
                "Unknown chat provider '{}' (expected one of: {})",
                self.llm.default_provider,
                PROVIDERS.join(", ")
            )));
        }

        for (name, url) in [
            ("wikidata_endpoint", &self.agents.wikidata_endpoint),
            ("wikipedia_endpoint", &self.agents.wikipedia_endpoint),
            ("nominatim_endpoint", &self.agents.nominatim_endpoint),
            ("open_meteo_endpoint", &self.agents.open_meteo_endpoint),
        ] {
            reqwest::Url::parse(url).map_err(|e| {
                EngineError::Config(format!("Invalid URL for agents.{}: {}", name, e))
            })?;
        }

        if self.agents.timeout_secs == 0 || self.llm.timeout_secs == 0 {
            return Err(EngineError::Config(
                "Timeouts must be at least 1 second".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(EngineError::Config(
                "server.port must be non-zero".to_string(),
            ));
        }

        if self.store.max_conversations == 0 {
            return Err(EngineError::Config(
                "store.max_conversations must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

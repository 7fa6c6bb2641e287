//! DataBot configuration management
//!
//! Configuration is a TOML document with four sections. Every field has a
//! default, so an empty file (or no file) is a valid configuration:
//!
//! ```toml
//! [memory]
//! capacity = 20
//! context_chars = 500
//! recent_pairs = 3
//!
//! [llm]
//! enabled = true
//! model = "mistral-small-latest"
//! api_key_env = "MISTRAL_API_KEY"
//!
//! [sales]
//! low_stock_threshold = 50
//!
//! [server]
//! port = 18800
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main DataBot configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataBotConfig {
    /// Conversation memory configuration
    pub memory: MemoryConfig,

    /// Language model configuration
    pub llm: LlmConfig,

    /// Sales data configuration
    pub sales: SalesConfig,

    /// HTTP server configuration
    pub server: ServerConfig,
}

impl DataBotConfig {
    /// Read and validate a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Reject values the rest of the crate cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.memory.capacity == 0 {
            return Err(Error::Config("memory.capacity must be greater than zero".to_string()));
        }
        if self.memory.recent_pairs == 0 {
            return Err(Error::Config("memory.recent_pairs must be at least 1".to_string()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(Error::Config(format!(
                "llm.temperature must be within 0.0..=2.0, got {}",
                self.llm.temperature
            )));
        }
        if self.llm.timeout_secs == 0 {
            return Err(Error::Config("llm.timeout_secs must be greater than zero".to_string()));
        }
        if self.sales.low_stock_threshold == 0 {
            return Err(Error::Config(
                "sales.low_stock_threshold must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Conversation memory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Maximum number of stored entries (two per exchange)
    pub capacity: usize,

    /// Character budget for the prompt context
    pub context_chars: usize,

    /// Number of exchanges shown by the history view
    pub recent_pairs: usize,

    /// Load the snapshot at startup and save it after changes
    pub persist: bool,

    /// Snapshot file
    pub snapshot_path: PathBuf,
}

impl MemoryConfig {
    /// Snapshot file when persistence is enabled.
    pub fn snapshot(&self) -> Option<&Path> {
        self.persist.then_some(self.snapshot_path.as_path())
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            capacity: crate::memory::DEFAULT_CAPACITY,
            context_chars: 500,
            recent_pairs: 3,
            persist: true,
            snapshot_path: default_data_dir().join("memory.json"),
        }
    }
}

/// Language model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Route questions through the hosted model when a key is available
    pub enabled: bool,

    /// Model identifier
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// API base URL (OpenAI-compatible chat completions)
    pub base_url: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: "mistral-small-latest".to_string(),
            temperature: 0.1,
            base_url: "https://api.mistral.ai/v1".to_string(),
            api_key_env: "MISTRAL_API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

impl LlmConfig {
    /// API key from the configured environment variable, if set and non-empty.
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

/// Sales data configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SalesConfig {
    /// CSV file to read; `None` uses the built-in demo table
    pub data_file: Option<PathBuf>,

    /// Stock level under which a product is reported as low
    pub low_stock_threshold: u32,
}

impl Default for SalesConfig {
    fn default() -> Self {
        Self {
            data_file: None,
            low_stock_threshold: crate::sales::DEFAULT_LOW_STOCK_THRESHOLD,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 18800,
            cors_origins: Vec::new(),
        }
    }
}

/// Default data directory (~/.databot/)
pub fn default_data_dir() -> PathBuf {
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".databot")
}

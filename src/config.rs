use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::error::{JimakuError, Result};

fn default_timeout_secs() -> u64 {
    300
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_batch_delay_ms() -> u64 {
    500
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub generation: GenerationConfig,
    pub translate: TranslateConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Base URL of the generateContent API
    pub endpoint: String,
    /// Model used for translation and context analysis
    pub model: String,
    /// API key; falls back to GEMINI_API_KEY / GOOGLE_API_KEY when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateConfig {
    /// Source language, as written into the prompt (e.g. "English")
    pub source_language: String,
    /// Target language, as written into the prompt (e.g. "Korean")
    pub target_language: String,
    /// Character budget per batch
    pub chunk_size: usize,
    /// Ask the model for deeper deliberation before translating
    #[serde(default)]
    pub reasoning: bool,
    /// Retries after the first attempt of a batch
    pub max_retries: u32,
    /// Fixed backoff between attempts of the same batch
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Pause between consecutive batches
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            source_language: "English".to_string(),
            target_language: "Korean".to_string(),
            chunk_size: 1500,
            reasoning: false,
            max_retries: 1,
            retry_delay_ms: default_retry_delay_ms(),
            batch_delay_ms: default_batch_delay_ms(),
        }
    }
}

impl GenerationConfig {
    /// Resolve the API key from the config file or the environment
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            return Ok(key.clone());
        }

        ["GEMINI_API_KEY", "GOOGLE_API_KEY"]
            .iter()
            .find_map(|name| std::env::var(name).ok().filter(|v| !v.trim().is_empty()))
            .ok_or_else(|| JimakuError::Config(
                "No API key configured. Set generation.api_key or GEMINI_API_KEY".to_string()
            ))
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| JimakuError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| JimakuError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| JimakuError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| JimakuError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.translate.chunk_size == 0 {
            return Err(JimakuError::Config("chunk_size must be positive".to_string()));
        }
        if self.translate.source_language.trim().is_empty()
            || self.translate.target_language.trim().is_empty()
        {
            return Err(JimakuError::Config("source and target languages are required".to_string()));
        }
        Ok(())
    }
}

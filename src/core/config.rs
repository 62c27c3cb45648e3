//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Default provider endpoint (Google Translate web client API)
pub const DEFAULT_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

/// Configuration for translator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    pub endpoint: String,
    pub source_lang: String,
    pub target_lang: String,
    pub batch_size: usize,
    pub chunk_delay_ms: u64,
    pub unit_delay_ms: u64,
    pub office_per_unit: bool,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub timeout_ms: u64,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            source_lang: "auto".to_string(),
            target_lang: "id".to_string(),
            batch_size: 20,
            chunk_delay_ms: 1000,
            unit_delay_ms: 500,
            office_per_unit: false,
            max_retries: 3,
            retry_delay_ms: 1000,
            timeout_ms: 30000,
        }
    }
}

/// Read `key` from the environment, falling back to `default` when unset
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid value for {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}

impl TranslatorConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let config = Self {
            endpoint: env_or("TRANSLATE_ENDPOINT", defaults.endpoint)?,
            source_lang: env_or("SOURCE_LANG", defaults.source_lang)?,
            target_lang: env_or("TARGET_LANG", defaults.target_lang)?,
            batch_size: env_or("BATCH_SIZE", defaults.batch_size)?,
            chunk_delay_ms: env_or("CHUNK_DELAY_MS", defaults.chunk_delay_ms)?,
            unit_delay_ms: env_or("UNIT_DELAY_MS", defaults.unit_delay_ms)?,
            office_per_unit: env_or("OFFICE_PER_UNIT", defaults.office_per_unit)?,
            max_retries: env_or("MAX_RETRIES", defaults.max_retries)?,
            retry_delay_ms: env_or("RETRY_DELAY_MS", defaults.retry_delay_ms)?,
            timeout_ms: env_or("REQUEST_TIMEOUT_MS", defaults.timeout_ms)?,
        };

        info!("Loaded configuration from environment");
        Ok(config)
    }

    /// Load from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.endpoint.is_empty() {
            return Err(anyhow::anyhow!("API endpoint is required"));
        }

        if self.target_lang.trim().is_empty() {
            return Err(anyhow::anyhow!("target language is required"));
        }

        if self.batch_size == 0 {
            return Err(anyhow::anyhow!("batch_size must be greater than 0"));
        }

        Ok(())
    }

    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }

    pub fn unit_delay(&self) -> Duration {
        Duration::from_millis(self.unit_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, TriageError};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub unsubscribe: UnsubscribeConfig,
    #[serde(default)]
    pub ai: AiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent(),
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnsubscribeConfig {
    #[serde(default = "default_unsubscribe_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for UnsubscribeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_unsubscribe_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Explicit provider selection. Keys are optional; the local rule-based
/// fallback is on by default and keeps the chain from ever coming up
/// empty-handed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub gemini_key: Option<String>,
    #[serde(default)]
    pub hugging_face_key: Option<String>,
    #[serde(default = "default_include_local")]
    pub include_local: bool,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            gemini_key: None,
            hugging_face_key: None,
            include_local: default_include_local(),
        }
    }
}

fn default_max_concurrent() -> usize {
    40
}

fn default_page_size() -> u32 {
    100
}

fn default_unsubscribe_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("inbox-triage/{}", env!("CARGO_PKG_VERSION"))
}

fn default_include_local() -> bool {
    true
}

impl Config {
    pub async fn load(path: &Path) -> Result<Self> {
        // If file doesn't exist, return default config with warning
        if !path.exists() {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| TriageError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| TriageError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                TriageError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| TriageError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        tokio::fs::write(path, content)
            .await
            .map_err(|e| TriageError::ConfigError(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.gateway.max_concurrent_requests == 0 {
            return Err(TriageError::ConfigError(
                "gateway.max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        if self.gateway.max_concurrent_requests > 50 {
            return Err(TriageError::ConfigError(
                "gateway.max_concurrent_requests cannot exceed 50 (to stay under provider rate limits)"
                    .to_string(),
            ));
        }

        if self.gateway.page_size == 0 || self.gateway.page_size > 500 {
            return Err(TriageError::ConfigError(
                "gateway.page_size must be between 1 and 500".to_string(),
            ));
        }

        if self.unsubscribe.timeout_secs == 0 {
            return Err(TriageError::ConfigError(
                "unsubscribe.timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.unsubscribe.timeout_secs > 60 {
            return Err(TriageError::ConfigError(
                "unsubscribe.timeout_secs cannot exceed 60".to_string(),
            ));
        }

        if self.ai.gemini_key.is_none()
            && self.ai.hugging_face_key.is_none()
            && !self.ai.include_local
        {
            return Err(TriageError::ConfigError(
                "ai: no providers configured; supply a key or enable include_local".to_string(),
            ));
        }

        Ok(())
    }
}

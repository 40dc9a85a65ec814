use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Error;
use crate::provider::{LlmSettings, Provider};
use crate::utils::cache::{default_cache_dir, Cache, KeyMode};

/// Environment variable that selects the provider
pub const PROVIDER_ENV: &str = "LLM_PROVIDER";

/// Which model answers the question
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider to use (google, openai)
    #[serde(default)]
    pub provider: Provider,
    /// Model identifier, the provider default when unset
    #[serde(default)]
    pub model: Option<String>,
    /// API base URL, the provider default when unset
    #[serde(default)]
    pub base_url: Option<String>,
    /// Request timeout in seconds, no timeout when unset
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Where segments are cached
#[derive(Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory for extracted segments
    #[serde(default = "default_cache_dir")]
    pub directory: PathBuf,
    /// Add a hash of the source content to every cache key
    #[serde(default)]
    pub fingerprint: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranscoderConfig {
    /// Hide ffmpeg's own output
    #[serde(default = "default_quiet")]
    pub quiet: bool,
}

/// Main configuration structure for the Clipask application
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub transcoder: TranscoderConfig,
}

fn default_quiet() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: default_cache_dir(),
            fingerprint: false,
        }
    }
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            quiet: default_quiet(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    ///
    /// # Arguments
    /// * `path` - Path where the configuration will be saved
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let toml = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, toml).context("Failed to write config file")?;
        Ok(())
    }

    /// Load the file when given, defaults otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Apply `LLM_PROVIDER`, `GOOGLE_MODEL`, `OPENAI_MODEL` and
    /// `OPENAI_BASE_URL` on top of the file values
    ///
    /// # Arguments
    /// * `env` - Environment lookup, `std::env::var` in the binary
    pub fn merge_env<F>(&mut self, env: F) -> std::result::Result<(), Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = env(PROVIDER_ENV) {
            self.llm.provider = provider.parse()?;
        }

        let provider_config = self.llm.provider.config();
        if let Some(model) = env(provider_config.model_env) {
            self.llm.model = Some(model);
        }
        if let Some(base_url) = provider_config.base_url_env.and_then(|name| env(name)) {
            self.llm.base_url = Some(base_url);
        }

        Ok(())
    }

    /// Resolve the provider selection into settings, reading the API key
    /// from the environment. A missing key is fatal.
    pub fn llm_settings<F>(&self, env: F) -> std::result::Result<LlmSettings, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = self.llm.provider;
        let defaults = provider.config();

        let api_key = env(defaults.key_env)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                Error::Config(format!(
                    "Please set {} in the environment or .env file",
                    defaults.key_env
                ))
            })?;

        let model = self
            .llm
            .model
            .clone()
            .unwrap_or_else(|| defaults.model.to_string());
        if model.trim().is_empty() {
            return Err(Error::Config("Model identifier is empty".to_string()));
        }

        Ok(LlmSettings {
            provider,
            api_key,
            model,
            base_url: self
                .llm
                .base_url
                .clone()
                .unwrap_or_else(|| defaults.base_url.to_string()),
            timeout: self.llm.timeout_secs.map(Duration::from_secs),
        })
    }

    /// Build the segment cache described by this configuration
    pub fn cache(&self) -> Cache {
        let key_mode = if self.cache.fingerprint {
            KeyMode::Fingerprint
        } else {
            KeyMode::NameOnly
        };
        Cache::new(self.cache.directory.clone()).with_key_mode(key_mode)
    }
}

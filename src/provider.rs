use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::llm::{GoogleCapability, LlmCapability, OpenAiCapability};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Google,
    #[serde(rename = "openai")]
    OpenAiCompatible,
}

/// Defaults and environment variable names of a provider
pub struct ProviderConfig {
    pub model: &'static str,
    pub base_url: &'static str,
    pub key_env: &'static str,
    pub model_env: &'static str,
    pub base_url_env: Option<&'static str>,
}

impl Provider {
    pub fn config(&self) -> ProviderConfig {
        match self {
            Provider::Google => ProviderConfig {
                model: "gemini-2.0-flash",
                base_url: "https://generativelanguage.googleapis.com",
                key_env: "GOOGLE_API_KEY",
                model_env: "GOOGLE_MODEL",
                base_url_env: None,
            },
            Provider::OpenAiCompatible => ProviderConfig {
                model: "gpt-4o",
                base_url: "https://api.openai.com/v1",
                key_env: "OPENAI_API_KEY",
                model_env: "OPENAI_MODEL",
                base_url_env: Some("OPENAI_BASE_URL"),
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::OpenAiCompatible => "openai",
        }
    }

    /// Construct the capability for this provider
    pub fn build(&self, settings: &LlmSettings) -> Box<dyn LlmCapability> {
        match self {
            Provider::Google => Box::new(GoogleCapability::new(
                &settings.api_key,
                &settings.model,
                &settings.base_url,
                settings.timeout,
            )),
            Provider::OpenAiCompatible => Box::new(OpenAiCapability::new(
                &settings.api_key,
                &settings.model,
                &settings.base_url,
                settings.timeout,
            )),
        }
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "google" => Ok(Provider::Google),
            "openai" => Ok(Provider::OpenAiCompatible),
            other => Err(Error::Config(format!("Unsupported LLM provider: {}", other))),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fully resolved provider selection, credentials included
#[derive(Clone)]
pub struct LlmSettings {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Option<Duration>,
}

impl LlmSettings {
    pub fn build_capability(&self) -> Box<dyn LlmCapability> {
        self.provider.build(self)
    }
}

impl fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSettings")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(provider: Provider) -> LlmSettings {
        let config = provider.config();
        LlmSettings {
            provider,
            api_key: "secret".to_string(),
            model: config.model.to_string(),
            base_url: config.base_url.to_string(),
            timeout: None,
        }
    }

    #[test]
    fn test_parse_provider() {
        assert_eq!("google".parse::<Provider>().unwrap(), Provider::Google);
        assert_eq!(
            " OpenAI ".parse::<Provider>().unwrap(),
            Provider::OpenAiCompatible
        );
        assert!(matches!(
            "anthropic".parse::<Provider>(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_build_capability() {
        let google = settings(Provider::Google).build_capability();
        assert_eq!(google.name(), "Google");
        assert_eq!(google.model(), "gemini-2.0-flash");

        let openai = settings(Provider::OpenAiCompatible).build_capability();
        assert_eq!(openai.name(), "OpenAI");
        assert_eq!(openai.model(), "gpt-4o");
    }

    #[test]
    fn test_debug_redacts_key() {
        let debug = format!("{:?}", settings(Provider::Google));
        assert!(!debug.contains("secret"));
    }
}

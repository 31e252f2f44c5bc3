//! Engine configuration for the built-in capabilities
//!
//! The core itself needs no configuration; these settings construct the
//! HTTP-backed and model-backed capabilities. API keys come from the
//! environment, never from config files.

use serde::Deserialize;

/// Settings for the chat-completion capability
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

impl ModelConfig {
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok()
    }
}

/// Settings for the weather capability
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub base_url: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://wttr.in".to_string(),
        }
    }
}

/// Settings for the name-demographics capability
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DemographicsConfig {
    pub age_url: String,
    pub gender_url: String,
    pub timeout_secs: u64,
}

impl Default for DemographicsConfig {
    fn default() -> Self {
        Self {
            age_url: "https://api.agify.io".to_string(),
            gender_url: "https://api.genderize.io".to_string(),
            timeout_secs: 5,
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub model: ModelConfig,
    pub weather: WeatherConfig,
    pub demographics: DemographicsConfig,
}

impl EngineConfig {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

//! Provider configuration as it appears in config files.

use super::{CompletionOptions, ModelProvider};
use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Provider type (without runtime-specific data)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    #[serde(rename = "openai")]
    OpenAI,
    Gemini,
}

impl ProviderType {
    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            ProviderType::OpenAI => "OPENAI_API_KEY",
            ProviderType::Gemini => "GEMINI_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderType::OpenAI => "gpt-4o-mini",
            ProviderType::Gemini => "gemini-2.5-flash",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_type")]
    pub provider_type: ProviderType,

    #[serde(default)]
    pub model: String,

    /// Inline key. Prefer `api_key_env` outside of local experiments.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Name of the environment variable holding the key.
    #[serde(default)]
    pub api_key_env: Option<String>,

    #[serde(default)]
    pub endpoint: Option<String>,

    /// Bound on a plain call and on the wait for a streamed reply to start.
    /// A streamed body is bounded per read, so long sections are not cut off.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub default_options: CompletionOptions,
}

fn default_provider_type() -> ProviderType {
    ProviderType::Gemini
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        let provider_type = default_provider_type();
        Self {
            provider_type,
            model: provider_type.default_model().to_string(),
            api_key: None,
            api_key_env: None,
            endpoint: None,
            request_timeout_secs: default_request_timeout_secs(),
            default_options: CompletionOptions::default(),
        }
    }
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("model cannot be empty".to_string());
        }
        if let Some(endpoint) = &self.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(format!(
                    "endpoint must be an http(s) URL, got '{}'",
                    endpoint
                ));
            }
        }
        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be positive".to_string());
        }
        if let Some(temperature) = self.default_options.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(format!(
                    "temperature must be within 0.0-2.0, got {}",
                    temperature
                ));
            }
        }
        Ok(())
    }

    /// Use the provider type's default model when none was configured.
    pub fn fill_default_model(&mut self) {
        if self.model.trim().is_empty() {
            self.model = self.provider_type.default_model().to_string();
        }
    }

    pub fn api_key_env_name(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.provider_type.default_api_key_env())
    }

    /// Inline key first, then the configured environment variable.
    pub fn resolve_api_key(&self) -> Result<String, ApiError> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            return Ok(key.clone());
        }
        let env_name = self.api_key_env_name();
        std::env::var(env_name)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ApiError::ProviderNotConfigured(format!(
                    "No API key: set provider.api_key or the {} environment variable",
                    env_name
                ))
            })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn to_model_provider(&self) -> Result<ModelProvider, ApiError> {
        let api_key = self.resolve_api_key()?;
        let model = self.model.clone();
        let base_url = self.endpoint.clone();
        Ok(match self.provider_type {
            ProviderType::OpenAI => ModelProvider::OpenAI {
                model,
                api_key,
                base_url,
            },
            ProviderType::Gemini => ModelProvider::Gemini {
                model,
                api_key,
                base_url,
            },
        })
    }
}

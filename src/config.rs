//! Configuration System
//!
//! Layered configuration for the provider, retry policy, job runtime, HTTP
//! server and logging. Layers, lowest to highest precedence: built-in
//! defaults, the user-level file, workspace files, `CLAUSECRAFT__*`
//! environment variables.

use crate::error::ApiError;
use crate::generation::JobConfig;
use crate::logging::LoggingConfig;
use crate::retry::RetryConfig;
use crate::server::ServerConfig;
use config::File;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use crate::provider::{ProviderConfig, ProviderType};

mod merge;
mod sources;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClauseConfig {
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub jobs: JobConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Provider(String),
    Retry(String),
    Jobs(String),
    Server(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Provider(msg) => write!(f, "Provider: {}", msg),
            ValidationError::Retry(msg) => write!(f, "Retry: {}", msg),
            ValidationError::Jobs(msg) => write!(f, "Jobs: {}", msg),
            ValidationError::Server(msg) => write!(f, "Server: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl ClauseConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.provider.validate() {
            errors.push(ValidationError::Provider(e));
        }
        if let Err(e) = self.retry.validate() {
            errors.push(ValidationError::Retry(e));
        }
        if let Err(e) = self.jobs.validate() {
            errors.push(ValidationError::Jobs(e));
        }
        if let Err(e) = self.server.validate() {
            errors.push(ValidationError::Server(e));
        }
        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate, folding every problem into one `ConfigError`.
    pub fn ensure_valid(&self) -> Result<(), ApiError> {
        self.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })
    }

    fn finish(mut self) -> Self {
        self.provider.fill_default_model();
        self
    }
}

/// Loads `ClauseConfig` from the layered sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, then the user-level file, then `<workspace_root>/config/`, then the environment.
    pub fn load(workspace_root: &Path) -> Result<ClauseConfig, ApiError> {
        let builder = merge::merge_policy::builder_with_defaults()?;
        let builder = sources::global_file::add_to_builder(builder)?;
        let builder = sources::workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = sources::environment::add_to_builder(builder);
        let config: ClauseConfig = builder.build()?.try_deserialize()?;
        Ok(config.finish())
    }

    /// Defaults, then exactly `path`, then the environment. The file must exist.
    pub fn load_from_file(path: &Path) -> Result<ClauseConfig, ApiError> {
        if !path.exists() {
            return Err(ApiError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let builder = merge::merge_policy::builder_with_defaults()?
            .add_source(File::from(path.to_path_buf()).required(true));
        let builder = sources::environment::add_to_builder(builder);
        let config: ClauseConfig = builder.build()?.try_deserialize()?;
        Ok(config.finish())
    }

    /// Location of the user-level config file, whether or not it exists.
    pub fn xdg_config_path() -> Option<PathBuf> {
        sources::global_file::global_config_path()
    }

    pub fn default() -> ClauseConfig {
        ClauseConfig::default()
    }
}

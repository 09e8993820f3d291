//! Error types for the clausecraft generation pipeline.

use thiserror::Error;

/// How a failure should be treated by the retry policy and the orchestrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Worth another attempt of the same call (timeouts, rate limits, 5xx).
    Transient,
    /// Retrying cannot help; the job fails immediately.
    NonTransient,
    /// The caller asked the job to stop. A terminal state, not a failure.
    Cancellation,
}

/// Errors surfaced by providers, the pipeline and the outer surfaces.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Provider request timed out: {0}")]
    ProviderTimeout(String),

    #[error("Provider rate limit exceeded: {0}")]
    ProviderRateLimit(String),

    #[error("Provider stream interrupted: {0}")]
    ProviderStreamInterrupted(String),

    #[error("Provider authentication failed: {0}")]
    ProviderAuthFailed(String),

    #[error("Provider model not found: {0}")]
    ProviderModelNotFound(String),

    #[error("Prompt rejected by model: {0}")]
    PromptRejected(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("Malformed plan: {0}")]
    MalformedPlan(String),

    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    #[error("Generation cancelled by user")]
    Cancelled,

    #[error("Caller disconnected")]
    CallerDisconnected,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Generation failed: {0}")]
    JobFailed(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl ApiError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ApiError::ProviderUnavailable(_)
            | ApiError::ProviderTimeout(_)
            | ApiError::ProviderRateLimit(_)
            | ApiError::ProviderStreamInterrupted(_) => ErrorClass::Transient,
            ApiError::Cancelled => ErrorClass::Cancellation,
            _ => ErrorClass::NonTransient,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Io(err.to_string())
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

//! Bounded exponential-backoff retry for one logical model call.
//!
//! A retry always re-issues the whole call. Output a failed attempt already
//! handed to the caller is never replayed or retracted here.

use crate::error::ApiError;
use backon::{BackoffBuilder, ExponentialBackoff, ExponentialBuilder};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Retry settings as they appear in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_true")]
    pub jitter: bool,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    2_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_true() -> bool {
    true
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            multiplier: default_multiplier(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_true(),
        }
    }
}

impl RetryConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        if self.multiplier < 1.0 {
            return Err(format!(
                "multiplier must be >= 1.0, got {}",
                self.multiplier
            ));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err("max_delay_ms must not be below base_delay_ms".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    multiplier: f64,
    max_delay: Duration,
    jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            multiplier: config.multiplier,
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter: config.jitter,
        }
    }

    /// Policy that retries immediately. Used where backoff would only slow tests down.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::ZERO,
            multiplier: 1.0,
            max_delay: Duration::ZERO,
            jitter: false,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn builder(&self) -> ExponentialBuilder {
        let builder = ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(self.max_delay.max(self.base_delay))
            .with_factor(self.multiplier.max(1.0) as f32)
            .with_max_times(self.max_attempts.saturating_sub(1) as usize);
        if self.jitter {
            builder.with_jitter()
        } else {
            builder
        }
    }

    /// Waits between attempts for one logical call: `max_attempts - 1` delays,
    /// growing by the multiplier up to the cap. Jitter adds up to one more delay.
    pub fn delays(&self) -> ExponentialBackoff {
        self.builder().build()
    }

    /// The next wait from `delays`, or `None` when `err` is final.
    pub fn backoff(&self, delays: &mut ExponentialBackoff, err: &ApiError) -> Option<Duration> {
        if !err.is_transient() {
            return None;
        }
        delays.next()
    }

    /// The error to report once `backoff` said stop.
    pub fn exhausted(&self, attempt: u32, err: ApiError) -> ApiError {
        if err.is_transient() {
            ApiError::RetriesExhausted {
                attempts: attempt,
                last: err.to_string(),
            }
        } else {
            err
        }
    }

    /// Sleep for `delay` unless `token` fires first.
    pub async fn wait(delay: Duration, token: &CancellationToken) -> Result<(), ApiError> {
        tokio::select! {
            _ = tokio::time::sleep(delay) => Ok(()),
            _ = token.cancelled() => Err(ApiError::Cancelled),
        }
    }

    /// Run a call that emits nothing until it succeeds, retrying transient failures.
    /// A call in flight is never interrupted; the wait between attempts ends early
    /// with `Cancelled` once `token` is set.
    pub async fn run<T, F, Fut>(
        &self,
        label: &str,
        token: &CancellationToken,
        mut op: F,
    ) -> Result<T, ApiError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut delays = self.delays();
        let mut attempt = 1;
        loop {
            let err = match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            let Some(delay) = self.backoff(&mut delays, &err) else {
                return Err(self.exhausted(attempt, err));
            };
            warn!(
                call = label,
                attempt,
                max_attempts = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Retrying model call"
            );
            Self::wait(delay, token).await?;
            attempt += 1;
        }
    }
}

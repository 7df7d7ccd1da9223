// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Retry logic for LLM API calls with exponential backoff
//!
//! Every call owns its own cancellation token; cancellation during a wait or
//! an in-flight attempt ends the call silently instead of erroring.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::config::settings::ResilienceConfig;
use crate::error::{ApiError, Result, RostrumError};

/// Retry configuration with smart defaults
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts per call, including the first
    pub max_attempts: u32,
    /// Base delay in milliseconds (exponentially increased)
    pub base_delay_ms: u64,
    /// Maximum delay in milliseconds
    pub max_delay_ms: u64,
    /// Jitter percentage (0.0 to 1.0)
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        // Use ResilienceConfig defaults for consistency
        let resilience = ResilienceConfig::default();
        Self::from(&resilience)
    }
}

impl From<&ResilienceConfig> for RetryConfig {
    fn from(config: &ResilienceConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
            jitter: config.jitter,
        }
    }
}

impl RetryConfig {
    /// Calculate the backoff delay after a failed attempt (1-based)
    fn calculate_delay(&self, attempt: u32) -> Duration {
        // Exponential backoff: base * 2^attempt
        let exponential_ms = self
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt));
        let capped_ms = exponential_ms.min(self.max_delay_ms);

        if self.jitter <= 0.0 {
            return Duration::from_millis(capped_ms);
        }

        let jitter_range = (capped_ms as f64 * self.jitter) as i64;
        let mut rng = rand::rng();
        let jitter_ms = rng.random_range(-jitter_range..=jitter_range);

        let final_ms = (capped_ms as i64 + jitter_ms).max(0) as u64;
        Duration::from_millis(final_ms)
    }
}

/// Outcome of a cancellable call
#[derive(Debug)]
pub enum CallOutcome<T> {
    /// The call ran to completion
    Completed(T),
    /// The call was cancelled by the user; not a failure
    Cancelled,
}

impl<T> CallOutcome<T> {
    /// True if the call was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CallOutcome::Cancelled)
    }
}

/// Retry an operation with exponential backoff.
///
/// Every failure is retried until the attempt bound is reached, except
/// cancellation, which returns `CallOutcome::Cancelled` immediately, from a
/// wait or from an in-flight attempt, without surfacing an error. When
/// attempts exhaust, the last definitive API rejection is preserved;
/// transport failures collapse into a single `Network` error.
pub async fn with_retry<F, Fut, T>(
    mut operation: F,
    config: &RetryConfig,
    cancel: &CancellationToken,
    operation_name: &str,
) -> Result<CallOutcome<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        if cancel.is_cancelled() {
            tracing::debug!("{} cancelled before attempt {}", operation_name, attempt);
            return Ok(CallOutcome::Cancelled);
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("{} cancelled in flight", operation_name);
                return Ok(CallOutcome::Cancelled);
            }
            result = operation() => result,
        };

        match result {
            Ok(value) => return Ok(CallOutcome::Completed(value)),
            Err(error) => {
                if attempt >= max_attempts {
                    tracing::debug!(
                        "{} exhausted all {} attempts: {}",
                        operation_name,
                        max_attempts,
                        error
                    );
                    return Err(exhausted(error, max_attempts));
                }

                let delay = config.calculate_delay(attempt);
                tracing::debug!(
                    "{} failed (attempt {}/{}): {}. Retrying in {}ms",
                    operation_name,
                    attempt,
                    max_attempts,
                    error,
                    delay.as_millis()
                );

                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("{} cancelled during backoff", operation_name);
                        return Ok(CallOutcome::Cancelled);
                    }
                    _ = sleep(delay) => {}
                }
                attempt += 1;
            }
        }
    }
}

/// Map the last error after exhaustion: a definitive API rejection is kept,
/// anything transport-shaped becomes a Network error.
fn exhausted(error: RostrumError, attempts: u32) -> RostrumError {
    match error {
        RostrumError::Api(ApiError::Server { .. }) => error,
        RostrumError::Api(ApiError::InvalidResponse(_)) => error,
        other => RostrumError::Api(ApiError::Network(format!(
            "API call failed after {} attempts: {}",
            attempts, other
        ))),
    }
}

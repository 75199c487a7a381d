//! Retry policy for command publishing.
//!
//! # Responsibilities
//! - Decide whether a failed publish may be attempted again
//! - Bound the number of attempts
//!
//! # Design Decisions
//! - Only transport failures are retried; the business command is never re-issued
//!   under a new correlation id
//! - Rejections by the bus (4xx-class) are final

use crate::commands::bus::BusError;
use crate::config::RetryConfig;

/// Attempt budget derived from [`RetryConfig`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Policy that never retries.
    pub fn none() -> Self {
        Self::new(RetryConfig {
            enabled: false,
            ..RetryConfig::default()
        })
    }

    /// Total attempts allowed, including the first.
    pub fn max_attempts(&self) -> u32 {
        if self.config.enabled {
            self.config.max_attempts.max(1)
        } else {
            1
        }
    }

    /// Whether another attempt should follow `error` after `attempts` tries.
    pub fn should_retry(&self, error: &BusError, attempts: u32) -> bool {
        attempts < self.max_attempts() && is_retryable(error)
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

/// Transport failures and server-side errors are retryable.
pub fn is_retryable(error: &BusError) -> bool {
    match error {
        BusError::Unreachable(_) | BusError::Timeout => true,
        BusError::Status(status) => *status >= 500,
        BusError::Closed | BusError::Serialization(_) => false,
    }
}

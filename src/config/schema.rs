//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Query-serving storage services.
    pub storage: StorageConfig,

    /// Cache-aside settings.
    pub cache: CacheConfig,

    /// Command dispatch settings.
    pub dispatch: DispatchConfig,

    /// Command bus transport.
    pub bus: BusConfig,

    /// Token authentication.
    pub auth: AuthConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub security: SecurityConfig,

    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    /// Must exceed the dispatch timeout so a waiting command can still answer.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Storage service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base URL of the primary storage service.
    pub base_url: String,

    /// Failover base URLs, tried in order after a transport failure.
    pub failover_urls: Vec<String>,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:10000".to_string(),
            failover_urls: Vec::new(),
            timeout_secs: 10,
        }
    }
}

impl StorageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Cache-aside configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL applied when a route does not pick one, in seconds.
    pub default_ttl_secs: u64,

    /// Interval between sweeps of expired entries, in seconds. 0 disables sweeping.
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 300, // 5 minutes
            sweep_interval_secs: 60,
        }
    }
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }
}

/// Command dispatch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// How long a request waits for a correlated outcome, in milliseconds.
    pub timeout_ms: u64,

    /// Wait for the outcome (true) or answer 202 right after publishing.
    pub await_outcome: bool,

    /// Interval between sweeps of abandoned pending dispatches, in seconds.
    pub reaper_interval_secs: u64,

    /// Transport-level publish retries.
    pub retries: RetryConfig,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            await_outcome: true,
            reaper_interval_secs: 30,
            retries: RetryConfig::default(),
        }
    }
}

impl DispatchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries.
    pub enabled: bool,

    /// Maximum number of publish attempts, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// Command bus configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BusConfig {
    /// Base URL of the command service. When unset, commands go to an
    /// in-process channel.
    pub endpoint: Option<String>,

    /// Shared key the command service presents when posting outcomes back.
    pub callback_key: String,

    /// Publish timeout in seconds.
    pub publish_timeout_secs: u64,

    /// Capacity of the in-process channel.
    pub channel_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            // WARNING: This is a placeholder! Change this in production.
            callback_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            publish_timeout_secs: 5,
            channel_capacity: 1024,
        }
    }
}

/// Token authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret used to verify bearer tokens (HS256).
    pub jwt_secret: String,

    /// Expected `iss` claim, if any.
    pub issuer: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // WARNING: This is a placeholder! Change this in production.
            jwt_secret: "CHANGE_ME_IN_PRODUCTION".to_string(),
            issuer: None,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin endpoints.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [storage]
            base_url = "http://storage:10000"

            [dispatch]
            timeout_ms = 2500
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.base_url, "http://storage:10000");
        assert_eq!(config.storage.timeout_secs, 10);
        assert_eq!(config.dispatch.timeout(), Duration::from_millis(2500));
        assert!(config.dispatch.await_outcome);
        assert_eq!(config.cache.default_ttl(), Duration::from_secs(300));
        assert!(config.bus.endpoint.is_none());
    }
}

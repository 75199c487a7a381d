//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check cross-field constraints (request timeout outlives dispatch wait)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    check_url(&mut errors, "storage.base_url", &config.storage.base_url);
    for url in &config.storage.failover_urls {
        check_url(&mut errors, "storage.failover_urls", url);
    }
    if config.storage.timeout_secs == 0 {
        errors.push(ValidationError::new("storage.timeout_secs", "must be greater than 0"));
    }

    if config.dispatch.timeout_ms == 0 {
        errors.push(ValidationError::new("dispatch.timeout_ms", "must be greater than 0"));
    } else if config.dispatch.await_outcome
        && config.dispatch.timeout_ms >= config.timeouts.request_secs.saturating_mul(1000)
    {
        errors.push(ValidationError::new(
            "dispatch.timeout_ms",
            "must be shorter than timeouts.request_secs when awaiting outcomes",
        ));
    }
    if config.dispatch.reaper_interval_secs == 0 {
        errors.push(ValidationError::new("dispatch.reaper_interval_secs", "must be greater than 0"));
    }
    if config.dispatch.retries.enabled && config.dispatch.retries.max_attempts == 0 {
        errors.push(ValidationError::new("dispatch.retries.max_attempts", "must be at least 1"));
    }

    if let Some(endpoint) = &config.bus.endpoint {
        check_url(&mut errors, "bus.endpoint", endpoint);
    }
    if config.bus.callback_key.trim().is_empty() {
        errors.push(ValidationError::new("bus.callback_key", "must not be empty"));
    }
    if config.bus.channel_capacity == 0 {
        errors.push(ValidationError::new("bus.channel_capacity", "must be greater than 0"));
    }

    if config.auth.jwt_secret.is_empty() {
        errors.push(ValidationError::new("auth.jwt_secret", "must not be empty"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if config.admin.enabled && config.admin.api_key.trim().is_empty() {
        errors.push(ValidationError::new("admin.api_key", "must not be empty when admin is enabled"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    match Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("'{}': {}", value, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn test_all_errors_are_reported() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.storage.base_url = "ftp://storage".into();
        config.dispatch.timeout_ms = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["listener.bind_address", "storage.base_url", "dispatch.timeout_ms"]
        );
    }

    #[test]
    fn test_dispatch_wait_must_fit_request_timeout() {
        let mut config = GatewayConfig::default();
        config.timeouts.request_secs = 5;
        config.dispatch.timeout_ms = 5_000;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "dispatch.timeout_ms");

        config.dispatch.await_outcome = false;
        assert!(validate_config(&config).is_ok());
    }
}

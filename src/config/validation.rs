//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that every backend address normalizes and is unique
//! - Validate value ranges (intervals and timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::error::AddressError;
use crate::load_balancer::backend::parse_address;

/// A single semantic problem with a configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("no backends configured")]
    NoBackends,

    #[error(transparent)]
    InvalidBackend(#[from] AddressError),

    #[error("backend {0} is listed more than once")]
    DuplicateBackend(String),

    #[error("invalid {field} {value:?}")]
    InvalidSocketAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Validate a deserialized configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.backends.is_empty() {
        errors.push(ValidationError::NoBackends);
    }

    let mut seen = HashSet::new();
    for raw in &config.backends {
        match parse_address(raw) {
            Ok(url) => {
                if !seen.insert(url.clone()) {
                    errors.push(ValidationError::DuplicateBackend(url.to_string()));
                }
            }
            Err(e) => errors.push(e.into()),
        }
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidSocketAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidSocketAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.health_check.enabled {
        if config.health_check.interval_secs == 0 {
            errors.push(ValidationError::Zero("health_check.interval_secs"));
        }
        if config.health_check.timeout_secs == 0 {
            errors.push(ValidationError::Zero("health_check.timeout_secs"));
        }
    }

    let timeouts = [
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("timeouts.forward_secs", config.timeouts.forward_secs),
        ("timeouts.connect_secs", config.timeouts.connect_secs),
    ];
    for (field, value) in timeouts {
        if value == 0 {
            errors.push(ValidationError::Zero(field));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(backends: &[&str]) -> ProxyConfig {
        ProxyConfig {
            backends: backends.iter().map(|b| b.to_string()).collect(),
            ..ProxyConfig::default()
        }
    }

    #[test]
    fn accepts_defaults_with_backends() {
        let config = config_with(&["http://localhost:3031", "localhost:3032"]);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn rejects_empty_backend_list() {
        let errors = validate_config(&ProxyConfig::default()).unwrap_err();
        assert!(matches!(errors[0], ValidationError::NoBackends));
    }

    #[test]
    fn collects_every_error() {
        let mut config = config_with(&["http://localhost:3031", "localhost:3031", "ftp://x:21"]);
        config.health_check.interval_secs = 0;
        config.listener.bind_address = "not-an-address".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| matches!(e, ValidationError::DuplicateBackend(_))));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidBackend(_))));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::Zero("health_check.interval_secs"))));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidSocketAddress { .. })));
    }

    #[test]
    fn disabled_health_check_skips_interval_check() {
        let mut config = config_with(&["http://localhost:3031"]);
        config.health_check.enabled = false;
        config.health_check.interval_secs = 0;
        assert!(validate_config(&config).is_ok());
    }
}

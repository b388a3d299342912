//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, addresses parse)
//! - Detect contradictory TLS settings
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Filesystem checks (socket, PEM files) belong to startup, not here

use std::fmt;
use std::net::SocketAddr;

use crate::config::address::ListenAddress;
use crate::config::schema::ProxyConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = ListenAddress::parse(&config.listener.address) {
        errors.push(ValidationError::new("listener.address", e.to_string()));
    }

    if config.listener.max_connections == 0 {
        errors.push(ValidationError::new(
            "listener.max_connections",
            "must be greater than 0",
        ));
    }

    if config.tls.verify_peer && config.tls.ca_path.is_none() {
        errors.push(ValidationError::new(
            "tls.ca_path",
            "required when tls.verify_peer is enabled",
        ));
    }

    if config.backend.socket_path.as_os_str().is_empty() {
        errors.push(ValidationError::new("backend.socket_path", "must not be empty"));
    }

    if config.backend.max_body_size == 0 {
        errors.push(ValidationError::new(
            "backend.max_body_size",
            "must be greater than 0",
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("{:?} is not a socket address", config.observability.metrics_address),
        ));
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

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn collects_all_errors() {
        let mut config = ProxyConfig::default();
        config.listener.address = "0.0.0.0:6058".into();
        config.listener.max_connections = 0;
        config.tls.ca_path = None;
        config.backend.max_body_size = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "listener.address",
                "listener.max_connections",
                "tls.ca_path",
                "backend.max_body_size",
            ]
        );
    }

    #[test]
    fn missing_ca_is_fine_without_peer_verification() {
        let mut config = ProxyConfig::default();
        config.tls.ca_path = None;
        config.tls.verify_peer = false;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn bad_metrics_address_only_matters_when_enabled() {
        let mut config = ProxyConfig::default();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "observability.metrics_address");
    }
}

//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ttl > 0, timeouts > 0, addresses parse)
//! - Detect duplicate plugin instance names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Plugin types are checked later, when the plugin registry resolves them

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{GatewayConfig, PluginSpec};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_addr(&mut errors, "listener.bind_address", &config.listener.bind_address);
    check_addr(&mut errors, "upstream.address", &config.upstream.address);
    if config.observability.metrics_enabled {
        check_addr(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.upstream.max_response_body == 0 {
        errors.push(ValidationError::new("upstream.max_response_body", "must be greater than 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::new("timeouts.upstream_secs", "must be greater than 0"));
    }

    let tokens = &config.tokens;
    if tokens.ttl_secs == 0 {
        errors.push(ValidationError::new("tokens.ttl_secs", "must be greater than 0"));
    }
    if tokens.sweep_interval_secs == 0 {
        errors.push(ValidationError::new("tokens.sweep_interval_secs", "must be greater than 0"));
    }
    if tokens.manager.is_empty() {
        errors.push(ValidationError::new("tokens.manager", "must not be empty"));
    }
    if !tokens.service_uri.starts_with('/') || tokens.service_uri.len() < 2 {
        errors.push(ValidationError::new(
            "tokens.service_uri",
            "must start with '/' and name a path below the root",
        ));
    } else if tokens.service_uri.ends_with('/') {
        errors.push(ValidationError::new("tokens.service_uri", "must not end with '/'"));
    }

    check_plugins(&mut errors, "authentication.mechanisms", &config.authentication.mechanisms);
    check_plugins(&mut errors, "interceptors", &config.interceptors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_addr(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            field,
            format!("'{}' is not a valid socket address", value),
        ));
    }
}

fn check_plugins(errors: &mut Vec<ValidationError>, field: &str, specs: &[PluginSpec]) {
    let mut seen = HashSet::new();
    for (i, spec) in specs.iter().enumerate() {
        if spec.name.is_empty() {
            errors.push(ValidationError::new(format!("{}[{}].name", field, i), "must not be empty"));
        } else if !seen.insert(spec.name.as_str()) {
            errors.push(ValidationError::new(
                format!("{}[{}].name", field, i),
                format!("duplicate name '{}'", spec.name),
            ));
        }
        if spec.kind.is_empty() {
            errors.push(ValidationError::new(format!("{}[{}].type", field, i), "must not be empty"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, kind: &str) -> PluginSpec {
        PluginSpec {
            name: name.to_string(),
            kind: kind.to_string(),
            args: toml::Table::new(),
        }
    }

    #[test]
    fn test_default_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = GatewayConfig::default();
        config.tokens.ttl_secs = 0;
        config.tokens.sweep_interval_secs = 0;
        config.listener.bind_address = "nope".to_string();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["listener.bind_address", "tokens.ttl_secs", "tokens.sweep_interval_secs"]
        );
    }

    #[test]
    fn test_service_uri_shape() {
        for bad in ["tokens", "/", "/tokens/", ""] {
            let mut config = GatewayConfig::default();
            config.tokens.service_uri = bad.to_string();
            let errors = validate_config(&config).unwrap_err();
            assert_eq!(errors[0].field, "tokens.service_uri", "{:?}", bad);
        }

        let mut config = GatewayConfig::default();
        config.tokens.service_uri = "/auth/tokens".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_duplicate_plugin_names() {
        let mut config = GatewayConfig::default();
        config.authentication.mechanisms = vec![spec("a", "basic"), spec("a", "token")];
        config.interceptors = vec![spec("x", "set-headers"), spec("", "remove-headers")];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "authentication.mechanisms[1].name");
        assert_eq!(errors[1].field, "interceptors[1].name");
    }

    #[test]
    fn test_metrics_address_only_checked_when_enabled() {
        let mut config = GatewayConfig::default();
        config.observability.metrics_address = "bad".to_string();
        assert!(validate_config(&config).is_err());

        config.observability.metrics_enabled = false;
        assert!(validate_config(&config).is_ok());
    }
}

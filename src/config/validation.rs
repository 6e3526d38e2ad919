//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes reference declared services)
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Detect conflicting routes (duplicate prefixes)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{
    ProxyConfig, BILLING_SERVICE, PLACEHOLDER_API_KEY, PRIMARY_SERVICE,
};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid {field} address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("route prefix '{0}' must start with '/'")]
    InvalidPrefix(String),

    #[error("route prefix '{0}' is declared more than once")]
    DuplicatePrefix(String),

    #[error("route '{route}' references unknown service '{service}'")]
    UnknownService { route: String, service: String },

    #[error("required service '{0}' is not declared")]
    MissingService(&'static str),

    #[error("service '{0}' has an empty host")]
    EmptyHost(String),

    #[error("service '{0}' has port 0")]
    ZeroPort(String),

    #[error("route '{0}' has a rewrite with an empty 'from'")]
    EmptyRewrite(String),

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("admin API is enabled with the placeholder api_key")]
    PlaceholderApiKey,
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener", &config.listener.bind_address);
    if config.admin.enabled {
        check_address(&mut errors, "admin", &config.admin.bind_address);
        if config.admin.api_key == PLACEHOLDER_API_KEY {
            errors.push(ValidationError::PlaceholderApiKey);
        }
    }
    if config.observability.metrics_enabled {
        check_address(&mut errors, "metrics", &config.observability.metrics_address);
    }

    for required in [PRIMARY_SERVICE, BILLING_SERVICE] {
        if !config.services.contains_key(required) {
            errors.push(ValidationError::MissingService(required));
        }
    }
    for (name, service) in &config.services {
        if service.host.trim().is_empty() {
            errors.push(ValidationError::EmptyHost(name.clone()));
        }
        if service.port == 0 {
            errors.push(ValidationError::ZeroPort(name.clone()));
        }
    }

    let mut seen = HashSet::new();
    for route in &config.routes {
        if !route.path_prefix.starts_with('/') {
            errors.push(ValidationError::InvalidPrefix(route.path_prefix.clone()));
        }
        if !seen.insert(route.path_prefix.as_str()) {
            errors.push(ValidationError::DuplicatePrefix(route.path_prefix.clone()));
        }
        if !config.services.contains_key(&route.service) {
            errors.push(ValidationError::UnknownService {
                route: route.display_name().to_string(),
                service: route.service.clone(),
            });
        }
        if let Some(rewrite) = &route.rewrite {
            if rewrite.from.is_empty() {
                errors.push(ValidationError::EmptyRewrite(route.display_name().to_string()));
            }
        }
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request_secs"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

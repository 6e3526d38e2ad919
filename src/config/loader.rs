//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{ProxyConfig, PRIMARY_SERVICE};
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable that moves the primary service to another port.
pub const PRIMARY_PORT_ENV: &str = "AUTH_PORT";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("{var}='{value}' is not a valid port")]
    InvalidOverride { var: &'static str, value: String },
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ProxyConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load the file if one is given, otherwise start from the built-in table,
/// then apply the environment override and validate the result.
pub fn load_with_overrides(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    let env_value = std::env::var(PRIMARY_PORT_ENV).ok();
    if let Some(port) = parse_port_override(env_value.as_deref())? {
        set_primary_port(&mut config, port);
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Interpret the raw override value. Unset and empty both mean "no override".
pub fn parse_port_override(raw: Option<&str>) -> Result<Option<u16>, ConfigError> {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    match raw.parse::<u16>() {
        Ok(port) if port != 0 => Ok(Some(port)),
        _ => Err(ConfigError::InvalidOverride {
            var: PRIMARY_PORT_ENV,
            value: raw.to_string(),
        }),
    }
}

/// Point the primary service at `port`.
pub fn set_primary_port(config: &mut ProxyConfig, port: u16) {
    if let Some(primary) = config.services.get_mut(PRIMARY_SERVICE) {
        tracing::info!(from = primary.port, to = port, "Primary service port overridden");
        primary.port = port;
    }
}

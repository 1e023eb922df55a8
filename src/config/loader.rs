//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::RelayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable consulted when `resolver.weather_api_key` is empty.
pub const WEATHER_API_KEY_ENV: &str = "WEATHER_API_KEY";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<RelayConfig, ConfigError> {
    let mut config: RelayConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config);

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load the file at `path` (or defaults), apply environment and command-line
/// overrides, then validate the result.
pub fn load_with_overrides(
    path: Option<&Path>,
    bind_address: Option<&str>,
) -> Result<RelayConfig, ConfigError> {
    let mut config: RelayConfig = match path {
        Some(path) => toml::from_str(&fs::read_to_string(path)?)?,
        None => RelayConfig::default(),
    };
    apply_env_overrides(&mut config);
    if let Some(address) = bind_address {
        config.listener.bind_address = Some(address.to_string());
    }

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Fill secrets that are kept out of config files.
pub fn apply_env_overrides(config: &mut RelayConfig) {
    if config.resolver.weather_api_key.is_empty() {
        if let Ok(key) = std::env::var(WEATHER_API_KEY_ENV) {
            config.resolver.weather_api_key = key;
        }
    }
}

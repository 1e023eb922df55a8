//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and URLs before any socket is opened
//! - Validate value ranges (timeouts > 0, body limits > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::RelayConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not a socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: '{value}' is not a valid URL ({reason})")]
    InvalidUrl {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("{field}: scheme '{scheme}' is not supported, expected http")]
    UnsupportedScheme { field: &'static str, scheme: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("observability.log_level: unknown level '{0}'")]
    UnknownLogLevel(String),
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Some(address) = config.listener.bind_address.as_deref() {
        if address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidAddress {
                field: "listener.bind_address",
                value: address.to_string(),
            });
        }
    }

    // The forwarding client speaks plain HTTP only.
    match Url::parse(&config.edge.downstream_url) {
        Ok(url) if url.scheme() != "http" => errors.push(ValidationError::UnsupportedScheme {
            field: "edge.downstream_url",
            scheme: url.scheme().to_string(),
        }),
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::InvalidUrl {
            field: "edge.downstream_url",
            value: config.edge.downstream_url.clone(),
            reason: e.to_string(),
        }),
    }

    for (field, value) in [
        ("resolver.zipcode_provider_url", &config.resolver.zipcode_provider_url),
        ("resolver.weather_provider_url", &config.resolver.weather_provider_url),
    ] {
        if let Err(e) = Url::parse(value) {
            errors.push(ValidationError::InvalidUrl {
                field,
                value: value.clone(),
                reason: e.to_string(),
            });
        }
    }

    if let Some(endpoint) = config.observability.otlp_endpoint.as_deref() {
        if !endpoint.is_empty() {
            if let Err(e) = Url::parse(endpoint) {
                errors.push(ValidationError::InvalidUrl {
                    field: "observability.otlp_endpoint",
                    value: endpoint.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    for (field, value) in [
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("timeouts.upstream_secs", config.timeouts.upstream_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::Zero(field));
        }
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::Zero("security.max_body_size"));
    }
    if config.edge.max_response_bytes == 0 {
        errors.push(ValidationError::Zero("edge.max_response_bytes"));
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for both relay
//! roles. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the weather relay.
///
/// A single file configures either role; sections that do not apply to the
/// running role are ignored.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Edge role settings (where to forward).
    pub edge: EdgeConfig,

    /// Resolver role settings (lookup providers).
    pub resolver: ResolverConfig,

    /// Inbound and outbound deadlines.
    pub timeouts: TimeoutConfig,

    /// Logging, metrics and span export.
    pub observability: ObservabilityConfig,

    /// Security hardening settings.
    pub security: SecurityConfig,
}

/// Default listen address of the edge role.
pub const EDGE_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default listen address of the resolver role, where the edge forwards by default.
pub const RESOLVER_BIND_ADDRESS: &str = "0.0.0.0:8081";

/// Where the running role listens.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Socket address the role accepts connections on. Unset means the
    /// role's default ([`EDGE_BIND_ADDRESS`] or [`RESOLVER_BIND_ADDRESS`]).
    pub bind_address: Option<String>,
}

impl ListenerConfig {
    /// The configured address, or `role_default` when none is set.
    pub fn bind_address_or<'a>(&'a self, role_default: &'a str) -> &'a str {
        self.bind_address.as_deref().unwrap_or(role_default)
    }
}

/// Edge service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EdgeConfig {
    /// Absolute `http://` URL of the resolver service.
    pub downstream_url: String,

    /// Largest downstream response body relayed back to the caller, in bytes.
    pub max_response_bytes: usize,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            downstream_url: "http://serviceb:8081".to_string(),
            max_response_bytes: 1024 * 1024,
        }
    }
}

/// Resolver service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Base URL of the ViaCEP-compatible zipcode lookup API.
    pub zipcode_provider_url: String,

    /// Base URL of the WeatherAPI-compatible weather lookup API.
    pub weather_provider_url: String,

    /// WeatherAPI key. Falls back to the `WEATHER_API_KEY` env var when empty.
    pub weather_api_key: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            zipcode_provider_url: "https://viacep.com.br/ws".to_string(),
            weather_provider_url: "https://api.weatherapi.com/v1".to_string(),
            weather_api_key: String::new(),
        }
    }
}

/// Deadlines for the inbound request and every outbound call.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout for outbound calls, in seconds.
    pub connect_secs: u64,

    /// Overall inbound request timeout in seconds.
    pub request_secs: u64,

    /// Deadline for a single outbound call (downstream or provider), in seconds.
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 60,
            upstream_secs: 30,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging, metrics and span export settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Install the Prometheus recorder and serve `GET /metrics`.
    pub metrics_enabled: bool,

    /// OTLP/gRPC collector endpoint. An empty string disables span export.
    pub otlp_endpoint: Option<String>,

    /// Overrides the role's default `service.name`.
    pub service_name: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            metrics_enabled: true,
            otlp_endpoint: Some("http://otel-collector:4317".to_string()),
            service_name: None,
        }
    }
}

/// Inbound request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum inbound body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 64 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.listener.bind_address, None);
        assert_eq!(config.listener.bind_address_or(EDGE_BIND_ADDRESS), "0.0.0.0:8080");
        assert_eq!(config.listener.bind_address_or(RESOLVER_BIND_ADDRESS), "0.0.0.0:8081");
        assert_eq!(config.edge.downstream_url, "http://serviceb:8081");
        assert_eq!(config.timeouts.request_secs, 60);
        assert_eq!(config.observability.log_format, LogFormat::Text);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: RelayConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address_or(RESOLVER_BIND_ADDRESS), "127.0.0.1:9000");
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.observability.log_level, "info");
        assert_eq!(config.timeouts.connect_secs, 5);
        assert_eq!(config.resolver.zipcode_provider_url, "https://viacep.com.br/ws");
    }
}

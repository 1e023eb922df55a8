//! Lookup providers consumed by the resolver.
//!
//! # Responsibilities
//! - Define the zipcode → city and city → temperature seams
//! - Talk to ViaCEP and WeatherAPI over HTTPS
//! - Report provider failures with enough detail for logs
//!
//! # Design Decisions
//! - Providers are trait objects so tests can swap them out
//! - Every call carries the client-level deadline from `timeouts`
//! - Errors here are internal; the pipeline maps them to relay errors

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::config::{ResolverConfig, TimeoutConfig};
use crate::http::request::Zipcode;

/// Failures reported by a lookup provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no match for '{0}'")]
    NotFound(String),

    #[error("provider answered with status {0}")]
    Status(StatusCode),

    #[error("provider request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("provider response could not be decoded: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Wrap a client error without its request URL, which may carry an API key.
    fn transport(error: reqwest::Error) -> Self {
        ProviderError::Transport(error.without_url())
    }
}

/// Resolves a zipcode to a city name.
#[async_trait]
pub trait ZipcodeProvider: Send + Sync {
    async fn lookup(&self, zipcode: &Zipcode) -> Result<String, ProviderError>;
}

/// Resolves a city name to its current temperature in Celsius.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn lookup(&self, city: &str) -> Result<f64, ProviderError>;
}

/// Shared HTTP client for provider calls.
pub fn build_client(timeouts: &TimeoutConfig) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(timeouts.connect_secs))
        .timeout(Duration::from_secs(timeouts.upstream_secs))
        .build()
}

#[derive(Debug, Deserialize)]
struct ViaCepResponse {
    #[serde(default)]
    localidade: Option<String>,
    #[serde(default)]
    erro: Option<serde_json::Value>,
}

/// Extract the city from a ViaCEP payload.
fn city_from_viacep(zipcode: &Zipcode, body: &[u8]) -> Result<String, ProviderError> {
    let payload: ViaCepResponse =
        serde_json::from_slice(body).map_err(|e| ProviderError::Decode(e.to_string()))?;

    // ViaCEP flags unknown codes with `"erro": true` (older deployments: "true").
    let flagged = match payload.erro {
        None | Some(serde_json::Value::Bool(false)) => false,
        Some(_) => true,
    };

    match payload.localidade {
        Some(city) if !flagged && !city.trim().is_empty() => Ok(city),
        _ => Err(ProviderError::NotFound(zipcode.to_string())),
    }
}

/// ViaCEP zipcode lookup (`GET {base}/{cep}/json/`).
pub struct ViaCepProvider {
    client: reqwest::Client,
    base_url: String,
}

impl ViaCepProvider {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn from_config(client: reqwest::Client, config: &ResolverConfig) -> Self {
        Self::new(client, config.zipcode_provider_url.clone())
    }
}

#[async_trait]
impl ZipcodeProvider for ViaCepProvider {
    async fn lookup(&self, zipcode: &Zipcode) -> Result<String, ProviderError> {
        let url = format!("{}/{}/json/", self.base_url.trim_end_matches('/'), zipcode);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ProviderError::transport)?;

        match response.status() {
            StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => {
                return Err(ProviderError::NotFound(zipcode.to_string()));
            }
            status if !status.is_success() => return Err(ProviderError::Status(status)),
            _ => {}
        }

        let body = response.bytes().await.map_err(ProviderError::transport)?;
        city_from_viacep(zipcode, &body)
    }
}

#[derive(Debug, Deserialize)]
struct WeatherApiResponse {
    current: WeatherApiCurrent,
}

#[derive(Debug, Deserialize)]
struct WeatherApiCurrent {
    temp_c: f64,
}

fn celsius_from_weatherapi(body: &[u8]) -> Result<f64, ProviderError> {
    let payload: WeatherApiResponse =
        serde_json::from_slice(body).map_err(|e| ProviderError::Decode(e.to_string()))?;
    Ok(payload.current.temp_c)
}

/// WeatherAPI current conditions (`GET {base}/current.json?key=..&q=..`).
pub struct WeatherApiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl WeatherApiProvider {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    pub fn from_config(client: reqwest::Client, config: &ResolverConfig) -> Self {
        Self::new(
            client,
            config.weather_provider_url.clone(),
            config.weather_api_key.clone(),
        )
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    async fn lookup(&self, city: &str) -> Result<f64, ProviderError> {
        let url = format!("{}/current.json", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(url)
            .query(&[("key", self.api_key.as_str()), ("q", city), ("aqi", "no")])
            .send()
            .await
            .map_err(ProviderError::transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status));
        }

        let body = response.bytes().await.map_err(ProviderError::transport)?;
        celsius_from_weatherapi(&body)
    }
}

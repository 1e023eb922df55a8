//! Zipcode → city → temperature resolution.
//!
//! # Data Flow
//! ```text
//! Received → Validated → CityResolved → WeatherResolved → Responded
//!     └──────────┴────────────┴───────────────┴──→ Errored
//! ```
//!
//! # Design Decisions
//! - Steps run strictly in sequence; a failed step ends the request
//! - Any zipcode provider failure reads as "not found" to the caller
//! - Any weather provider failure reads as "unavailable" to the caller
//! - Each provider call gets its own child span

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use opentelemetry::{Context, KeyValue};
use serde::{Deserialize, Serialize};

use crate::http::request::Zipcode;
use crate::http::response::RelayError;
use crate::observability::metrics;
use crate::observability::{SpanKind, Telemetry};
use crate::resolver::convert::Temperatures;
use crate::resolver::providers::{WeatherProvider, ZipcodeProvider};

pub const RESOLVE_CITY_SPAN: &str = "resolver.resolve_city";
pub const FETCH_WEATHER_SPAN: &str = "resolver.fetch_weather";

/// Progress of a single request through the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Validated,
    CityResolved,
    WeatherResolved,
    Responded,
    Errored,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Validated => "validated",
            Stage::CityResolved => "city_resolved",
            Stage::WeatherResolved => "weather_resolved",
            Stage::Responded => "responded",
            Stage::Errored => "errored",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pipeline failure and the last stage the request reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageError {
    pub reached: Stage,
    pub error: RelayError,
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} after {}", self.error, self.reached)
    }
}

/// Successful resolution, serialized as the response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherResult {
    pub city: String,
    #[serde(flatten)]
    pub temperatures: Temperatures,
}

/// The resolver's lookup chain.
#[derive(Clone)]
pub struct ResolverPipeline {
    zipcodes: Arc<dyn ZipcodeProvider>,
    weather: Arc<dyn WeatherProvider>,
}

impl ResolverPipeline {
    pub fn new(zipcodes: Arc<dyn ZipcodeProvider>, weather: Arc<dyn WeatherProvider>) -> Self {
        Self { zipcodes, weather }
    }

    /// Resolve a validated zipcode to its current weather.
    pub async fn run(
        &self,
        zipcode: &Zipcode,
        telemetry: &Telemetry,
        parent: &Context,
    ) -> Result<WeatherResult, StageError> {
        let city = self
            .resolve_city(zipcode, telemetry, parent)
            .await
            .map_err(|error| StageError { reached: Stage::Validated, error })?;

        let celsius = self
            .fetch_weather(&city, telemetry, parent)
            .await
            .map_err(|error| StageError { reached: Stage::CityResolved, error })?;

        Ok(WeatherResult {
            city,
            temperatures: Temperatures::from_celsius(celsius),
        })
    }

    async fn resolve_city(
        &self,
        zipcode: &Zipcode,
        telemetry: &Telemetry,
        parent: &Context,
    ) -> Result<String, RelayError> {
        let span = telemetry.start_span(RESOLVE_CITY_SPAN, SpanKind::Client, parent);
        span.set_attribute(KeyValue::new("relay.zipcode", zipcode.to_string()));
        let start = Instant::now();

        match self.zipcodes.lookup(zipcode).await {
            Ok(city) => {
                metrics::record_upstream("zipcode_provider", "ok", start);
                span.set_attribute(KeyValue::new("relay.city", city.clone()));
                span.succeed();
                Ok(city)
            }
            Err(e) => {
                metrics::record_upstream("zipcode_provider", "error", start);
                tracing::warn!(zipcode = %zipcode, error = %e, "Zipcode lookup failed");
                span.fail(&e);
                Err(RelayError::ZipcodeNotFound)
            }
        }
    }

    async fn fetch_weather(
        &self,
        city: &str,
        telemetry: &Telemetry,
        parent: &Context,
    ) -> Result<f64, RelayError> {
        let span = telemetry.start_span(FETCH_WEATHER_SPAN, SpanKind::Client, parent);
        span.set_attribute(KeyValue::new("relay.city", city.to_string()));
        let start = Instant::now();

        match self.weather.lookup(city).await {
            Ok(celsius) => {
                metrics::record_upstream("weather_provider", "ok", start);
                span.set_attribute(KeyValue::new("relay.temp_c", celsius));
                span.succeed();
                Ok(celsius)
            }
            Err(e) => {
                metrics::record_upstream("weather_provider", "error", start);
                tracing::warn!(city = %city, error = %e, "Weather lookup failed");
                span.fail(&e);
                Err(RelayError::WeatherUnavailable)
            }
        }
    }
}

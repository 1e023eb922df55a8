//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define relay metrics (requests, latency, upstream outcomes)
//! - Install the Prometheus recorder and render the scrape payload
//!
//! # Metrics
//! - `relay_requests_total` (counter): inbound requests by service, status
//! - `relay_request_duration_seconds` (histogram): inbound latency by service
//! - `relay_upstream_requests_total` (counter): outbound calls by target, outcome
//! - `relay_upstream_duration_seconds` (histogram): outbound latency by target
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - The recorder is installed once by the binary, never by library code

use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder for this process.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    tracing::info!("Prometheus recorder installed");
    Ok(handle)
}

/// Record a completed inbound request.
pub fn record_request(service: &str, status: u16, start: Instant) {
    metrics::counter!(
        "relay_requests_total",
        "service" => service.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("relay_request_duration_seconds", "service" => service.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record a completed outbound call (downstream service or provider).
pub fn record_upstream(target: &'static str, outcome: &'static str, start: Instant) {
    metrics::counter!(
        "relay_upstream_requests_total",
        "target" => target,
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("relay_upstream_duration_seconds", "target" => target)
        .record(start.elapsed().as_secs_f64());
}

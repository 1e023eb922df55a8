//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Both roles produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!     → tracing.rs (spans linked across the edge → resolver hop)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape at /metrics)
//!     → OTLP collector (batched span export)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Trace context flows in W3C headers on the edge → resolver hop
//! - Metrics are cheap (no recorder, no cost)
//! - Span export never blocks or fails a request

pub mod logging;
pub mod metrics;
pub mod tracing;

pub use self::tracing::{Carrier, SpanGuard, SpanKind, Telemetry, TelemetryError, W3cCarrier};

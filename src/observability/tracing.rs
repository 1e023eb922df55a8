//! Distributed tracing support.
//!
//! # Responsibilities
//! - Extract trace context from incoming requests
//! - Propagate trace context to downstream requests
//! - Create spans for relay operations and close them on every exit path
//! - Export finished spans to the collector without blocking requests
//!
//! # Design Decisions
//! - Supports W3C Trace Context (`traceparent`, `tracestate`) and W3C Baggage
//! - Header propagation goes through the [`Carrier`] trait, never through
//!   handlers touching header maps directly
//! - [`Telemetry`] is built once at startup and passed through router state;
//!   the OpenTelemetry globals are never consulted
//! - Export is batched on the tokio runtime; exporter failures are reported
//!   by the SDK and never reach the request path

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use opentelemetry::propagation::{Extractor, Injector, TextMapPropagator};
use opentelemetry::trace::{
    SpanId, Status, TraceContextExt, TraceError, TraceId, Tracer as _, TracerProvider as _,
};
use opentelemetry::{Context, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::propagation::{
    BaggagePropagator, TextMapCompositePropagator, TraceContextPropagator,
};
use opentelemetry_sdk::trace::{self as sdktrace, TracerProvider as SdkTracerProvider};
use opentelemetry_sdk::{runtime, Resource};
use thiserror::Error;

use crate::config::ObservabilityConfig;

pub use opentelemetry::trace::SpanKind;

/// W3C trace context header.
pub const TRACEPARENT: &str = "traceparent";

/// W3C trace state header.
pub const TRACESTATE: &str = "tracestate";

/// W3C baggage header.
pub const BAGGAGE: &str = "baggage";

/// Errors raised while setting up the tracing pipeline.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to build span exporter: {0}")]
    Exporter(#[from] TraceError),
}

/// Moves trace context between a request's headers and an in-process
/// [`Context`].
pub trait Carrier: Send + Sync {
    /// Rebuild the caller's context from `headers`.
    ///
    /// Missing or malformed headers yield a context without a remote parent.
    fn extract(&self, headers: &HeaderMap) -> Context;

    /// Write the identifiers of `cx` into `headers`.
    fn inject(&self, cx: &Context, headers: &mut HeaderMap);
}

/// [`Carrier`] speaking W3C Trace Context and W3C Baggage.
pub struct W3cCarrier {
    propagator: TextMapCompositePropagator,
}

impl W3cCarrier {
    pub fn new() -> Self {
        Self {
            propagator: TextMapCompositePropagator::new(vec![
                Box::new(TraceContextPropagator::new()),
                Box::new(BaggagePropagator::new()),
            ]),
        }
    }
}

impl Default for W3cCarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl Carrier for W3cCarrier {
    fn extract(&self, headers: &HeaderMap) -> Context {
        self.propagator
            .extract_with_context(&Context::new(), &HeaderExtractor(headers))
    }

    fn inject(&self, cx: &Context, headers: &mut HeaderMap) {
        self.propagator
            .inject_context(cx, &mut HeaderInjector(headers));
    }
}

struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(HeaderName::as_str).collect()
    }
}

struct HeaderInjector<'a>(&'a mut HeaderMap);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            self.0.insert(name, value);
        }
    }
}

/// Process-wide tracing handle.
///
/// Owns the tracer provider (and with it the export pipeline), the tracer
/// used to open spans, and the [`Carrier`] used at service boundaries.
pub struct Telemetry {
    service: String,
    provider: SdkTracerProvider,
    tracer: sdktrace::Tracer,
    carrier: Arc<dyn Carrier>,
}

impl Telemetry {
    /// Build the tracing pipeline for `service` from configuration.
    ///
    /// Without an OTLP endpoint spans are still created and propagated, but
    /// nothing is exported.
    pub fn init(service: &str, config: &ObservabilityConfig) -> Result<Self, TelemetryError> {
        let resource = Resource::new(vec![KeyValue::new("service.name", service.to_string())]);
        let mut builder = SdkTracerProvider::builder()
            .with_config(sdktrace::Config::default().with_resource(resource));

        match config.otlp_endpoint.as_deref().filter(|e| !e.is_empty()) {
            Some(endpoint) => {
                let exporter = opentelemetry_otlp::new_exporter()
                    .tonic()
                    .with_endpoint(endpoint)
                    .build_span_exporter()?;
                builder = builder.with_batch_exporter(exporter, runtime::Tokio);
                tracing::info!(service, endpoint, "OTLP span export enabled");
            }
            None => {
                tracing::info!(service, "OTLP span export disabled");
            }
        }

        Ok(Self::from_provider(service, builder.build()))
    }

    /// Wrap an already configured provider.
    pub fn from_provider(service: impl Into<String>, provider: SdkTracerProvider) -> Self {
        let service = service.into();
        let tracer = provider.tracer(service.clone());
        Self {
            service,
            provider,
            tracer,
            carrier: Arc::new(W3cCarrier::new()),
        }
    }

    /// Replace the boundary carrier.
    pub fn with_carrier(mut self, carrier: Arc<dyn Carrier>) -> Self {
        self.carrier = carrier;
        self
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn carrier(&self) -> &Arc<dyn Carrier> {
        &self.carrier
    }

    /// Open a span as a child of `parent`.
    ///
    /// The span ends when the returned guard is dropped.
    pub fn start_span(&self, name: &'static str, kind: SpanKind, parent: &Context) -> SpanGuard {
        let span = self
            .tracer
            .span_builder(name)
            .with_kind(kind)
            .start_with_context(&self.tracer, parent);
        SpanGuard {
            cx: parent.with_span(span),
            settled: AtomicBool::new(false),
        }
    }

    /// Push every finished span to the exporter.
    pub fn flush(&self) {
        for result in self.provider.force_flush() {
            if let Err(e) = result {
                tracing::warn!(service = %self.service, error = %e, "Failed to flush spans");
            }
        }
    }
}

/// An open span. Ends the span when dropped.
///
/// A span dropped before [`succeed`](Self::succeed) or [`fail`](Self::fail)
/// (a cancelled request future, for instance) ends with an error status.
pub struct SpanGuard {
    cx: Context,
    settled: AtomicBool,
}

impl SpanGuard {
    /// Context carrying this span, used as parent for nested work.
    pub fn context(&self) -> &Context {
        &self.cx
    }

    pub fn span_id(&self) -> SpanId {
        self.cx.span().span_context().span_id()
    }

    pub fn trace_id(&self) -> TraceId {
        self.cx.span().span_context().trace_id()
    }

    pub fn set_attribute(&self, attribute: KeyValue) {
        self.cx.span().set_attribute(attribute);
    }

    /// Mark the unit of work as successful.
    pub fn succeed(&self) {
        self.settled.store(true, Ordering::Relaxed);
        self.cx.span().set_status(Status::Ok);
    }

    /// Mark the unit of work as failed.
    pub fn fail(&self, error: &dyn fmt::Display) {
        self.settled.store(true, Ordering::Relaxed);
        self.cx.span().set_status(Status::error(error.to_string()));
    }
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        if !self.settled.load(Ordering::Relaxed) {
            self.cx.span().set_status(Status::error("cancelled"));
        }
        self.cx.span().end();
    }
}

//! Edge → resolver forwarding.
//!
//! # Responsibilities
//! - Build the downstream request from a validated zipcode
//! - Attach trace context and request ID headers
//! - Relay the resolver's status and body back untouched
//! - Turn transport failures into a single relay error
//!
//! # Design Decisions
//! - One attempt per request; no retries
//! - The deadline covers connect, response head and body
//! - Resolver answers (any status) are relayed, never reinterpreted

use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    http::{header, uri::InvalidUri, HeaderValue, Method, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use opentelemetry::{Context, KeyValue};
use thiserror::Error;

use crate::config::RelayConfig;
use crate::http::request::{Zipcode, ZipcodeRequest, X_REQUEST_ID};
use crate::http::response::RelayError;
use crate::observability::metrics;
use crate::observability::{SpanGuard, SpanKind, Telemetry};

pub const CALL_DOWNSTREAM_SPAN: &str = "edge.call_downstream";

/// Errors building a [`Forwarder`].
#[derive(Debug, Error)]
pub enum ForwarderError {
    #[error("invalid downstream URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: InvalidUri,
    },
}

/// A resolver answer as received.
#[derive(Debug, Clone)]
pub struct Relayed {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

impl IntoResponse for Relayed {
    fn into_response(self) -> Response {
        let content_type = self
            .content_type
            .unwrap_or_else(|| HeaderValue::from_static("application/json"));
        (self.status, [(header::CONTENT_TYPE, content_type)], self.body).into_response()
    }
}

/// HTTP client bound to the resolver endpoint.
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
    endpoint: Uri,
    deadline: Duration,
    max_response_bytes: usize,
}

impl Forwarder {
    pub fn new(config: &RelayConfig) -> Result<Self, ForwarderError> {
        let endpoint = config
            .edge
            .downstream_url
            .parse::<Uri>()
            .map_err(|source| ForwarderError::InvalidUrl {
                url: config.edge.downstream_url.clone(),
                source,
            })?;

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.timeouts.connect_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            client,
            endpoint,
            deadline: Duration::from_secs(config.timeouts.upstream_secs),
            max_response_bytes: config.edge.max_response_bytes,
        })
    }

    pub fn endpoint(&self) -> &Uri {
        &self.endpoint
    }

    /// Send `zipcode` to the resolver inside a client span child of `parent`.
    pub async fn forward(
        &self,
        zipcode: &Zipcode,
        telemetry: &Telemetry,
        parent: &Context,
        request_id: Option<&HeaderValue>,
    ) -> Result<Relayed, RelayError> {
        let span = telemetry.start_span(CALL_DOWNSTREAM_SPAN, SpanKind::Client, parent);
        span.set_attribute(KeyValue::new("http.url", self.endpoint.to_string()));
        let start = Instant::now();

        let result = self.send(zipcode, telemetry, &span, request_id).await;

        match &result {
            Ok(relayed) => {
                metrics::record_upstream("downstream", "ok", start);
                span.set_attribute(KeyValue::new(
                    "http.status_code",
                    i64::from(relayed.status.as_u16()),
                ));
                if relayed.status.is_server_error() {
                    span.fail(&format!("downstream answered {}", relayed.status));
                } else {
                    span.succeed();
                }
            }
            Err(e) => {
                metrics::record_upstream("downstream", "error", start);
                span.fail(e);
            }
        }

        result
    }

    async fn send(
        &self,
        zipcode: &Zipcode,
        telemetry: &Telemetry,
        span: &SpanGuard,
        request_id: Option<&HeaderValue>,
    ) -> Result<Relayed, RelayError> {
        let payload = serde_json::to_vec(&ZipcodeRequest::from(zipcode)).map_err(|e| {
            tracing::error!(error = %e, "Failed to encode downstream body");
            RelayError::DownstreamUnreachable
        })?;

        let mut request = Request::builder()
            .method(Method::POST)
            .uri(self.endpoint.clone())
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload))
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to build downstream request");
                RelayError::DownstreamUnreachable
            })?;

        telemetry.carrier().inject(span.context(), request.headers_mut());
        if let Some(id) = request_id {
            request.headers_mut().insert(X_REQUEST_ID, id.clone());
        }

        match tokio::time::timeout(self.deadline, self.exchange(request)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(
                    endpoint = %self.endpoint,
                    deadline = ?self.deadline,
                    "Downstream request timed out"
                );
                Err(RelayError::DownstreamUnreachable)
            }
        }
    }

    async fn exchange(&self, request: Request<Body>) -> Result<Relayed, RelayError> {
        let response = self.client.request(request).await.map_err(|e| {
            tracing::error!(endpoint = %self.endpoint, error = %e, "Downstream request failed");
            RelayError::DownstreamUnreachable
        })?;

        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(Body::new(body), self.max_response_bytes)
            .await
            .map_err(|e| {
                tracing::error!(endpoint = %self.endpoint, error = %e, "Failed to read downstream response");
                RelayError::DownstreamUnreachable
            })?;

        Ok(Relayed {
            status: parts.status,
            content_type: parts.headers.get(header::CONTENT_TYPE).cloned(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_parses_endpoint() {
        let mut config = RelayConfig::default();
        config.edge.downstream_url = "http://127.0.0.1:8081".into();
        let forwarder = Forwarder::new(&config).unwrap();
        assert_eq!(forwarder.endpoint().port_u16(), Some(8081));
    }

    #[test]
    fn test_new_rejects_garbage_url() {
        let mut config = RelayConfig::default();
        config.edge.downstream_url = "http://bad host".into();
        assert!(matches!(
            Forwarder::new(&config),
            Err(ForwarderError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_relayed_defaults_to_json() {
        let response = Relayed {
            status: StatusCode::NOT_FOUND,
            content_type: None,
            body: Bytes::from_static(b"can not find zipcode"),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    }
}

//! Edge request handler.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};
use opentelemetry::KeyValue;

use crate::edge::forwarder::{Forwarder, Relayed};
use crate::http::request::{request_id, request_id_str, validate_body};
use crate::http::response::RelayError;
use crate::observability::metrics;
use crate::observability::{SpanGuard, SpanKind, Telemetry};

pub const INBOUND_SPAN: &str = "edge.inbound";

/// State injected into the edge handler.
#[derive(Clone)]
pub struct EdgeState {
    pub forwarder: Arc<Forwarder>,
    pub telemetry: Arc<Telemetry>,
}

/// Validate the zipcode locally, then relay the resolver's answer.
pub async fn weather_handler(
    State(state): State<EdgeState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let parent = state.telemetry.carrier().extract(&headers);
    let span = state
        .telemetry
        .start_span(INBOUND_SPAN, SpanKind::Server, &parent);
    let request_id_log = request_id_str(&headers);

    tracing::debug!(
        request_id = %request_id_log,
        client = %addr,
        trace_id = %span.trace_id(),
        "Weather request received"
    );

    let response = match relay(&state, &span, request_id(&headers), &body).await {
        Ok(relayed) => {
            span.set_attribute(KeyValue::new(
                "http.status_code",
                i64::from(relayed.status.as_u16()),
            ));
            if relayed.status.is_server_error() {
                span.fail(&format!("resolver answered {}", relayed.status));
            } else {
                span.succeed();
            }
            tracing::info!(
                request_id = %request_id_log,
                status = relayed.status.as_u16(),
                "Weather request relayed"
            );
            relayed.into_response()
        }
        Err(e) => {
            span.set_attribute(KeyValue::new("error.kind", e.kind()));
            span.fail(&e);
            tracing::warn!(
                request_id = %request_id_log,
                status = e.status().as_u16(),
                error = %e,
                "Weather request rejected"
            );
            e.into_response()
        }
    };

    metrics::record_request("edge", response.status().as_u16(), start);
    response
}

async fn relay(
    state: &EdgeState,
    span: &SpanGuard,
    request_id: Option<&HeaderValue>,
    body: &[u8],
) -> Result<Relayed, RelayError> {
    let zipcode = validate_body(body)?;
    state
        .forwarder
        .forward(&zipcode, &state.telemetry, span.context(), request_id)
        .await
}

//! Resolver request handler.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use opentelemetry::KeyValue;

use crate::http::request::{request_id_str, validate_body};
use crate::observability::metrics;
use crate::observability::{SpanGuard, SpanKind, Telemetry};
use crate::resolver::pipeline::{ResolverPipeline, Stage, StageError, WeatherResult};

pub const INBOUND_SPAN: &str = "resolver.inbound";

/// State injected into the resolver handler.
#[derive(Clone)]
pub struct ResolverState {
    pub pipeline: ResolverPipeline,
    pub telemetry: Arc<Telemetry>,
}

pub async fn resolve_handler(
    State(state): State<ResolverState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let parent = state.telemetry.carrier().extract(&headers);
    let span = state
        .telemetry
        .start_span(INBOUND_SPAN, SpanKind::Server, &parent);
    let request_id = request_id_str(&headers);

    tracing::debug!(
        request_id = %request_id,
        client = %addr,
        trace_id = %span.trace_id(),
        "Resolve request received"
    );

    let response = match resolve(&state, &span, &body).await {
        Ok(result) => {
            span.set_attribute(KeyValue::new("relay.stage", Stage::Responded.as_str()));
            span.succeed();
            tracing::info!(
                request_id = %request_id,
                city = %result.city,
                temp_c = result.temperatures.celsius,
                "Weather resolved"
            );
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(failure) => {
            span.set_attribute(KeyValue::new("relay.stage", Stage::Errored.as_str()));
            span.set_attribute(KeyValue::new("relay.failed_after", failure.reached.as_str()));
            span.set_attribute(KeyValue::new("error.kind", failure.error.kind()));
            span.fail(&failure.error);
            tracing::warn!(
                request_id = %request_id,
                stage = %failure.reached,
                status = failure.error.status().as_u16(),
                error = %failure.error,
                "Resolve request failed"
            );
            failure.error.into_response()
        }
    };

    metrics::record_request("resolver", response.status().as_u16(), start);
    response
}

async fn resolve(
    state: &ResolverState,
    span: &SpanGuard,
    body: &[u8],
) -> Result<WeatherResult, StageError> {
    let zipcode = validate_body(body).map_err(|error| StageError {
        reached: Stage::Received,
        error,
    })?;

    state
        .pipeline
        .run(&zipcode, &state.telemetry, span.context())
        .await
}

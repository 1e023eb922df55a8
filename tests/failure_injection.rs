//! Failure injection tests for the relay.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use opentelemetry::trace::Status;
use weather_relay::http::HttpServer;
use weather_relay::resolver::{ProviderError, ResolverPipeline, WeatherProvider};

mod common;

struct StalledWeather;

#[async_trait]
impl WeatherProvider for StalledWeather {
    async fn lookup(&self, _city: &str) -> Result<f64, ProviderError> {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(20.0)
    }
}

#[tokio::test]
async fn test_downstream_unreachable() {
    let (telemetry, spans) = common::telemetry("edge");
    let edge = common::spawn_edge(common::dead_addr().await, telemetry.clone()).await;

    let res = common::client()
        .post(edge.url("/weather"))
        .json(&serde_json::json!({ "cep": "01001000" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        res.text().await.unwrap(),
        "error making request to downstream service"
    );

    telemetry.flush();
    let finished = spans.get_finished_spans().unwrap();
    let call = finished
        .iter()
        .find(|s| s.name == "edge.call_downstream")
        .unwrap();
    assert!(matches!(call.status, Status::Error { .. }));
}

#[tokio::test]
async fn test_downstream_timeout() {
    let backend = common::start_programmable_backend(|| async {
        tokio::time::sleep(Duration::from_secs(3)).await;
        (200, "application/json", "{}".to_string())
    })
    .await;
    let (telemetry, _spans) = common::telemetry("edge");
    let edge = common::spawn_edge(backend.addr, telemetry).await;

    let res = common::client()
        .post(edge.url("/weather"))
        .json(&serde_json::json!({ "cep": "01001000" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(backend.hits(), 1);
}

#[tokio::test]
async fn test_weather_failure_through_edge() {
    let zipcodes = Arc::new(common::StaticZipcodes::new(&[("01001000", "Sao Paulo")]));
    let weather = Arc::new(common::StaticWeather::new(None));
    let (b_telemetry, _b_spans) = common::telemetry("resolver");
    let resolver = common::spawn_resolver(zipcodes, weather.clone(), b_telemetry).await;
    let (a_telemetry, _a_spans) = common::telemetry("edge");
    let edge = common::spawn_edge(resolver.addr, a_telemetry).await;

    let res = common::client()
        .post(edge.url("/weather"))
        .json(&serde_json::json!({ "cep": "01001000" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.text().await.unwrap(), "error fetching weather information");
    assert_eq!(weather.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unknown_zipcode_through_edge() {
    let zipcodes = Arc::new(common::StaticZipcodes::new(&[]));
    let weather = Arc::new(common::StaticWeather::new(Some(20.0)));
    let (b_telemetry, b_spans) = common::telemetry("resolver");
    let resolver = common::spawn_resolver(zipcodes, weather.clone(), b_telemetry.clone()).await;
    let (a_telemetry, _a_spans) = common::telemetry("edge");
    let edge = common::spawn_edge(resolver.addr, a_telemetry).await;

    let res = common::client()
        .post(edge.url("/weather"))
        .json(&serde_json::json!({ "cep": "99999999" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.text().await.unwrap(), "can not find zipcode");
    assert_eq!(weather.calls.load(Ordering::SeqCst), 0);

    b_telemetry.flush();
    let names: Vec<_> = b_spans
        .get_finished_spans()
        .unwrap()
        .iter()
        .map(|s| s.name.to_string())
        .collect();
    assert!(names.contains(&"resolver.resolve_city".to_string()));
    assert!(!names.contains(&"resolver.fetch_weather".to_string()));
}

#[tokio::test]
async fn test_request_timeout_closes_spans_as_errors() {
    let zipcodes = Arc::new(common::StaticZipcodes::new(&[("01001000", "Sao Paulo")]));
    let (telemetry, spans) = common::telemetry("resolver");
    let mut config = common::test_config();
    config.timeouts.request_secs = 1;
    let pipeline = ResolverPipeline::new(zipcodes, Arc::new(StalledWeather));
    let resolver =
        common::serve(HttpServer::resolver(&config, telemetry.clone(), pipeline, None)).await;

    let res = common::client()
        .post(resolver.url("/"))
        .json(&serde_json::json!({ "cep": "01001000" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::REQUEST_TIMEOUT);

    // The handler future is dropped by the timeout layer; wait for both spans to end.
    let mut finished = Vec::new();
    for _ in 0..20 {
        telemetry.flush();
        finished = spans.get_finished_spans().unwrap();
        if finished.iter().any(|s| s.name == "resolver.inbound") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    for name in ["resolver.inbound", "resolver.fetch_weather"] {
        let span = finished
            .iter()
            .find(|s| s.name == name)
            .unwrap_or_else(|| panic!("no span named {name}"));
        assert!(
            matches!(span.status, Status::Error { .. }),
            "span {name} ended with {:?}",
            span.status
        );
    }
    let city = finished
        .iter()
        .find(|s| s.name == "resolver.resolve_city")
        .unwrap();
    assert_eq!(city.status, Status::Ok);
}

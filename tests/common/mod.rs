//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use opentelemetry_sdk::testing::trace::InMemorySpanExporter;
use opentelemetry_sdk::trace::TracerProvider;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use weather_relay::config::RelayConfig;
use weather_relay::http::{HttpServer, Zipcode};
use weather_relay::lifecycle::Shutdown;
use weather_relay::observability::Telemetry;
use weather_relay::resolver::{ProviderError, ResolverPipeline, WeatherProvider, ZipcodeProvider};

/// One request seen by a mock backend.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// A raw TCP backend answering with a programmable response.
pub struct MockBackend {
    pub addr: SocketAddr,
    pub requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockBackend {
    pub fn hits(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<Recorded> {
        self.requests.lock().unwrap().last().cloned()
    }
}

/// Start a programmable mock backend with async support.
///
/// `f` yields `(status, content-type, body)` for every request.
pub async fn start_programmable_backend<F, Fut>(f: F) -> MockBackend
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, &'static str, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let seen = requests.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let seen = seen.clone();
                    tokio::spawn(async move {
                        let Some(recorded) = read_request(&mut socket).await else {
                            return;
                        };
                        seen.lock().unwrap().push(recorded);

                        let (status, content_type, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            422 => "422 Unprocessable Entity",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            content_type,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    MockBackend { addr, requests }
}

async fn read_request(socket: &mut TcpStream) -> Option<Recorded> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let headers: HashMap<String, String> = head
        .lines()
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    while buf.len() < header_end + length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();
    Some(Recorded { headers, body })
}

/// An address nothing listens on.
pub async fn dead_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Telemetry that keeps finished spans in memory.
pub fn telemetry(service: &str) -> (Arc<Telemetry>, InMemorySpanExporter) {
    let exporter = InMemorySpanExporter::default();
    let provider = TracerProvider::builder()
        .with_simple_exporter(exporter.clone())
        .build();
    (Arc::new(Telemetry::from_provider(service, provider)), exporter)
}

/// Zipcode provider backed by a fixed table.
pub struct StaticZipcodes {
    cities: HashMap<&'static str, &'static str>,
    pub calls: AtomicUsize,
}

impl StaticZipcodes {
    pub fn new(entries: &[(&'static str, &'static str)]) -> Self {
        Self {
            cities: entries.iter().copied().collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ZipcodeProvider for StaticZipcodes {
    async fn lookup(&self, zipcode: &Zipcode) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.cities
            .get(zipcode.as_str())
            .map(|c| c.to_string())
            .ok_or_else(|| ProviderError::NotFound(zipcode.to_string()))
    }
}

/// Weather provider reporting one temperature everywhere, or failing.
pub struct StaticWeather {
    celsius: Option<f64>,
    pub calls: AtomicUsize,
}

impl StaticWeather {
    pub fn new(celsius: Option<f64>) -> Self {
        Self {
            celsius,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl WeatherProvider for StaticWeather {
    async fn lookup(&self, _city: &str) -> Result<f64, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.celsius
            .ok_or_else(|| ProviderError::Decode("weather backend down".into()))
    }
}

/// A server running in the background. Stops when dropped.
pub struct Running {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl Running {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub fn test_config() -> RelayConfig {
    let mut config = RelayConfig::default();
    config.observability.otlp_endpoint = None;
    config.timeouts.connect_secs = 1;
    config.timeouts.upstream_secs = 1;
    config.timeouts.request_secs = 5;
    config
}

pub async fn serve(server: HttpServer) -> Running {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });
    Running { addr, shutdown }
}

pub async fn spawn_resolver(
    zipcodes: Arc<dyn ZipcodeProvider>,
    weather: Arc<dyn WeatherProvider>,
    telemetry: Arc<Telemetry>,
) -> Running {
    let pipeline = ResolverPipeline::new(zipcodes, weather);
    serve(HttpServer::resolver(&test_config(), telemetry, pipeline, None)).await
}

pub async fn spawn_edge(downstream: SocketAddr, telemetry: Arc<Telemetry>) -> Running {
    let mut config = test_config();
    config.edge.downstream_url = format!("http://{}", downstream);
    serve(HttpServer::edge(&config, telemetry, None).unwrap()).await
}

/// Client that never reuses connections between tests.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

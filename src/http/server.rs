//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router for either role
//! - Wire up middleware (tracing, limits, timeout, request ID)
//! - Expose `/health` and, when a recorder is installed, `/metrics`
//! - Serve until the shutdown channel fires

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::schema::{EDGE_BIND_ADDRESS, RESOLVER_BIND_ADDRESS};
use crate::config::RelayConfig;
use crate::edge::{weather_handler, EdgeState, Forwarder, ForwarderError};
use crate::observability::Telemetry;
use crate::resolver::{resolve_handler, ResolverPipeline, ResolverState};

/// Which half of the relay this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Edge,
    Resolver,
}

impl Role {
    /// Default `service.name` for spans.
    pub fn service_name(&self) -> &'static str {
        match self {
            Role::Edge => "weather-edge",
            Role::Resolver => "weather-resolver",
        }
    }

    /// Listen address used when neither the config nor `--bind` sets one.
    pub fn default_bind_address(&self) -> &'static str {
        match self {
            Role::Edge => EDGE_BIND_ADDRESS,
            Role::Resolver => RESOLVER_BIND_ADDRESS,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Edge => f.write_str("edge"),
            Role::Resolver => f.write_str("resolver"),
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// HTTP server for one relay role.
pub struct HttpServer {
    router: Router,
    role: Role,
}

impl HttpServer {
    /// Edge server: `POST /weather` (and `POST /`) forward to the resolver.
    pub fn edge(
        config: &RelayConfig,
        telemetry: Arc<Telemetry>,
        prometheus: Option<PrometheusHandle>,
    ) -> Result<Self, ForwarderError> {
        let state = EdgeState {
            forwarder: Arc::new(Forwarder::new(config)?),
            telemetry,
        };
        let routes = Router::new()
            .route("/weather", post(weather_handler))
            .route("/", post(weather_handler))
            .with_state(state);

        Ok(Self {
            router: Self::build_router(Role::Edge, config, routes, prometheus),
            role: Role::Edge,
        })
    }

    /// Resolver server: `POST /` runs the lookup pipeline.
    pub fn resolver(
        config: &RelayConfig,
        telemetry: Arc<Telemetry>,
        pipeline: ResolverPipeline,
        prometheus: Option<PrometheusHandle>,
    ) -> Self {
        let state = ResolverState {
            pipeline,
            telemetry,
        };
        let routes = Router::new()
            .route("/", post(resolve_handler))
            .with_state(state);

        Self {
            router: Self::build_router(Role::Resolver, config, routes, prometheus),
            role: Role::Resolver,
        }
    }

    /// Add shared routes and the middleware stack.
    #[allow(deprecated)]
    fn build_router(
        role: Role,
        config: &RelayConfig,
        routes: Router,
        prometheus: Option<PrometheusHandle>,
    ) -> Router {
        let mut router = routes.route("/health", get(move || health(role)));

        if let Some(handle) = prometheus {
            router = router.route(
                "/metrics",
                get(move || {
                    let handle = handle.clone();
                    async move { handle.render() }
                }),
            );
        }

        router
            .layer(DefaultBodyLimit::max(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(CatchPanicLayer::new())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            role = %self.role,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!(role = %self.role, "HTTP server stopped");
        Ok(())
    }
}

async fn health(role: Role) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        service: role.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

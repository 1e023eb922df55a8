//! weather-relay
//!
//! # Architecture Overview
//!
//! ```text
//!   Client                     edge                              resolver
//!   ──────  POST /weather  ┌──────────────┐   POST / + traceparent   ┌──────────────────┐
//!           {"cep": ..} ──▶│ validate     │─────────────────────────▶│ validate         │
//!                          │ edge.inbound │                          │ resolver.inbound │
//!                          │  └ call_down │                          │  ├ resolve_city ─┼─▶ ViaCEP
//!           ◀──────────────│    stream    │◀─────────────────────────│  └ fetch_weather ┼─▶ WeatherAPI
//!                          └──────────────┘   status + body relayed  └──────────────────┘
//!                                  │                                          │
//!                                  └──────────── OTLP spans ──────────────────┴──▶ collector
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use weather_relay::config::load_with_overrides;
use weather_relay::http::{HttpServer, Role};
use weather_relay::lifecycle::Shutdown;
use weather_relay::observability::logging::init_logging;
use weather_relay::observability::metrics::install_recorder;
use weather_relay::observability::Telemetry;
use weather_relay::resolver::providers::build_client;
use weather_relay::resolver::{ResolverPipeline, ViaCepProvider, WeatherApiProvider};

#[derive(Parser)]
#[command(name = "weather-relay", version)]
#[command(about = "Zipcode to weather relay with distributed tracing", long_about = None)]
struct Cli {
    /// TOML configuration file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address` (edge 0.0.0.0:8080, resolver 0.0.0.0:8081)
    #[arg(short, long, global = true)]
    bind: Option<String>,

    #[command(subcommand)]
    role: RoleCommand,
}

#[derive(Subcommand, Clone, Copy)]
enum RoleCommand {
    /// Validate zipcodes and forward them to the resolver
    Edge,
    /// Resolve zipcodes to city and temperature
    Resolver,
}

impl From<RoleCommand> for Role {
    fn from(command: RoleCommand) -> Self {
        match command {
            RoleCommand::Edge => Role::Edge,
            RoleCommand::Resolver => Role::Resolver,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let role = Role::from(cli.role);
    let config = load_with_overrides(cli.config.as_deref(), cli.bind.as_deref())?;
    let bind_address = config
        .listener
        .bind_address_or(role.default_bind_address())
        .to_string();

    init_logging(&config.observability);

    tracing::info!(
        role = %role,
        version = env!("CARGO_PKG_VERSION"),
        "weather-relay starting"
    );
    tracing::info!(
        bind_address = %bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        upstream_timeout_secs = config.timeouts.upstream_secs,
        "Configuration loaded"
    );

    let service = config
        .observability
        .service_name
        .clone()
        .unwrap_or_else(|| role.service_name().to_string());
    let telemetry = Arc::new(Telemetry::init(&service, &config.observability)?);

    let prometheus = if config.observability.metrics_enabled {
        Some(install_recorder()?)
    } else {
        None
    };

    let server = match role {
        Role::Edge => {
            tracing::info!(downstream = %config.edge.downstream_url, "Forwarding to resolver");
            HttpServer::edge(&config, telemetry.clone(), prometheus)?
        }
        Role::Resolver => {
            if config.resolver.weather_api_key.is_empty() {
                tracing::warn!("No weather API key configured; weather lookups will fail");
            }
            let client = build_client(&config.timeouts)?;
            let pipeline = ResolverPipeline::new(
                Arc::new(ViaCepProvider::from_config(client.clone(), &config.resolver)),
                Arc::new(WeatherApiProvider::from_config(client, &config.resolver)),
            );
            HttpServer::resolver(&config, telemetry.clone(), pipeline, prometheus)
        }
    };

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();
    server.run(listener, shutdown.subscribe()).await?;

    telemetry.flush();
    tracing::info!("Shutdown complete");
    Ok(())
}

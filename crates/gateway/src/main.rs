use std::path::Path;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use observer_gateway::api::{self, AppState};
use observer_gateway::{GatewayConfig, StorageClient};

/// Observer gateway HTTP server.
#[derive(Parser, Debug)]
#[command(name = "observer-gateway", about = "Public HTTP gateway for Observer")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "observer-gateway.toml")]
    config: String,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration from TOML file, or use defaults if the file does not exist.
    let mut config: GatewayConfig = if Path::new(&cli.config).exists() {
        let contents = std::fs::read_to_string(&cli.config)?;
        toml::from_str(&contents)?
    } else {
        toml::from_str("")?
    };
    if config.telemetry.service_name == "observer" {
        config.telemetry.service_name = "observer-gateway".to_owned();
    }
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    // Initialize tracing (with optional OpenTelemetry layer). Must happen
    // after config is loaded so we know whether export is enabled, but
    // before any tracing calls.
    let (tracer, telemetry_guard) = observer_trace::telemetry::init(&config.telemetry);

    if !Path::new(&cli.config).exists() {
        info!(path = %cli.config, "config file not found, using defaults");
    }

    let client = StorageClient::new(
        config.storage.addr.clone(),
        Duration::from_secs(config.storage.timeout_seconds),
    );
    let state = AppState::new(tracer, client);
    let router = api::router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, storage = %config.storage.addr, "gateway listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    telemetry_guard.shutdown();
    Ok(())
}

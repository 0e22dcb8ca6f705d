use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use observer_storage::{StorageConfig, StorageService, create_store, server};

/// Observer storage RPC server.
#[derive(Parser, Debug)]
#[command(name = "observer-storage", about = "Book storage service for Observer")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "observer-storage.toml")]
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
    let mut config: StorageConfig = if Path::new(&cli.config).exists() {
        let contents = std::fs::read_to_string(&cli.config)?;
        toml::from_str(&contents)?
    } else {
        toml::from_str("")?
    };
    if config.telemetry.service_name == "observer" {
        config.telemetry.service_name = "observer-storage".to_owned();
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

    let store = create_store(&config.store).await?;
    info!(backend = %config.store.backend, "book store initialized");

    let service = Arc::new(StorageService::new(store, tracer));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;

    tokio::select! {
        result = server::serve(listener, service) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    telemetry_guard.shutdown();
    Ok(())
}

use serde::Deserialize;

use observer_trace::TelemetryConfig;

/// Top-level configuration for the gateway, loaded from TOML.
#[derive(Debug, Default, Deserialize)]
pub struct GatewayConfig {
    /// HTTP listener bind configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Connection to the storage service.
    #[serde(default)]
    pub storage: StorageUpstreamConfig,
    /// Distributed tracing configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Bind address for the HTTP listener.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Host to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_owned()
}

fn default_port() -> u16 {
    1323
}

/// Where to reach the storage service.
#[derive(Debug, Deserialize)]
pub struct StorageUpstreamConfig {
    /// Address of the storage RPC listener.
    #[serde(default = "default_storage_addr")]
    pub addr: String,

    /// Per-call timeout in seconds, covering connect plus request.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for StorageUpstreamConfig {
    fn default() -> Self {
        Self {
            addr: default_storage_addr(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_storage_addr() -> String {
    "127.0.0.1:9991".to_owned()
}

fn default_timeout() -> u64 {
    10
}

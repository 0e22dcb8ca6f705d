//! The Observer gateway.
//!
//! Public HTTP face of the system. Inbound requests arrive over HTTP where
//! the W3C propagator handles trace headers automatically; the hop to the
//! storage service has no such support, so the gateway injects the bare
//! trace id into the RPC metadata by hand before each call.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod metrics;

pub use client::{ClientError, StorageClient};
pub use config::GatewayConfig;
pub use error::GatewayError;
pub use metrics::{GatewayMetrics, MetricsSnapshot};

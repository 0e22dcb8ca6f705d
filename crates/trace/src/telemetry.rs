//! Tracing initialization and shutdown for the Observer binaries.
//!
//! Sets up a [`tracing_subscriber`] registry combining the standard `fmt`
//! layer with an OpenTelemetry layer backed by an OTLP exporter, and hands
//! back the [`ServiceTracer`] every component receives explicitly. Shutdown
//! is ordered: pending spans are flushed before the exporter closes.

use std::time::Duration;

use opentelemetry::trace::TracerProvider;
use opentelemetry::{KeyValue, global};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::{BatchSpanProcessor, Sampler, SdkTracerProvider};
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::tracer::ServiceTracer;

/// OpenTelemetry configuration shared by both binaries.
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Whether span export is enabled. When false, spans are still created
    /// (the propagation contract holds) but are never exported.
    #[serde(default)]
    pub enabled: bool,
    /// OTLP exporter endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Service name reported in traces.
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// OTLP transport protocol: `"grpc"` or `"http"`.
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// Exporter timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_endpoint(),
            service_name: default_service_name(),
            protocol: default_protocol(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_endpoint() -> String {
    "http://127.0.0.1:4317".to_owned()
}

fn default_service_name() -> String {
    "observer".to_owned()
}

fn default_protocol() -> String {
    "grpc".to_owned()
}

fn default_timeout() -> u64 {
    10
}

/// Opaque handle returned by [`init`]. Dropping it is a no-op; call
/// [`TelemetryGuard::shutdown`] for a clean flush of pending spans.
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl TelemetryGuard {
    /// Flush pending spans, then shut down the exporter.
    ///
    /// Call this on the single teardown path of the process so in-flight
    /// trace data is not lost.
    pub fn shutdown(mut self) {
        if let Some(provider) = self.provider.take()
            && let Err(e) = provider.shutdown()
        {
            tracing::warn!(error = %e, "tracer provider shutdown failed");
        }
    }
}

/// Initialize the tracing subscriber and build the process tracer.
///
/// When `config.enabled` is true, spans flow to an OTLP collector through a
/// batch processor; the subscriber combines `fmt` with an OpenTelemetry
/// layer. When disabled (or if the exporter fails to build), only the
/// standard `fmt` subscriber is installed and the returned tracer exports
/// nothing. Telemetry misconfiguration never prevents startup.
///
/// This system always samples; no probabilistic sampling is modeled.
pub fn init(config: &TelemetryConfig) -> (ServiceTracer, TelemetryGuard) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer();

    if !config.enabled {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();

        let provider = SdkTracerProvider::builder().build();
        return (
            ServiceTracer::new(provider, config.service_name.clone()),
            TelemetryGuard { provider: None },
        );
    }

    // Register the W3C propagator globally so the automatic HTTP boundary
    // can extract `traceparent`/`tracestate` headers.
    global::set_text_map_propagator(opentelemetry_sdk::propagation::TraceContextPropagator::new());

    let exporter = match build_exporter(config) {
        Ok(exporter) => exporter,
        Err(e) => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .init();
            tracing::error!(
                error = %e,
                endpoint = %config.endpoint,
                protocol = %config.protocol,
                "failed to build OTLP exporter, falling back to fmt-only tracing"
            );
            let provider = SdkTracerProvider::builder().build();
            return (
                ServiceTracer::new(provider, config.service_name.clone()),
                TelemetryGuard { provider: None },
            );
        }
    };

    let resource = Resource::builder()
        .with_attributes(vec![
            KeyValue::new("service.name", config.service_name.clone()),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        ])
        .build();

    let provider = SdkTracerProvider::builder()
        .with_span_processor(BatchSpanProcessor::builder(exporter).build())
        .with_sampler(Sampler::AlwaysOn)
        .with_resource(resource)
        .build();

    global::set_tracer_provider(provider.clone());

    let tracer = provider.tracer(config.service_name.clone());
    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_layer)
        .init();

    info!(
        endpoint = %config.endpoint,
        protocol = %config.protocol,
        service = %config.service_name,
        "OpenTelemetry tracing enabled"
    );

    (
        ServiceTracer::new(provider.clone(), config.service_name.clone()),
        TelemetryGuard {
            provider: Some(provider),
        },
    )
}

/// Build the OTLP span exporter based on the configured protocol.
fn build_exporter(
    config: &TelemetryConfig,
) -> Result<opentelemetry_otlp::SpanExporter, opentelemetry::trace::TraceError> {
    let timeout = Duration::from_secs(config.timeout_seconds);

    match config.protocol.as_str() {
        "http" => opentelemetry_otlp::SpanExporter::builder()
            .with_http()
            .with_endpoint(&config.endpoint)
            .with_timeout(timeout)
            .build(),
        "grpc" => opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(&config.endpoint)
            .with_timeout(timeout)
            .build(),
        other => {
            tracing::warn!(
                protocol = %other,
                "unknown telemetry protocol, defaulting to gRPC"
            );
            opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .with_endpoint(&config.endpoint)
                .with_timeout(timeout)
                .build()
        }
    }
}

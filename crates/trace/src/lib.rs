//! Cross-process trace-context propagation for the Observer services.
//!
//! The gateway-to-storage RPC transport carries no automatic trace headers,
//! so the trace id crosses that hop as a plain metadata field. This crate
//! owns everything on either side of that boundary:
//!
//! - [`carrier`]: encode/decode the trace id to/from the metadata map.
//! - [`context`]: reconstruct a remote parent [`opentelemetry::Context`]
//!   from a bare trace id (synthetic zero span id).
//! - [`tracer`]: a thin tracer wrapper passed explicitly to components;
//!   no ambient globals in the request path.
//! - [`bridge`]: the boundary-adapter strategy and the inbound state
//!   machine (untraced / child-span / malformed-abort).
//! - [`telemetry`]: process-wide init and ordered flush-then-close
//!   shutdown of the OTLP export pipeline.

pub mod bridge;
pub mod carrier;
pub mod context;
pub mod error;
pub mod telemetry;
pub mod tracer;

pub use bridge::{BoundaryAdapter, ManualTraceBoundary, PropagationBridge, PropagatorBoundary};
pub use carrier::TRACE_ID_FIELD;
pub use context::CONTINUED_FROM_REMOTE;
pub use error::PropagationError;
pub use telemetry::{TelemetryConfig, TelemetryGuard};
pub use tracer::ServiceTracer;

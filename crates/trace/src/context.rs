//! Reconstruction of a parent execution context from a bare trace id.

use opentelemetry::Context;
use opentelemetry::trace::{SpanContext, SpanId, TraceContextExt, TraceFlags, TraceId, TraceState};

/// Span attribute marking spans whose parent is the synthetic zero span id.
///
/// Only the trace id crosses the RPC hop, so the reconstructed parent
/// carries no real span id. Exported child spans reference that zero
/// sentinel as their parent; this attribute tells trace tooling the parent
/// lives in the caller's process rather than pointing at a dangling span.
pub const CONTINUED_FROM_REMOTE: &str = "trace.continued_from_remote";

/// Build an execution context whose remote parent carries `trace_id` and a
/// synthetic zero span id.
///
/// The result is valid for parenting child spans (the tracer takes the
/// trace id from it) but is never exported as a producing span itself.
/// Callers must pass a validated, non-zero trace id; see
/// [`crate::carrier::parse_trace_id`].
pub fn remote_parent(trace_id: TraceId) -> Context {
    let span_context = SpanContext::new(
        trace_id,
        SpanId::INVALID,
        TraceFlags::SAMPLED,
        true,
        TraceState::default(),
    );
    Context::new().with_remote_span_context(span_context)
}

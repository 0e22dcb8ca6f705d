//! The propagation bridge: boundary adapters plus the inbound state machine.
//!
//! Two adapter strategies exist because the two transports in this system
//! differ. HTTP between external clients and the gateway is wrapped by the
//! W3C text-map propagator ([`PropagatorBoundary`], lenient: an invalid
//! `traceparent` degrades to untraced). The RPC hop between gateway and
//! storage has no such support, so [`ManualTraceBoundary`] carries the bare
//! trace id in a metadata field and is strict: a malformed id aborts the
//! inbound operation instead of being silently dropped.

use std::collections::HashMap;
use std::sync::Arc;

use opentelemetry::trace::{FutureExt, SpanId, Status, TraceContextExt};
use opentelemetry::propagation::{Extractor, Injector};
use opentelemetry::{Context, KeyValue, global};

use crate::carrier;
use crate::context::{self, CONTINUED_FROM_REMOTE};
use crate::error::PropagationError;
use crate::tracer::ServiceTracer;

/// Transport-specific injection/extraction of trace context.
///
/// One implementation per transport; selecting the adapter makes the
/// propagation mechanism of each boundary explicit and testable.
pub trait BoundaryAdapter: Send + Sync {
    /// Read inbound metadata and reconstruct a parent context.
    ///
    /// `Ok(None)` means the call carries no trace context and must proceed
    /// untraced; `Err` means the context was present but unusable.
    fn extract(
        &self,
        metadata: &HashMap<String, String>,
    ) -> Result<Option<Context>, PropagationError>;

    /// Attach the active trace context to outbound metadata, if any.
    fn inject(&self, cx: &Context, metadata: &mut HashMap<String, String>);
}

/// The manual adapter: a single `x-trace-id` field, nothing else.
///
/// The reconstructed parent carries a synthetic zero span id; only the
/// trace id survives this hop.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualTraceBoundary;

impl BoundaryAdapter for ManualTraceBoundary {
    fn extract(
        &self,
        metadata: &HashMap<String, String>,
    ) -> Result<Option<Context>, PropagationError> {
        let trace_id = carrier::extract_trace_id(metadata)?;
        Ok(trace_id.map(context::remote_parent))
    }

    fn inject(&self, cx: &Context, metadata: &mut HashMap<String, String>) {
        carrier::inject_trace_id(cx, metadata);
    }
}

/// The automatic adapter: delegates to the globally registered text-map
/// propagator (W3C `traceparent`/`tracestate`).
///
/// Lenient by that propagator's contract: missing or invalid headers yield
/// `Ok(None)`, never an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropagatorBoundary;

impl BoundaryAdapter for PropagatorBoundary {
    fn extract(
        &self,
        metadata: &HashMap<String, String>,
    ) -> Result<Option<Context>, PropagationError> {
        let cx = global::get_text_map_propagator(|p| p.extract(&MapExtractor(metadata)));
        let linked = {
            let span = cx.span();
            let sc = span.span_context();
            sc.is_remote() && sc.is_valid()
        };
        if linked { Ok(Some(cx)) } else { Ok(None) }
    }

    fn inject(&self, cx: &Context, metadata: &mut HashMap<String, String>) {
        global::get_text_map_propagator(|p| {
            p.inject_context(cx, &mut MapInjector(metadata));
        });
    }
}

/// Carrier that reads from a `HashMap`.
struct MapExtractor<'a>(&'a HashMap<String, String>);

impl Extractor for MapExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }
}

/// Carrier that writes to a `HashMap`.
struct MapInjector<'a>(&'a mut HashMap<String, String>);

impl Injector for MapInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        self.0.insert(key.to_owned(), value);
    }
}

/// Inbound/outbound trace handling for one transport boundary.
///
/// Owns the tracer and the adapter for the boundary it guards; services
/// hold one bridge per transport they speak.
#[derive(Clone)]
pub struct PropagationBridge {
    tracer: ServiceTracer,
    boundary: Arc<dyn BoundaryAdapter>,
}

impl PropagationBridge {
    /// Bridge over the given adapter.
    pub fn new(tracer: ServiceTracer, boundary: Arc<dyn BoundaryAdapter>) -> Self {
        Self { tracer, boundary }
    }

    /// Bridge over the manual `x-trace-id` adapter.
    pub fn manual(tracer: ServiceTracer) -> Self {
        Self::new(tracer, Arc::new(ManualTraceBoundary))
    }

    /// The tracer this bridge starts spans with.
    pub fn tracer(&self) -> &ServiceTracer {
        &self.tracer
    }

    /// Attach the active trace context of `cx` to outbound metadata.
    pub fn inject(&self, cx: &Context, metadata: &mut HashMap<String, String>) {
        self.boundary.inject(cx, metadata);
    }

    /// Run `op` on the inbound side of the boundary.
    ///
    /// State machine per call:
    /// - no trace context in `metadata`: run `op` untraced; success path,
    ///   no span is created;
    /// - malformed trace context: abort before `op` runs, surfacing
    ///   [`PropagationError::MalformedTraceId`] through `E`;
    /// - valid trace context: start a child span parented to the
    ///   reconstructed context, run `op` with that span active, record an
    ///   error status if `op` fails, and end the span on every exit path.
    ///
    /// `op`'s own error is re-surfaced unmasked; a failed downstream call
    /// is never swallowed by tracing. If the returned future is dropped
    /// mid-flight the span is still finalized by scope.
    pub async fn serve<T, E, F, Fut>(
        &self,
        metadata: &HashMap<String, String>,
        name: &'static str,
        mut attributes: Vec<KeyValue>,
        op: F,
    ) -> Result<T, E>
    where
        E: From<PropagationError> + std::fmt::Display,
        F: FnOnce(Context) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let parent = match self.boundary.extract(metadata) {
            Ok(parent) => parent,
            Err(err) => return Err(E::from(err)),
        };
        let Some(parent) = parent else {
            return op(Context::current()).await;
        };

        if parent.span().span_context().span_id() == SpanId::INVALID {
            attributes.push(KeyValue::new(CONTINUED_FROM_REMOTE, true));
        }
        let cx = self.tracer.start_child(&parent, name, attributes);

        let result = op(cx.clone()).with_context(cx.clone()).await;
        match &result {
            Ok(_) => cx.span().end(),
            Err(err) => {
                let span = cx.span();
                span.set_status(Status::error(err.to_string()));
                span.end();
            }
        }
        result
    }
}

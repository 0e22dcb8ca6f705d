//! W3C Trace Context extraction middleware.
//!
//! Reads `traceparent`/`tracestate` from incoming requests through the
//! globally registered propagator and stashes the reconstructed parent (if
//! any) in a request extension. Handlers decide whether to start a root
//! span or continue the caller's trace; per the propagator's contract this
//! boundary is lenient, so a garbled `traceparent` degrades to no parent
//! rather than an error.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use opentelemetry::propagation::Extractor;
use opentelemetry::trace::TraceContextExt;
use opentelemetry::{Context, global};

/// Parent trace context recovered from the inbound HTTP request, if any.
#[derive(Clone, Default)]
pub struct TraceScope {
    /// The caller's context; `None` means the request arrived untraced.
    pub parent: Option<Context>,
}

/// Carrier that reads from HTTP header maps.
struct HeaderExtractor<'a>(&'a axum::http::HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(axum::http::HeaderName::as_str).collect()
    }
}

/// Axum middleware that captures the inbound trace context.
pub async fn extract_trace_scope(mut request: Request, next: Next) -> Response {
    let cx = global::get_text_map_propagator(|p| p.extract(&HeaderExtractor(request.headers())));

    let linked = {
        let span = cx.span();
        let sc = span.span_context();
        sc.is_remote() && sc.is_valid()
    };
    let scope = TraceScope {
        parent: linked.then_some(cx),
    };
    request.extensions_mut().insert(scope);

    next.run(request).await
}

//! Thin tracer wrapper passed explicitly to every component.
//!
//! Span lifetimes follow scope, not success: the SDK ends any still-open
//! span when its context is dropped, so a cancelled request still produces
//! a finished span. Finished spans are handed to the provider's span
//! processor; export happens out of line and never blocks the caller.

use opentelemetry::trace::{Span, SpanKind, Status, TraceContextExt, Tracer, TracerProvider};
use opentelemetry::{Context, KeyValue};
use opentelemetry_sdk::trace::SdkTracerProvider;

/// Per-process span factory.
///
/// Wraps the SDK provider with the instrumentation scope under which all
/// Observer spans are created. Clone freely; clones share the provider and
/// its export pipeline.
#[derive(Debug, Clone)]
pub struct ServiceTracer {
    provider: SdkTracerProvider,
    scope: String,
}

impl ServiceTracer {
    /// Wrap a provider under the given instrumentation scope name.
    pub fn new(provider: SdkTracerProvider, scope: impl Into<String>) -> Self {
        Self {
            provider,
            scope: scope.into(),
        }
    }

    /// The underlying SDK provider.
    pub fn provider(&self) -> &SdkTracerProvider {
        &self.provider
    }

    /// Start a root span: fresh trace id, fresh span id, sampled.
    ///
    /// The span is parented to an empty context on purpose so that no
    /// ambient span from the calling task leaks in as a parent.
    pub fn start_root(&self, name: &'static str, attributes: Vec<KeyValue>) -> Context {
        self.start_child(&Context::new(), name, attributes)
    }

    /// Start a child span under `parent`: same trace id, fresh span id.
    pub fn start_child(
        &self,
        parent: &Context,
        name: &'static str,
        attributes: Vec<KeyValue>,
    ) -> Context {
        let tracer = self.provider.tracer(self.scope.clone());
        let span = tracer
            .span_builder(name)
            .with_kind(SpanKind::Server)
            .with_attributes(attributes)
            .start_with_context(&tracer, parent);
        parent.with_span(span)
    }
}

/// End the span held by `cx`, leaving its status unset.
pub fn end_span(cx: &Context) {
    cx.span().end();
}

/// Mark the span held by `cx` as failed with `message`, then end it.
pub fn fail_span(cx: &Context, message: impl Into<String>) {
    let span = cx.span();
    span.set_status(Status::error(message.into()));
    span.end();
}

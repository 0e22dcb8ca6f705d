//! End-to-end behavior of the propagation bridge against an in-memory
//! span exporter.

use std::collections::HashMap;
use std::fmt;

use opentelemetry::trace::{SpanId, Status, TraceContextExt};
use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider};

use observer_trace::bridge::PropagationBridge;
use observer_trace::carrier::{self, TRACE_ID_FIELD};
use observer_trace::context::CONTINUED_FROM_REMOTE;
use observer_trace::error::PropagationError;
use observer_trace::tracer::ServiceTracer;

// -- Helpers --------------------------------------------------------------

#[derive(Debug)]
enum OpError {
    Propagation(PropagationError),
    Downstream(&'static str),
}

impl fmt::Display for OpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Propagation(e) => write!(f, "{e}"),
            Self::Downstream(msg) => write!(f, "downstream call failed: {msg}"),
        }
    }
}

impl From<PropagationError> for OpError {
    fn from(e: PropagationError) -> Self {
        Self::Propagation(e)
    }
}

fn test_bridge() -> (PropagationBridge, InMemorySpanExporter) {
    let exporter = InMemorySpanExporter::default();
    let provider = SdkTracerProvider::builder()
        .with_simple_exporter(exporter.clone())
        .build();
    let tracer = ServiceTracer::new(provider, "bridge-tests");
    (PropagationBridge::manual(tracer), exporter)
}

fn metadata_with(trace_id: &str) -> HashMap<String, String> {
    let mut metadata = HashMap::new();
    metadata.insert(TRACE_ID_FIELD.to_owned(), trace_id.to_owned());
    metadata
}

// -- Inbound state machine ------------------------------------------------

#[tokio::test]
async fn absent_trace_id_runs_untraced() {
    let (bridge, exporter) = test_bridge();

    let result: Result<&str, OpError> = bridge
        .serve(&HashMap::new(), "get_book", vec![], |_cx| async {
            Ok("payload")
        })
        .await;

    assert_eq!(result.unwrap(), "payload");
    assert!(exporter.get_finished_spans().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_trace_id_aborts_before_the_operation() {
    let (bridge, exporter) = test_bridge();
    let metadata = metadata_with("ZZZZ-not-a-trace-id");

    let mut ran = false;
    let result: Result<(), OpError> = bridge
        .serve(&metadata, "get_book", vec![], |_cx| {
            ran = true;
            async { Ok(()) }
        })
        .await;

    match result.unwrap_err() {
        OpError::Propagation(PropagationError::MalformedTraceId { value }) => {
            assert_eq!(value, "ZZZZ-not-a-trace-id");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!ran, "operation must not run on a malformed trace id");
    assert!(exporter.get_finished_spans().unwrap().is_empty());
}

#[tokio::test]
async fn valid_trace_id_parents_a_child_span() {
    let (bridge, exporter) = test_bridge();
    let metadata = metadata_with("11111111111111111111111111111111");

    let result: Result<(), OpError> = bridge
        .serve(&metadata, "get_book", vec![], |cx| async move {
            // The operation observes the reconstructed trace.
            assert_eq!(
                cx.span().span_context().trace_id().to_string(),
                "11111111111111111111111111111111"
            );
            Ok(())
        })
        .await;
    result.unwrap();

    let spans = exporter.get_finished_spans().unwrap();
    assert_eq!(spans.len(), 1);
    let span = &spans[0];
    assert_eq!(
        span.span_context.trace_id().to_string(),
        "11111111111111111111111111111111"
    );
    assert_ne!(span.span_context.span_id(), SpanId::INVALID);
    // The parent reference is the synthetic zero sentinel: the real parent
    // span lives in the caller's process and is never exported from here.
    assert_eq!(span.parent_span_id, SpanId::INVALID);
    assert!(
        span.attributes
            .iter()
            .any(|kv| kv.key.as_str() == CONTINUED_FROM_REMOTE),
        "continued-from-remote flag must be set"
    );
}

#[tokio::test]
async fn failing_operation_still_finalizes_the_span() {
    let (bridge, exporter) = test_bridge();
    let metadata = metadata_with("22222222222222222222222222222222");

    let result: Result<(), OpError> = bridge
        .serve(&metadata, "add_book", vec![], |_cx| async {
            Err(OpError::Downstream("connection refused"))
        })
        .await;

    // The downstream error is re-surfaced unmasked.
    assert!(matches!(result, Err(OpError::Downstream(_))));

    let spans = exporter.get_finished_spans().unwrap();
    assert_eq!(spans.len(), 1);
    assert!(matches!(spans[0].status, Status::Error { .. }));
    assert!(spans[0].end_time > spans[0].start_time);
}

#[tokio::test]
async fn cancelled_operation_still_finalizes_the_span() {
    let (bridge, exporter) = test_bridge();
    let metadata = metadata_with("33333333333333333333333333333333");

    // The task gets a clone so aborting it does not drop the last provider
    // handle: provider shutdown resets the in-memory exporter.
    let task_bridge = bridge.clone();
    let handle = tokio::spawn(async move {
        let _: Result<(), OpError> = task_bridge
            .serve(&metadata, "get_book", vec![], |_cx| async {
                std::future::pending::<()>().await;
                Ok(())
            })
            .await;
    });

    // Let the span start, then cancel the request mid-flight.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    handle.abort();
    assert!(handle.await.unwrap_err().is_cancelled());

    let spans = exporter.get_finished_spans().unwrap();
    assert_eq!(spans.len(), 1, "span must not leak on cancellation");
    assert_eq!(
        spans[0].span_context.trace_id().to_string(),
        "33333333333333333333333333333333"
    );
}

// -- Concurrency ----------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_calls_do_not_cross_contaminate() {
    let (bridge, exporter) = test_bridge();

    let mut handles = Vec::new();
    for i in 0..100u32 {
        let bridge = bridge.clone();
        handles.push(tokio::spawn(async move {
            let trace_id = format!("{:032x}", u128::from(i) + 1);
            let metadata = metadata_with(&trace_id);
            let result: Result<String, OpError> = bridge
                .serve(&metadata, "get_book", vec![], |cx| async move {
                    Ok(cx.span().span_context().trace_id().to_string())
                })
                .await;
            (trace_id, result.unwrap())
        }));
    }

    for handle in handles {
        let (sent, observed) = handle.await.unwrap();
        assert_eq!(sent, observed);
    }

    let spans = exporter.get_finished_spans().unwrap();
    assert_eq!(spans.len(), 100);

    let mut trace_ids: Vec<String> = spans
        .iter()
        .map(|s| s.span_context.trace_id().to_string())
        .collect();
    trace_ids.sort();
    trace_ids.dedup();
    assert_eq!(trace_ids.len(), 100, "each call keeps its own trace id");

    let mut span_ids: Vec<_> = spans.iter().map(|s| s.span_context.span_id()).collect();
    span_ids.sort_by_key(|id| id.to_bytes());
    span_ids.dedup();
    assert_eq!(span_ids.len(), 100, "span ids are unique per process run");
}

// -- Automatic boundary ----------------------------------------------------

#[tokio::test]
async fn propagator_boundary_degrades_silently_on_invalid_headers() {
    use observer_trace::bridge::{BoundaryAdapter, PropagatorBoundary};

    opentelemetry::global::set_text_map_propagator(
        opentelemetry_sdk::propagation::TraceContextPropagator::new(),
    );

    // Invalid traceparent: untraced, not an error (lenient HTTP policy).
    let mut metadata = HashMap::new();
    metadata.insert("traceparent".to_owned(), "not-a-valid-traceparent".to_owned());
    assert!(PropagatorBoundary.extract(&metadata).unwrap().is_none());

    // Valid traceparent: remote parent with the full span context.
    metadata.insert(
        "traceparent".to_owned(),
        "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01".to_owned(),
    );
    let parent = PropagatorBoundary
        .extract(&metadata)
        .unwrap()
        .expect("remote parent");
    let span = parent.span();
    let sc = span.span_context();
    assert_eq!(sc.trace_id().to_string(), "4bf92f3577b34da6a3ce929d0e0e4736");
    assert_eq!(sc.span_id().to_string(), "00f067aa0ba902b7");
}

// -- Outbound side --------------------------------------------------------

#[tokio::test]
async fn outbound_injection_feeds_the_inbound_side() {
    let (bridge, _exporter) = test_bridge();

    // Edge process: root span, trace id injected into call metadata.
    let root = bridge.tracer().start_root("edge_op", vec![]);
    let mut metadata = HashMap::new();
    bridge.inject(&root, &mut metadata);
    let sent = metadata.get(TRACE_ID_FIELD).cloned().expect("injected");
    assert_eq!(
        sent,
        carrier::format_trace_id(root.span().span_context().trace_id())
    );

    // Storage process: the same id is reconstructed and parents the child.
    let (downstream, exporter) = test_bridge();
    let result: Result<(), OpError> = downstream
        .serve(&metadata, "storage_op", vec![], |_cx| async { Ok(()) })
        .await;
    result.unwrap();

    let spans = exporter.get_finished_spans().unwrap();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].span_context.trace_id().to_string(), sent);
}

//! Service-level tests: RPC dispatch, trace propagation at the manual
//! boundary, and the framed TCP transport.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use observer_core::rpc::{RpcErrorCode, RpcRequest, RpcResponse};
use observer_core::{Book, BookDraft};
use observer_storage::{BookStore, MemoryBookStore, StorageService, server};
use observer_trace::{ServiceTracer, TRACE_ID_FIELD};

fn test_service() -> (Arc<MemoryBookStore>, StorageService, InMemorySpanExporter) {
    let exporter = InMemorySpanExporter::default();
    let provider = SdkTracerProvider::builder()
        .with_simple_exporter(exporter.clone())
        .build();
    let tracer = ServiceTracer::new(provider, "storage-test".to_owned());
    let store = Arc::new(MemoryBookStore::seeded());
    let service = StorageService::new(Arc::clone(&store) as Arc<dyn BookStore>, tracer);
    (store, service, exporter)
}

fn get_book_request(id: i64, metadata: HashMap<String, String>) -> RpcRequest {
    RpcRequest {
        method: "storage.get_book".to_owned(),
        metadata,
        params: json!({ "id": id }),
    }
}

// -- Dispatch ----------------------------------------------------------------

#[tokio::test]
async fn get_book_returns_seeded_book() {
    let (_, service, _) = test_service();

    let response = service.handle(get_book_request(1, HashMap::new())).await;

    assert!(response.error.is_none());
    let book: Book = serde_json::from_value(response.result.expect("result")).unwrap();
    assert_eq!(book.id, 1);
    assert_eq!(book.details.title, "ONE");
}

#[tokio::test]
async fn get_missing_book_is_not_found() {
    let (_, service, _) = test_service();

    let response = service.handle(get_book_request(404, HashMap::new())).await;

    let error = response.error.expect("error");
    assert_eq!(error.code, RpcErrorCode::NotFound);
}

#[tokio::test]
async fn add_book_persists_and_returns_id() {
    let (store, service, _) = test_service();
    let before = store.len();

    let response = service
        .handle(RpcRequest {
            method: "storage.add_book".to_owned(),
            metadata: HashMap::new(),
            params: json!({
                "title": "Solaris",
                "author": "Stanislaw Lem",
                "price": 12.5,
            }),
        })
        .await;

    assert!(response.error.is_none());
    let id = response.result.expect("result")["id"].as_i64().expect("id");
    assert_eq!(store.len(), before + 1);

    let fetched = service.handle(get_book_request(id, HashMap::new())).await;
    let book: Book = serde_json::from_value(fetched.result.expect("result")).unwrap();
    assert_eq!(book.details.title, "Solaris");
}

#[tokio::test]
async fn unknown_method_is_rejected() {
    let (_, service, _) = test_service();

    let response = service
        .handle(RpcRequest::new(
            "storage.delete_book",
            HashMap::new(),
            json!({ "id": 1 }),
        ))
        .await;

    assert_eq!(response.error.expect("error").code, RpcErrorCode::UnknownMethod);
}

#[tokio::test]
async fn malformed_params_are_bad_request() {
    let (_, service, _) = test_service();

    let response = service
        .handle(RpcRequest::new(
            "storage.get_book",
            HashMap::new(),
            json!({ "id": "one" }),
        ))
        .await;

    assert_eq!(response.error.expect("error").code, RpcErrorCode::BadRequest);
}

// -- Trace propagation -------------------------------------------------------

#[tokio::test]
async fn valid_trace_id_continues_the_callers_trace() {
    let (_, service, exporter) = test_service();
    let trace_id = "11111111111111111111111111111111";
    let metadata = HashMap::from([(TRACE_ID_FIELD.to_owned(), trace_id.to_owned())]);

    let response = service.handle(get_book_request(1, metadata)).await;
    assert!(response.error.is_none());

    let spans = exporter.get_finished_spans().unwrap();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].span_context.trace_id().to_string(), trace_id);
}

#[tokio::test]
async fn malformed_trace_id_fails_without_touching_the_store() {
    let (store, service, exporter) = test_service();
    let before = store.len();
    let metadata = HashMap::from([(TRACE_ID_FIELD.to_owned(), "not-hex".to_owned())]);

    let response = service
        .handle(RpcRequest {
            method: "storage.add_book".to_owned(),
            metadata,
            params: json!({
                "title": "Never Stored",
                "author": "Nobody",
                "price": 1.0,
            }),
        })
        .await;

    assert_eq!(
        response.error.expect("error").code,
        RpcErrorCode::MalformedTraceId
    );
    assert_eq!(store.len(), before);
    assert!(exporter.get_finished_spans().unwrap().is_empty());
}

#[tokio::test]
async fn absent_trace_id_serves_the_request_untraced() {
    let (_, service, exporter) = test_service();

    let response = service.handle(get_book_request(1, HashMap::new())).await;

    assert!(response.error.is_none());
    assert!(exporter.get_finished_spans().unwrap().is_empty());
}

// -- Framed transport --------------------------------------------------------

async fn spawn_server(service: StorageService) -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve(listener, Arc::new(service)));
    addr
}

#[tokio::test]
async fn framed_request_round_trips_over_tcp() {
    let (_, service, _) = test_service();
    let addr = spawn_server(service).await;

    let socket = TcpStream::connect(addr).await.unwrap();
    let mut framed = Framed::new(socket, LengthDelimitedCodec::new());

    let request = get_book_request(2, HashMap::new());
    framed
        .send(Bytes::from(serde_json::to_vec(&request).unwrap()))
        .await
        .unwrap();

    let frame = framed.next().await.expect("response frame").unwrap();
    let response: RpcResponse = serde_json::from_slice(&frame).unwrap();
    let book: Book = serde_json::from_value(response.result.expect("result")).unwrap();
    assert_eq!(book.details.title, "TWO");
}

#[tokio::test]
async fn undecodable_frame_gets_a_bad_request_response() {
    let (_, service, _) = test_service();
    let addr = spawn_server(service).await;

    let socket = TcpStream::connect(addr).await.unwrap();
    let mut framed = Framed::new(socket, LengthDelimitedCodec::new());

    framed
        .send(Bytes::from_static(b"this is not json"))
        .await
        .unwrap();

    let frame = framed.next().await.expect("response frame").unwrap();
    let response: RpcResponse = serde_json::from_slice(&frame).unwrap();
    assert_eq!(response.error.expect("error").code, RpcErrorCode::BadRequest);
}

#[tokio::test]
async fn one_connection_serves_multiple_requests() {
    let (_, service, _) = test_service();
    let addr = spawn_server(service).await;

    let socket = TcpStream::connect(addr).await.unwrap();
    let mut framed = Framed::new(socket, LengthDelimitedCodec::new());

    for id in [1_i64, 2, 3] {
        let request = get_book_request(id, HashMap::new());
        framed
            .send(Bytes::from(serde_json::to_vec(&request).unwrap()))
            .await
            .unwrap();
        let frame = framed.next().await.expect("response frame").unwrap();
        let response: RpcResponse = serde_json::from_slice(&frame).unwrap();
        let book: Book = serde_json::from_value(response.result.expect("result")).unwrap();
        assert_eq!(book.id, id);
    }

    // Add a draft over the same connection to ensure state survives reads.
    let request = RpcRequest::new(
        "storage.add_book",
        HashMap::new(),
        json!({ "title": "Fourth", "author": "Someone", "price": 9.0 }),
    );
    framed
        .send(Bytes::from(serde_json::to_vec(&request).unwrap()))
        .await
        .unwrap();
    let frame = framed.next().await.expect("response frame").unwrap();
    let response: RpcResponse = serde_json::from_slice(&frame).unwrap();
    assert!(response.error.is_none());
}

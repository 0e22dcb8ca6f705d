//! RPC method handlers, each wrapped by the manual propagation bridge.

use std::collections::HashMap;
use std::sync::Arc;

use opentelemetry::KeyValue;
use opentelemetry::trace::TraceContextExt;
use tracing::warn;

use observer_core::rpc::{self, AddBookResult, GetBookParams, RpcRequest, RpcResponse};
use observer_core::{Book, BookDraft};
use observer_trace::{PropagationBridge, ServiceTracer};

use crate::error::StorageError;
use crate::store::BookStore;

/// The storage service: dispatches RPC frames to handlers.
///
/// Every handler runs on the inbound side of the manual boundary: a valid
/// `x-trace-id` in the request metadata parents a child span, absence runs
/// untraced, and a malformed id aborts the request before any store access.
#[derive(Clone)]
pub struct StorageService {
    store: Arc<dyn BookStore>,
    bridge: PropagationBridge,
}

impl StorageService {
    /// Build the service over a store and the tracer for this process.
    pub fn new(store: Arc<dyn BookStore>, tracer: ServiceTracer) -> Self {
        Self {
            store,
            bridge: PropagationBridge::manual(tracer),
        }
    }

    /// Handle one decoded request frame, producing the response frame.
    pub async fn handle(&self, request: RpcRequest) -> RpcResponse {
        let result = match request.method.as_str() {
            rpc::method::GET_BOOK => {
                match serde_json::from_value::<GetBookParams>(request.params) {
                    Ok(params) => self
                        .get_book(&request.metadata, params.id)
                        .await
                        .and_then(|book| {
                            serde_json::to_value(book)
                                .map_err(|e| StorageError::BadRequest(e.to_string()))
                        }),
                    Err(e) => Err(StorageError::BadRequest(e.to_string())),
                }
            }
            rpc::method::ADD_BOOK => {
                match serde_json::from_value::<BookDraft>(request.params) {
                    Ok(draft) => self
                        .add_book(&request.metadata, draft)
                        .await
                        .and_then(|id| {
                            serde_json::to_value(AddBookResult { id })
                                .map_err(|e| StorageError::BadRequest(e.to_string()))
                        }),
                    Err(e) => Err(StorageError::BadRequest(e.to_string())),
                }
            }
            other => Err(StorageError::UnknownMethod(other.to_owned())),
        };

        match result {
            Ok(value) => RpcResponse::ok(value),
            Err(err) => {
                warn!(error = %err, "request failed");
                RpcResponse::fail(err.to_rpc_error())
            }
        }
    }

    /// Fetch a book by id.
    pub async fn get_book(
        &self,
        metadata: &HashMap<String, String>,
        id: i64,
    ) -> Result<Book, StorageError> {
        let store = Arc::clone(&self.store);
        self.bridge
            .serve(
                metadata,
                "get_book",
                vec![KeyValue::new("book.id", id)],
                move |cx| async move {
                    let book = store.get(id).await?.ok_or(StorageError::NotFound(id))?;
                    cx.span()
                        .set_attribute(KeyValue::new("book.title", book.details.title.clone()));
                    Ok(book)
                },
            )
            .await
    }

    /// Insert a new book, returning its generated id.
    pub async fn add_book(
        &self,
        metadata: &HashMap<String, String>,
        draft: BookDraft,
    ) -> Result<i64, StorageError> {
        let store = Arc::clone(&self.store);
        self.bridge
            .serve(metadata, "add_book", vec![], move |cx| async move {
                let id = store.insert(draft).await?;
                cx.span().set_attribute(KeyValue::new("book.id", id));
                Ok(id)
            })
            .await
    }
}

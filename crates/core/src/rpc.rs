//! Wire envelope for the gateway-to-storage RPC hop.
//!
//! Requests and responses travel as length-delimited JSON frames over TCP.
//! The transport itself knows nothing about tracing; the `metadata` map on
//! [`RpcRequest`] is where boundary adapters attach the trace id.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Method names understood by the storage service.
pub mod method {
    /// Fetch a book by id. Params: [`GetBookParams`](super::GetBookParams).
    pub const GET_BOOK: &str = "storage.get_book";
    /// Insert a new book. Params: a `BookDraft`.
    pub const ADD_BOOK: &str = "storage.add_book";
}

/// A single RPC request frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Which operation to invoke (see [`method`]).
    pub method: String,

    /// Transport-level metadata. String keys to string values; the only
    /// channel carrying trace context across this hop.
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// Method-specific parameters.
    #[serde(default)]
    pub params: Value,
}

impl RpcRequest {
    /// Build a request for `method` with the given metadata and params.
    pub fn new(method: impl Into<String>, metadata: HashMap<String, String>, params: Value) -> Self {
        Self {
            method: method.into(),
            metadata,
            params,
        }
    }
}

/// A single RPC response frame. Exactly one of `result` / `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Method result on success.
    pub result: Option<Value>,

    /// Error details on failure.
    pub error: Option<RpcError>,
}

impl RpcResponse {
    /// Build a success response.
    pub fn ok(result: Value) -> Self {
        Self {
            result: Some(result),
            error: None,
        }
    }

    /// Build an error response.
    pub fn fail(error: RpcError) -> Self {
        Self {
            result: None,
            error: Some(error),
        }
    }
}

/// Error surfaced by the storage service over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    /// Machine-readable error class.
    pub code: RpcErrorCode,
    /// Human-readable detail.
    pub message: String,
}

impl RpcError {
    /// Build an error with the given code and message.
    pub fn new(code: RpcErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Machine-readable error classes for [`RpcError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RpcErrorCode {
    /// The `x-trace-id` metadata field was present but unparseable. The
    /// whole operation is aborted; nothing was executed.
    MalformedTraceId,
    /// No record with the requested id.
    NotFound,
    /// Request params did not deserialize.
    BadRequest,
    /// Unrecognized method name.
    UnknownMethod,
    /// Backing store failure.
    Backend,
}

/// Params for [`method::GET_BOOK`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GetBookParams {
    /// Id of the book to fetch.
    pub id: i64,
}

/// Result of [`method::ADD_BOOK`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AddBookResult {
    /// Storage-assigned id of the inserted book.
    pub id: i64,
}

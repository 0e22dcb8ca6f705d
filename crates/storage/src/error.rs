use thiserror::Error;

use observer_core::rpc::{RpcError, RpcErrorCode};
use observer_trace::PropagationError;

use crate::store::StoreError;

/// Errors surfaced by the storage service handlers.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No book stored under the requested id.
    #[error("no book with id {0}")]
    NotFound(i64),

    /// Inbound trace context was present but unusable. Strict policy of
    /// the manual RPC boundary: the whole operation is aborted.
    #[error(transparent)]
    Propagation(#[from] PropagationError),

    /// The backing store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Request params did not deserialize for the invoked method.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Unrecognized RPC method.
    #[error("unknown method: {0}")]
    UnknownMethod(String),
}

impl StorageError {
    /// Map to the wire-level error for the RPC response frame.
    pub fn to_rpc_error(&self) -> RpcError {
        let code = match self {
            Self::NotFound(_) => RpcErrorCode::NotFound,
            Self::Propagation(_) => RpcErrorCode::MalformedTraceId,
            Self::Store(_) => RpcErrorCode::Backend,
            Self::BadRequest(_) => RpcErrorCode::BadRequest,
            Self::UnknownMethod(_) => RpcErrorCode::UnknownMethod,
        };
        RpcError::new(code, self.to_string())
    }
}

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use observer_core::rpc::RpcErrorCode;

use crate::client::ClientError;

/// Errors surfaced through the gateway API.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request itself was unusable (e.g. a non-numeric book id).
    #[error("{0}")]
    BadRequest(String),

    /// The storage service has no book under the requested id.
    #[error("no book with id {0}")]
    NotFound(i64),

    /// The storage call failed.
    #[error("storage call failed: {0}")]
    Upstream(#[from] ClientError),

    /// Response serialization failed.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl GatewayError {
    /// Classify a remote RPC error for the book with `id`.
    pub fn from_remote(id: Option<i64>, err: ClientError) -> Self {
        match (&err, id) {
            (
                ClientError::Remote {
                    code: RpcErrorCode::NotFound,
                    ..
                },
                Some(id),
            ) => Self::NotFound(id),
            (
                ClientError::Remote {
                    code: RpcErrorCode::BadRequest | RpcErrorCode::MalformedTraceId,
                    message,
                },
                _,
            ) => Self::BadRequest(message.clone()),
            _ => Self::Upstream(err),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            Self::Upstream(ClientError::Timeout) => {
                (StatusCode::GATEWAY_TIMEOUT, self.to_string())
            }
            Self::Upstream(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            Self::Serialize(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

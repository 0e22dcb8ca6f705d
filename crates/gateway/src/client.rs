//! RPC client for the storage service.
//!
//! One framed TCP connection per call; the request's metadata map is the
//! only channel carrying trace context across the hop. The whole exchange
//! (connect, send, receive) runs under a single timeout.

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use observer_core::Book;
use observer_core::rpc::{self, AddBookResult, RpcErrorCode, RpcRequest, RpcResponse};

/// Errors from a storage RPC call.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Could not reach the storage service.
    #[error("connection failed: {0}")]
    Connection(std::io::Error),

    /// The connection dropped or a frame could not be transmitted.
    #[error("transport error: {0}")]
    Transport(std::io::Error),

    /// The storage service answered with an error.
    #[error("remote error ({code:?}): {message}")]
    Remote {
        /// Machine-readable error class from the response frame.
        code: RpcErrorCode,
        /// Human-readable detail from the response frame.
        message: String,
    },

    /// The response frame did not decode into the expected shape.
    #[error("undecodable response: {0}")]
    Decode(String),

    /// The call did not complete within the configured timeout.
    #[error("storage call timed out")]
    Timeout,
}

/// Client for the storage RPC.
#[derive(Debug, Clone)]
pub struct StorageClient {
    addr: String,
    timeout: Duration,
}

impl StorageClient {
    /// Client for the storage service at `addr`.
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }

    /// Fetch a book by id.
    pub async fn get_book(
        &self,
        metadata: HashMap<String, String>,
        id: i64,
    ) -> Result<Book, ClientError> {
        self.call(RpcRequest::new(
            rpc::method::GET_BOOK,
            metadata,
            json!({ "id": id }),
        ))
        .await
    }

    /// Insert a new book, returning its storage-assigned id.
    pub async fn add_book(
        &self,
        metadata: HashMap<String, String>,
        draft: &impl Serialize,
    ) -> Result<i64, ClientError> {
        let params =
            serde_json::to_value(draft).map_err(|e| ClientError::Decode(e.to_string()))?;
        let result: AddBookResult = self
            .call(RpcRequest::new(rpc::method::ADD_BOOK, metadata, params))
            .await?;
        Ok(result.id)
    }

    /// Run one request/response exchange under the configured timeout.
    async fn call<T: DeserializeOwned>(&self, request: RpcRequest) -> Result<T, ClientError> {
        match tokio::time::timeout(self.timeout, self.exchange(request)).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout),
        }
    }

    async fn exchange<T: DeserializeOwned>(&self, request: RpcRequest) -> Result<T, ClientError> {
        let socket = TcpStream::connect(&self.addr)
            .await
            .map_err(ClientError::Connection)?;
        let mut framed = Framed::new(socket, LengthDelimitedCodec::new());

        let encoded =
            serde_json::to_vec(&request).map_err(|e| ClientError::Decode(e.to_string()))?;
        framed
            .send(Bytes::from(encoded))
            .await
            .map_err(ClientError::Transport)?;

        let frame = match framed.next().await {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => return Err(ClientError::Transport(e)),
            None => {
                return Err(ClientError::Transport(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "connection closed before response",
                )));
            }
        };

        let response: RpcResponse =
            serde_json::from_slice(&frame).map_err(|e| ClientError::Decode(e.to_string()))?;

        if let Some(error) = response.error {
            return Err(ClientError::Remote {
                code: error.code,
                message: error.message,
            });
        }
        let result = response
            .result
            .ok_or_else(|| ClientError::Decode("response carries neither result nor error".to_owned()))?;
        serde_json::from_value(result).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

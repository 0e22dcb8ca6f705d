//! Framed TCP front-end for the storage service.
//!
//! One tokio task per connection; frames are length-delimited JSON
//! envelopes. A frame that fails to decode ends only that connection's
//! request with a `bad_request` response; transport errors end the
//! connection.

use std::sync::Arc;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::{debug, info, warn};

use observer_core::rpc::{RpcError, RpcErrorCode, RpcRequest, RpcResponse};

use crate::service::StorageService;

/// Accept connections until the listener errors or the task is dropped.
pub async fn serve(listener: TcpListener, service: Arc<StorageService>) -> std::io::Result<()> {
    info!(addr = %listener.local_addr()?, "storage server listening");

    loop {
        let (socket, peer) = listener.accept().await?;
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            debug!(%peer, "connection opened");
            handle_connection(socket, service).await;
            debug!(%peer, "connection closed");
        });
    }
}

async fn handle_connection(socket: TcpStream, service: Arc<StorageService>) {
    let mut framed = Framed::new(socket, LengthDelimitedCodec::new());

    while let Some(frame) = framed.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "transport error, dropping connection");
                return;
            }
        };

        let response = match serde_json::from_slice::<RpcRequest>(&frame) {
            Ok(request) => service.handle(request).await,
            Err(e) => RpcResponse::fail(RpcError::new(
                RpcErrorCode::BadRequest,
                format!("undecodable request frame: {e}"),
            )),
        };

        let encoded = match serde_json::to_vec(&response) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(error = %e, "failed to encode response, dropping connection");
                return;
            }
        };

        if let Err(e) = framed.send(Bytes::from(encoded)).await {
            warn!(error = %e, "failed to write response, dropping connection");
            return;
        }
    }
}

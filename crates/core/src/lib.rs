//! Shared types for the Observer two-tier service.
//!
//! This crate holds the domain model exchanged between the edge gateway and
//! the storage service, plus the wire envelope of the RPC protocol that
//! connects them. The envelope carries a free-form string metadata map; that
//! map is the only channel through which trace context crosses this hop.

pub mod model;
pub mod rpc;

pub use model::{Book, BookDraft};
pub use rpc::{RpcError, RpcErrorCode, RpcRequest, RpcResponse};

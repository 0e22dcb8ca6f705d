//! The Observer storage service.
//!
//! Serves book reads and writes over a length-delimited JSON RPC. The
//! transport carries no automatic trace headers; every inbound request goes
//! through the manual propagation bridge, which reconstructs the caller's
//! trace from the `x-trace-id` metadata field (or runs untraced when the
//! field is absent).

pub mod config;
pub mod error;
pub mod server;
pub mod service;
pub mod store;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use config::StorageConfig;
pub use error::StorageError;
pub use service::StorageService;
pub use store::{BookStore, MemoryBookStore, StoreError, create_store};

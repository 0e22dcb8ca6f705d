use thiserror::Error;

/// Errors raised while moving trace context across a transport boundary.
///
/// Absence of trace context is deliberately *not* represented here: a call
/// without a trace id is a legitimate untraced call and surfaces as
/// `Ok(None)` from the carrier, never as an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropagationError {
    /// The trace-id field was present but is not exactly 32 lowercase hex
    /// characters, or decodes to the all-zero id. On the manual RPC
    /// boundary this aborts the whole inbound operation.
    #[error("malformed trace id {value:?}: expected 32 lowercase hex characters")]
    MalformedTraceId {
        /// The raw field value as received.
        value: String,
    },
}

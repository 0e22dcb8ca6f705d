//! Trace-id encoding for the metadata map of the RPC envelope.
//!
//! Only the 128-bit trace id crosses this boundary. The span id and flags
//! are deliberately not propagated; the receiving side reconstructs a
//! parent with a synthetic zero span id (see [`crate::context`]).

use std::collections::HashMap;

use opentelemetry::Context;
use opentelemetry::trace::{TraceContextExt, TraceId};

use crate::error::PropagationError;

/// Metadata field carrying the trace id across the RPC hop.
pub const TRACE_ID_FIELD: &str = "x-trace-id";

/// Render a trace id in its canonical transport form: 32 lowercase hex
/// characters.
pub fn format_trace_id(trace_id: TraceId) -> String {
    trace_id.to_string()
}

/// Parse a trace id from its canonical transport form.
///
/// Strict by contract: the input must be exactly 32 lowercase hex
/// characters and must not decode to the all-zero id. Anything else is
/// [`PropagationError::MalformedTraceId`]; an all-zero id must never be
/// attached to an execution context.
pub fn parse_trace_id(value: &str) -> Result<TraceId, PropagationError> {
    let malformed = || PropagationError::MalformedTraceId {
        value: value.to_owned(),
    };

    let canonical = value.len() == 32
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if !canonical {
        return Err(malformed());
    }

    let trace_id = TraceId::from_hex(value).map_err(|_| malformed())?;
    if trace_id == TraceId::INVALID {
        return Err(malformed());
    }
    Ok(trace_id)
}

/// Look up and parse the trace-id field from inbound metadata.
///
/// A missing field is not an error: the call is simply untraced.
pub fn extract_trace_id(
    metadata: &HashMap<String, String>,
) -> Result<Option<TraceId>, PropagationError> {
    match metadata.get(TRACE_ID_FIELD) {
        None => Ok(None),
        Some(raw) => parse_trace_id(raw).map(Some),
    }
}

/// Attach the active span's trace id to outbound metadata.
///
/// A context without a valid trace id (no active span, or the zero id)
/// writes nothing; the downstream side then takes its untraced path.
pub fn inject_trace_id(cx: &Context, metadata: &mut HashMap<String, String>) {
    let span = cx.span();
    let trace_id = span.span_context().trace_id();
    if trace_id != TraceId::INVALID {
        metadata.insert(TRACE_ID_FIELD.to_owned(), format_trace_id(trace_id));
    }
}

//! Book handlers: the outbound side of the manual RPC boundary.
//!
//! Each handler starts a span (continuing the caller's trace when one
//! arrived over HTTP, fresh root otherwise), injects the trace id into the
//! storage call metadata, and echoes the trace id back to the client in a
//! `trace-id` response header so callers can correlate.

use std::collections::HashMap;

use axum::Extension;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use opentelemetry::trace::TraceContextExt;
use opentelemetry::{Context, KeyValue};
use serde::Serialize;
use tracing::warn;

use observer_core::BookDraft;
use observer_trace::tracer::{end_span, fail_span};

use super::AppState;
use super::trace_context::TraceScope;
use crate::error::GatewayError;

fn start_span(
    state: &AppState,
    scope: &TraceScope,
    name: &'static str,
    attributes: Vec<KeyValue>,
) -> Context {
    match &scope.parent {
        Some(parent) => state.tracer.start_child(parent, name, attributes),
        None => state.tracer.start_root(name, attributes),
    }
}

/// Serialize `body`, count its bytes, and attach the `trace-id` header.
fn respond_json<T: Serialize>(
    state: &AppState,
    cx: &Context,
    status: StatusCode,
    body: &T,
) -> Response {
    match serde_json::to_vec(body) {
        Ok(bytes) => {
            state.metrics.record_bytes(bytes.len() as u64);
            let trace_id = cx.span().span_context().trace_id().to_string();
            (
                status,
                [
                    (header::CONTENT_TYPE, "application/json".to_owned()),
                    (header::HeaderName::from_static("trace-id"), trace_id),
                ],
                bytes,
            )
                .into_response()
        }
        Err(e) => {
            state.metrics.record_failed();
            GatewayError::Serialize(e).into_response()
        }
    }
}

/// `GET /storage/{id}` -- fetch one book from the storage service.
pub async fn get_book(
    State(state): State<AppState>,
    Extension(scope): Extension<TraceScope>,
    Path(id): Path<String>,
) -> Response {
    state.metrics.record_accepted();

    let Ok(id) = id.parse::<i64>() else {
        state.metrics.record_failed();
        return GatewayError::BadRequest("wrong id format".to_owned()).into_response();
    };

    let cx = start_span(
        &state,
        &scope,
        "gateway.get_book",
        vec![KeyValue::new("book.id", id)],
    );
    let mut metadata = HashMap::new();
    state.bridge.inject(&cx, &mut metadata);

    match state.client.get_book(metadata, id).await {
        Ok(book) => {
            end_span(&cx);
            respond_json(&state, &cx, StatusCode::OK, &book)
        }
        Err(err) => {
            state.metrics.record_failed();
            let err = GatewayError::from_remote(Some(id), err);
            warn!(book.id = id, error = %err, "get book failed");
            fail_span(&cx, err.to_string());
            err.into_response()
        }
    }
}

/// `POST /storage` -- insert a new book through the storage service.
pub async fn add_book(
    State(state): State<AppState>,
    Extension(scope): Extension<TraceScope>,
    axum::Json(draft): axum::Json<BookDraft>,
) -> Response {
    state.metrics.record_accepted();

    let cx = start_span(
        &state,
        &scope,
        "gateway.add_book",
        vec![KeyValue::new("book.title", draft.title.clone())],
    );
    let mut metadata = HashMap::new();
    state.bridge.inject(&cx, &mut metadata);

    match state.client.add_book(metadata, &draft).await {
        Ok(id) => {
            cx.span().set_attribute(KeyValue::new("book.id", id));
            end_span(&cx);
            respond_json(
                &state,
                &cx,
                StatusCode::CREATED,
                &serde_json::json!({ "id": id }),
            )
        }
        Err(err) => {
            state.metrics.record_failed();
            let err = GatewayError::from_remote(None, err);
            warn!(book.title = %draft.title, error = %err, "add book failed");
            fail_span(&cx, err.to_string());
            err.into_response()
        }
    }
}

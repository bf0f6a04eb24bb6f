//! Axum HTTP transport.
//!
//! Maps processing outcomes to HTTP status codes:
//! - no content: `204 No Content` with an empty body
//! - one or more responses: `200 OK` with `application/json; charset=utf-8`
//! - processing failure: `500 Internal Server Error` with an empty body
//!
//! The request body must be UTF-8; Axum rejects other bodies before the
//! processor sees them.

use crate::processor::RpcProcessor;
use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use std::sync::Arc;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Router serving JSON-RPC over HTTP POST at `path`
pub fn rpc_router(processor: Arc<RpcProcessor>, path: &str) -> Router {
    Router::new()
        .route(path, post(handle_rpc))
        .with_state(processor)
}

async fn handle_rpc(State(processor): State<Arc<RpcProcessor>>, body: String) -> Response {
    let outcome = match processor.process_message(&body).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "message processing failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match outcome.to_json() {
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Ok(Some(json)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, JSON_CONTENT_TYPE)],
            json,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize responses");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

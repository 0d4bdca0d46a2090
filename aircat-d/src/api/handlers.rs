//! HTTP request handlers

use crate::build_info;
use crate::context::AppContext;
use aircat_common::http::{Method, Response};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode, Uri},
    response::IntoResponse,
    Json,
};
use percent_encoding::percent_decode_str;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
    git_hash: String,
    build_timestamp: String,
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "aircat".to_string(),
        version: build_info::VERSION.to_string(),
        git_hash: build_info::GIT_HASH.to_string(),
        build_timestamp: build_info::BUILD_TIMESTAMP.to_string(),
    })
}

// ============================================================================
// Module dispatch
// ============================================================================

/// Fallback handler: route the request through the dispatcher.
///
/// Module handlers block on engine locks and file I/O, so they run on
/// the blocking pool.
pub async fn dispatch(
    State(ctx): State<AppContext>,
    method: axum::http::Method,
    uri: Uri,
    body: Bytes,
) -> axum::response::Response {
    let Some(method) = Method::from_http(&method) else {
        return (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed").into_response();
    };

    let path = match percent_decode_str(uri.path()).decode_utf8() {
        Ok(path) => path.into_owned(),
        Err(e) => {
            debug!("Rejecting non UTF-8 path {}: {}", uri.path(), e);
            return (StatusCode::BAD_REQUEST, "Bad URL").into_response();
        }
    };

    let dispatcher = Arc::clone(&ctx.dispatcher);
    match tokio::task::spawn_blocking(move || dispatcher.dispatch(method, &path, &body)).await {
        Ok(response) => into_http(response),
        Err(e) => {
            error!("Request handler panicked: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn into_http(response: Response) -> axum::response::Response {
    match response.body {
        Some(body) => (
            response.status,
            [(header::CONTENT_TYPE, response.content_type)],
            body,
        )
            .into_response(),
        None => response.status.into_response(),
    }
}

//! HTTP server setup and routing
//!
//! `/health` is served directly; every other path goes through the
//! module dispatcher.

use crate::context::AppContext;
use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the application router
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(super::handlers::health))
        .fallback(super::handlers::dispatch)
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

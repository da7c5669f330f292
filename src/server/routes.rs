//! Router configuration for the web server.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // One crawl per request
        .route("/crawl/basic", post(handlers::crawl_basic))
        .route("/crawl/advanced", post(handlers::crawl_advanced))
        .route("/crawl/configurable", post(handlers::crawl_configurable))
        // Effective configuration; updates are never persisted
        .route(
            "/config",
            get(handlers::get_config).put(handlers::put_config),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

//! API Routes
//!
//! - `/analyze/layout` - layout analysis (`prebuilt-layout`)
//! - `/analyze/document` - document analysis (`prebuilt-document`)
//! - `/health` - health check

pub mod analyze;
pub mod health;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tracing::info;

use crate::middleware::{apply_cors, apply_trace};
use crate::models::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let server = state.config.server.clone();

    let router = Router::new()
        .merge(analyze::router(state.clone()))
        .merge(health::router(state))
        .layer(DefaultBodyLimit::max(server.max_upload_bytes));

    apply_trace(apply_cors(router, &server.cors_allowed_origins))
}
